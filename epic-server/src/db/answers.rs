//! Answer persistence
//!
//! One row per (user, question_type, question). The payload columns used
//! depend on the question type; linkages selections are stored as a JSON
//! array of program ids.

use epic_common::db::{Answer, AnswerValue, EvolutionTier, QuestionKind, YesNo};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SELECT_ANSWER: &str = r#"
    SELECT id, user_id, question_type, question_id, short_answer, selected_tier,
           selected_programs, justify_answer
    FROM answers
"#;

/// Optional restrictions for [`list_answers`]
#[derive(Debug, Clone, Default)]
pub struct AnswerFilter {
    pub user: Option<i64>,
    pub question_type: Option<QuestionKind>,
    pub question: Option<i64>,
}

/// Column values of an [`AnswerValue`]
struct PayloadColumns {
    short_answer: Option<&'static str>,
    selected_tier: Option<&'static str>,
    selected_programs: Option<String>,
    justify_answer: String,
}

impl PayloadColumns {
    fn from_value(value: &AnswerValue) -> sqlx::Result<Self> {
        let columns = match value {
            AnswerValue::NationalFramework {
                short_answer,
                justify_answer,
            }
            | AnswerValue::KeyAgencyActions {
                short_answer,
                justify_answer,
            } => PayloadColumns {
                short_answer: Some(short_answer.as_str()),
                selected_tier: None,
                selected_programs: None,
                justify_answer: justify_answer.clone(),
            },
            AnswerValue::Evolution {
                selected_tier,
                justify_answer,
            } => PayloadColumns {
                short_answer: None,
                selected_tier: Some(selected_tier.as_str()),
                selected_programs: None,
                justify_answer: justify_answer.clone(),
            },
            AnswerValue::Linkages { selected_programs } => PayloadColumns {
                short_answer: None,
                selected_tier: None,
                selected_programs: Some(
                    serde_json::to_string(selected_programs)
                        .map_err(|e| sqlx::Error::Encode(e.into()))?,
                ),
                justify_answer: String::new(),
            },
        };

        Ok(columns)
    }
}

fn decode_err(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

fn answer_from_row(row: &SqliteRow) -> sqlx::Result<Answer> {
    let kind: QuestionKind = row
        .try_get::<String, _>("question_type")?
        .parse()
        .map_err(decode_err)?;
    let justify_answer: String = row.try_get("justify_answer")?;

    let short_answer = || -> sqlx::Result<YesNo> {
        row.try_get::<Option<String>, _>("short_answer")?
            .unwrap_or_default()
            .parse()
            .map_err(decode_err)
    };

    let value = match kind {
        QuestionKind::NationalFramework => AnswerValue::NationalFramework {
            short_answer: short_answer()?,
            justify_answer,
        },
        QuestionKind::KeyAgencyActions => AnswerValue::KeyAgencyActions {
            short_answer: short_answer()?,
            justify_answer,
        },
        QuestionKind::Evolution => AnswerValue::Evolution {
            selected_tier: row
                .try_get::<Option<String>, _>("selected_tier")?
                .unwrap_or_default()
                .parse::<EvolutionTier>()
                .map_err(decode_err)?,
            justify_answer,
        },
        QuestionKind::Linkages => {
            let raw: Option<String> = row.try_get("selected_programs")?;
            AnswerValue::Linkages {
                selected_programs: match raw {
                    Some(json) => serde_json::from_str(&json).map_err(decode_err)?,
                    None => Vec::new(),
                },
            }
        }
    };

    Ok(Answer {
        id: row.try_get("id")?,
        user: row.try_get("user_id")?,
        question: row.try_get("question_id")?,
        value,
    })
}

pub async fn list_answers(pool: &SqlitePool, filter: &AnswerFilter) -> sqlx::Result<Vec<Answer>> {
    let mut conditions = Vec::new();
    if filter.user.is_some() {
        conditions.push("user_id = ?");
    }
    if filter.question_type.is_some() {
        conditions.push("question_type = ?");
    }
    if filter.question.is_some() {
        conditions.push("question_id = ?");
    }

    let mut sql = SELECT_ANSWER.to_string();
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY id");

    let mut query = sqlx::query(&sql);
    if let Some(user) = filter.user {
        query = query.bind(user);
    }
    if let Some(kind) = filter.question_type {
        query = query.bind(kind.as_str());
    }
    if let Some(question) = filter.question {
        query = query.bind(question);
    }

    query
        .fetch_all(pool)
        .await?
        .iter()
        .map(answer_from_row)
        .collect()
}

pub async fn get_answer(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Answer>> {
    sqlx::query(&format!("{} WHERE id = ?", SELECT_ANSWER))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(answer_from_row)
        .transpose()
}

/// Payloads of every answer to one question, in answer order
pub async fn answers_for_question(
    pool: &SqlitePool,
    kind: QuestionKind,
    question: i64,
) -> sqlx::Result<Vec<AnswerValue>> {
    let filter = AnswerFilter {
        question_type: Some(kind),
        question: Some(question),
        ..AnswerFilter::default()
    };

    Ok(list_answers(pool, &filter)
        .await?
        .into_iter()
        .map(|answer| answer.value)
        .collect())
}

/// Record a user's answer, replacing any earlier answer to the same question
pub async fn upsert_answer(
    pool: &SqlitePool,
    user: i64,
    question: i64,
    value: &AnswerValue,
) -> sqlx::Result<Answer> {
    let columns = PayloadColumns::from_value(value)?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO answers (
            user_id, question_type, question_id, short_answer, selected_tier,
            selected_programs, justify_answer
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, question_type, question_id) DO UPDATE SET
            short_answer = excluded.short_answer,
            selected_tier = excluded.selected_tier,
            selected_programs = excluded.selected_programs,
            justify_answer = excluded.justify_answer,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(user)
    .bind(value.kind().as_str())
    .bind(question)
    .bind(columns.short_answer)
    .bind(columns.selected_tier)
    .bind(&columns.selected_programs)
    .bind(&columns.justify_answer)
    .fetch_one(pool)
    .await?;

    Ok(Answer {
        id,
        user,
        question,
        value: value.clone(),
    })
}

/// Replace question and payload of an existing answer
pub async fn update_answer(
    pool: &SqlitePool,
    id: i64,
    question: i64,
    value: &AnswerValue,
) -> sqlx::Result<Option<Answer>> {
    let columns = PayloadColumns::from_value(value)?;

    let user: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE answers SET
            question_type = ?, question_id = ?, short_answer = ?, selected_tier = ?,
            selected_programs = ?, justify_answer = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        RETURNING user_id
        "#,
    )
    .bind(value.kind().as_str())
    .bind(question)
    .bind(columns.short_answer)
    .bind(columns.selected_tier)
    .bind(&columns.selected_programs)
    .bind(&columns.justify_answer)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user.map(|user| Answer {
        id,
        user,
        question,
        value: value.clone(),
    }))
}

pub async fn delete_answer(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let affected = sqlx::query("DELETE FROM answers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::questions::{insert_linkages, insert_yes_no};
    use crate::db::test_support::seeded_pool;
    use crate::db::users::{insert_user, UserRecord};

    async fn user(pool: &SqlitePool, username: &str) -> i64 {
        let record = UserRecord {
            username,
            organization: None,
            is_advisor: false,
            is_staff: false,
        };
        insert_user(pool, &record, "pw").await.unwrap().id
    }

    fn yes(justify: &str) -> AnswerValue {
        AnswerValue::NationalFramework {
            short_answer: YesNo::Yes,
            justify_answer: justify.to_string(),
        }
    }

    #[tokio::test]
    async fn test_reanswering_updates_in_place() {
        let pool = seeded_pool().await;
        let alice = user(&pool, "alice").await;
        let question = insert_yes_no(&pool, QuestionKind::NationalFramework, 1, "Q", "")
            .await
            .unwrap();

        let first = upsert_answer(&pool, alice, question.id, &yes("first")).await.unwrap();
        let second = upsert_answer(&pool, alice, question.id, &yes("second")).await.unwrap();
        assert_eq!(first.id, second.id);

        let all = list_answers(&pool, &AnswerFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value.justify_answer(), Some("second"));
    }

    #[tokio::test]
    async fn test_linkages_selection_round_trips() {
        let pool = seeded_pool().await;
        let alice = user(&pool, "alice").await;
        let question = insert_linkages(&pool, 1, "Links").await.unwrap();

        let value = AnswerValue::Linkages {
            selected_programs: vec![2, 3],
        };
        let created = upsert_answer(&pool, alice, question.id, &value).await.unwrap();

        let loaded = get_answer(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn test_filters() {
        let pool = seeded_pool().await;
        let alice = user(&pool, "alice").await;
        let bob = user(&pool, "bob").await;
        let nf = insert_yes_no(&pool, QuestionKind::NationalFramework, 1, "NF", "")
            .await
            .unwrap();
        let kaa = insert_yes_no(&pool, QuestionKind::KeyAgencyActions, 1, "KAA", "")
            .await
            .unwrap();

        upsert_answer(&pool, alice, nf.id, &yes("a")).await.unwrap();
        upsert_answer(&pool, bob, nf.id, &yes("b")).await.unwrap();
        let kaa_value = AnswerValue::KeyAgencyActions {
            short_answer: YesNo::No,
            justify_answer: String::new(),
        };
        upsert_answer(&pool, alice, kaa.id, &kaa_value).await.unwrap();

        let mine = AnswerFilter {
            user: Some(alice),
            ..AnswerFilter::default()
        };
        assert_eq!(list_answers(&pool, &mine).await.unwrap().len(), 2);

        let nf_only = AnswerFilter {
            question_type: Some(QuestionKind::NationalFramework),
            ..AnswerFilter::default()
        };
        assert_eq!(list_answers(&pool, &nf_only).await.unwrap().len(), 2);

        let payloads = answers_for_question(&pool, QuestionKind::KeyAgencyActions, kaa.id)
            .await
            .unwrap();
        assert_eq!(payloads, vec![kaa_value]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let pool = seeded_pool().await;

        assert!(update_answer(&pool, 99, 1, &yes("x")).await.unwrap().is_none());
        assert!(!delete_answer(&pool, 99).await.unwrap());
    }
}
