//! Question persistence
//!
//! National-Framework and Key-Agency-Actions questions share one row shape
//! and are addressed through their [`QuestionKind`].

use epic_common::db::{EvolutionQuestion, LinkagesQuestion, QuestionKind, YesNoJustifyQuestion};
use sqlx::SqlitePool;

/// Id and title of any question, used by reports
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct QuestionHeader {
    pub id: i64,
    pub program: i64,
    pub title: String,
}

/// Staged descriptions of an evolution question
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvolutionStages {
    pub nascent: String,
    pub engaged: String,
    pub capable: String,
    pub effective: String,
}

fn program_filter(program: Option<i64>) -> &'static str {
    if program.is_some() {
        " WHERE program_id = ?"
    } else {
        ""
    }
}

pub async fn question_exists(pool: &SqlitePool, kind: QuestionKind, id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)",
        kind.table()
    ))
    .bind(id)
    .fetch_one(pool)
    .await
}

/// Questions of one kind, ordered by id, optionally for a single program
pub async fn list_headers(
    pool: &SqlitePool,
    kind: QuestionKind,
    program: Option<i64>,
) -> sqlx::Result<Vec<QuestionHeader>> {
    sqlx::query_as::<_, QuestionHeader>(&format!(
        "SELECT id, program_id AS program, title FROM {}{} ORDER BY id",
        kind.table(),
        program_filter(program)
    ))
    .bind(program)
    .fetch_all(pool)
    .await
}

pub async fn delete_question(pool: &SqlitePool, kind: QuestionKind, id: i64) -> sqlx::Result<bool> {
    let affected = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", kind.table()))
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

// ========================================
// Yes/No-justify questions
// ========================================

fn assert_yes_no(kind: QuestionKind) {
    debug_assert!(kind.is_yes_no(), "{} is not a yes/no question kind", kind);
}

pub async fn list_yes_no(
    pool: &SqlitePool,
    kind: QuestionKind,
    program: Option<i64>,
) -> sqlx::Result<Vec<YesNoJustifyQuestion>> {
    assert_yes_no(kind);
    sqlx::query_as::<_, YesNoJustifyQuestion>(&format!(
        "SELECT id, program_id AS program, title, description FROM {}{} ORDER BY id",
        kind.table(),
        program_filter(program)
    ))
    .bind(program)
    .fetch_all(pool)
    .await
}

pub async fn get_yes_no(
    pool: &SqlitePool,
    kind: QuestionKind,
    id: i64,
) -> sqlx::Result<Option<YesNoJustifyQuestion>> {
    assert_yes_no(kind);
    sqlx::query_as::<_, YesNoJustifyQuestion>(&format!(
        "SELECT id, program_id AS program, title, description FROM {} WHERE id = ?",
        kind.table()
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_yes_no(
    pool: &SqlitePool,
    kind: QuestionKind,
    program: i64,
    title: &str,
    description: &str,
) -> sqlx::Result<YesNoJustifyQuestion> {
    assert_yes_no(kind);
    let id = sqlx::query(&format!(
        "INSERT INTO {} (program_id, title, description) VALUES (?, ?, ?)",
        kind.table()
    ))
    .bind(program)
    .bind(title)
    .bind(description)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(YesNoJustifyQuestion {
        id,
        program,
        title: title.to_string(),
        description: description.to_string(),
    })
}

pub async fn update_yes_no(
    pool: &SqlitePool,
    kind: QuestionKind,
    id: i64,
    program: i64,
    title: &str,
    description: &str,
) -> sqlx::Result<Option<YesNoJustifyQuestion>> {
    assert_yes_no(kind);
    let affected = sqlx::query(&format!(
        "UPDATE {} SET program_id = ?, title = ?, description = ? WHERE id = ?",
        kind.table()
    ))
    .bind(program)
    .bind(title)
    .bind(description)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok((affected > 0).then(|| YesNoJustifyQuestion {
        id,
        program,
        title: title.to_string(),
        description: description.to_string(),
    }))
}

// ========================================
// Evolution questions
// ========================================

const SELECT_EVOLUTION: &str = r#"
    SELECT id, program_id AS program, title, nascent_description, engaged_description,
           capable_description, effective_description
    FROM evolution_questions
"#;

pub async fn list_evolution(
    pool: &SqlitePool,
    program: Option<i64>,
) -> sqlx::Result<Vec<EvolutionQuestion>> {
    sqlx::query_as::<_, EvolutionQuestion>(&format!(
        "{}{} ORDER BY id",
        SELECT_EVOLUTION,
        program_filter(program)
    ))
    .bind(program)
    .fetch_all(pool)
    .await
}

pub async fn get_evolution(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<EvolutionQuestion>> {
    sqlx::query_as::<_, EvolutionQuestion>(&format!("{} WHERE id = ?", SELECT_EVOLUTION))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_evolution(
    pool: &SqlitePool,
    program: i64,
    title: &str,
    stages: &EvolutionStages,
) -> sqlx::Result<EvolutionQuestion> {
    let id = sqlx::query(
        r#"
        INSERT INTO evolution_questions (
            program_id, title, nascent_description, engaged_description,
            capable_description, effective_description
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(program)
    .bind(title)
    .bind(&stages.nascent)
    .bind(&stages.engaged)
    .bind(&stages.capable)
    .bind(&stages.effective)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(evolution_question(id, program, title, stages))
}

pub async fn update_evolution(
    pool: &SqlitePool,
    id: i64,
    program: i64,
    title: &str,
    stages: &EvolutionStages,
) -> sqlx::Result<Option<EvolutionQuestion>> {
    let affected = sqlx::query(
        r#"
        UPDATE evolution_questions SET
            program_id = ?, title = ?, nascent_description = ?, engaged_description = ?,
            capable_description = ?, effective_description = ?
        WHERE id = ?
        "#,
    )
    .bind(program)
    .bind(title)
    .bind(&stages.nascent)
    .bind(&stages.engaged)
    .bind(&stages.capable)
    .bind(&stages.effective)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok((affected > 0).then(|| evolution_question(id, program, title, stages)))
}

fn evolution_question(
    id: i64,
    program: i64,
    title: &str,
    stages: &EvolutionStages,
) -> EvolutionQuestion {
    EvolutionQuestion {
        id,
        program,
        title: title.to_string(),
        nascent_description: stages.nascent.clone(),
        engaged_description: stages.engaged.clone(),
        capable_description: stages.capable.clone(),
        effective_description: stages.effective.clone(),
    }
}

// ========================================
// Linkages questions
// ========================================

pub async fn list_linkages(
    pool: &SqlitePool,
    program: Option<i64>,
) -> sqlx::Result<Vec<LinkagesQuestion>> {
    sqlx::query_as::<_, LinkagesQuestion>(&format!(
        "SELECT id, program_id AS program, title FROM linkages_questions{} ORDER BY id",
        program_filter(program)
    ))
    .bind(program)
    .fetch_all(pool)
    .await
}

pub async fn get_linkages(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<LinkagesQuestion>> {
    sqlx::query_as::<_, LinkagesQuestion>(
        "SELECT id, program_id AS program, title FROM linkages_questions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_linkages(
    pool: &SqlitePool,
    program: i64,
    title: &str,
) -> sqlx::Result<LinkagesQuestion> {
    let id = sqlx::query("INSERT INTO linkages_questions (program_id, title) VALUES (?, ?)")
        .bind(program)
        .bind(title)
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(LinkagesQuestion {
        id,
        program,
        title: title.to_string(),
    })
}

pub async fn update_linkages(
    pool: &SqlitePool,
    id: i64,
    program: i64,
    title: &str,
) -> sqlx::Result<Option<LinkagesQuestion>> {
    let affected =
        sqlx::query("UPDATE linkages_questions SET program_id = ?, title = ? WHERE id = ?")
            .bind(program)
            .bind(title)
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();

    Ok((affected > 0).then(|| LinkagesQuestion {
        id,
        program,
        title: title.to_string(),
    }))
}
