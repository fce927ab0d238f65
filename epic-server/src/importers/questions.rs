//! Question imports
//!
//! Yes/no-justify questions (National-Framework, Key-Agency-Actions):
//! columns 0 group, 1 program, 2 description, 3 title. The program is
//! looked up by name within the named group.
//!
//! Evolution questions: columns 1 program, 2 dimension (the title),
//! 3-6 the nascent, engaged, capable and effective descriptions. The program
//! is looked up by name alone.

use epic_common::db::QuestionKind;
use sqlx::{SqliteConnection, SqlitePool};

use super::xlsx::{XlsxLineObject, XlsxRow, XlsxSheet};
use super::{ensure_valid, ImportError, ImportSummary};

const DEFAULT_DIMENSION: &str = "Default dimension";

#[derive(Debug, Clone)]
struct YesNoJustifyLine {
    group: String,
    program: String,
    description: String,
    title: String,
}

impl XlsxLineObject for YesNoJustifyLine {
    fn from_xlsx_row(row: &XlsxRow) -> Self {
        Self {
            group: row.cell(0).to_string(),
            program: row.cell(1).to_string(),
            description: row.cell(2).to_string(),
            title: row.cell(3).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct EvolutionLine {
    program: String,
    dimension: String,
    nascent: String,
    engaged: String,
    capable: String,
    effective: String,
}

impl XlsxLineObject for EvolutionLine {
    fn from_xlsx_row(row: &XlsxRow) -> Self {
        let dimension = match row.cell(2) {
            "" => DEFAULT_DIMENSION,
            value => value,
        };

        Self {
            program: row.cell(1).to_string(),
            dimension: dimension.to_string(),
            nascent: row.cell(3).to_string(),
            engaged: row.cell(4).to_string(),
            capable: row.cell(5).to_string(),
            effective: row.cell(6).to_string(),
        }
    }
}

async fn find_program_in_group(
    conn: &mut SqliteConnection,
    program: &str,
    group: &str,
) -> sqlx::Result<Option<i64>> {
    sqlx::query_scalar(
        r#"
        SELECT p.id FROM programs p
        JOIN program_groups g ON g.id = p.group_id
        WHERE p.name = ? AND g.name = ?
        ORDER BY p.id
        LIMIT 1
        "#,
    )
    .bind(program)
    .bind(group)
    .fetch_optional(&mut *conn)
    .await
}

async fn find_program(conn: &mut SqliteConnection, program: &str) -> sqlx::Result<Option<i64>> {
    sqlx::query_scalar("SELECT id FROM programs WHERE name = ? ORDER BY id LIMIT 1")
        .bind(program)
        .fetch_optional(&mut *conn)
        .await
}

pub(super) async fn import_yes_no(
    pool: &SqlitePool,
    kind: QuestionKind,
    sheet: &XlsxSheet,
) -> Result<ImportSummary, ImportError> {
    let lines: Vec<(usize, YesNoJustifyLine)> = sheet.line_objects();

    let mut tx = pool.begin().await?;

    let mut resolved = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();
    for (line, row) in &lines {
        match find_program_in_group(&mut tx, &row.program, &row.group).await? {
            Some(program_id) => resolved.push((program_id, row)),
            None => errors.push(format!(
                "Line {}. Program: '{}', Group: '{}' does not exist.",
                line, row.program, row.group
            )),
        }
    }
    ensure_valid(errors)?;

    sqlx::query(&format!("DELETE FROM {}", kind.table()))
        .execute(&mut *tx)
        .await?;

    for (program_id, row) in &resolved {
        sqlx::query(&format!(
            "INSERT INTO {} (program_id, title, description) VALUES (?, ?, ?)",
            kind.table()
        ))
        .bind(program_id)
        .bind(&row.title)
        .bind(&row.description)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ImportSummary {
        lines: lines.len(),
        records: vec![(kind.table(), resolved.len())],
    })
}

pub(super) async fn import_evolution(
    pool: &SqlitePool,
    sheet: &XlsxSheet,
) -> Result<ImportSummary, ImportError> {
    let lines: Vec<(usize, EvolutionLine)> = sheet.line_objects();

    let mut tx = pool.begin().await?;

    let mut resolved = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();
    for (line, row) in &lines {
        match find_program(&mut tx, &row.program).await? {
            Some(program_id) => resolved.push((program_id, row)),
            None => errors.push(format!(
                "Line {}. Program: '{}' does not exist.",
                line, row.program
            )),
        }
    }
    ensure_valid(errors)?;

    sqlx::query("DELETE FROM evolution_questions")
        .execute(&mut *tx)
        .await?;

    for (program_id, row) in &resolved {
        sqlx::query(
            r#"
            INSERT INTO evolution_questions (
                program_id, title, nascent_description, engaged_description,
                capable_description, effective_description
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(program_id)
        .bind(&row.dimension)
        .bind(&row.nascent)
        .bind(&row.engaged)
        .bind(&row.capable)
        .bind(&row.effective)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ImportSummary {
        lines: lines.len(),
        records: vec![("evolution_questions", resolved.len())],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::questions::{insert_yes_no, list_evolution, list_yes_no};
    use crate::db::test_support::seeded_pool;

    #[tokio::test]
    async fn test_yes_no_import_replaces_only_its_kind() {
        let pool = seeded_pool().await;
        insert_yes_no(&pool, QuestionKind::NationalFramework, 1, "Old NF", "")
            .await
            .unwrap();
        insert_yes_no(&pool, QuestionKind::KeyAgencyActions, 1, "Kept KAA", "")
            .await
            .unwrap();

        let sheet = XlsxSheet::from_rows(vec![
            vec!["group", "program", "description", "title"],
            vec!["coast", "ALPHA", "Desc one", "Q1"],
            vec!["River", "Gamma", "Desc two", "Q2"],
        ]);

        let summary = import_yes_no(&pool, QuestionKind::NationalFramework, &sheet)
            .await
            .unwrap();
        assert_eq!(summary.count("nationalframework_questions"), 2);

        let nf = list_yes_no(&pool, QuestionKind::NationalFramework, None)
            .await
            .unwrap();
        let titles: Vec<(&str, i64)> = nf.iter().map(|q| (q.title.as_str(), q.program)).collect();
        assert_eq!(titles, vec![("Q1", 1), ("Q2", 3)]);
        assert_eq!(nf[0].description, "Desc one");

        let kaa = list_yes_no(&pool, QuestionKind::KeyAgencyActions, None)
            .await
            .unwrap();
        assert_eq!(kaa.len(), 1);
    }

    #[tokio::test]
    async fn test_program_in_wrong_group_cites_line() {
        let pool = seeded_pool().await;
        insert_yes_no(&pool, QuestionKind::KeyAgencyActions, 1, "Old", "")
            .await
            .unwrap();

        let sheet = XlsxSheet::from_rows(vec![
            vec!["group", "program", "description", "title"],
            vec!["Coast", "Alpha", "", "Fine"],
            vec!["", "", "", ""],
            vec!["River", "Alpha", "", "Wrong group"],
        ]);

        let err = import_yes_no(&pool, QuestionKind::KeyAgencyActions, &sheet)
            .await
            .unwrap_err();
        match err {
            ImportError::Validation(messages) => assert_eq!(
                messages,
                vec!["Line 4. Program: 'Alpha', Group: 'River' does not exist.".to_string()]
            ),
            other => panic!("unexpected error: {:?}", other),
        }

        let kaa = list_yes_no(&pool, QuestionKind::KeyAgencyActions, None)
            .await
            .unwrap();
        assert_eq!(kaa.len(), 1);
        assert_eq!(kaa[0].title, "Old");
    }

    #[tokio::test]
    async fn test_evolution_defaults_dimension() {
        let pool = seeded_pool().await;
        let sheet = XlsxSheet::from_rows(vec![
            vec!["area", "program", "dimension", "nascent", "engaged", "capable", "effective"],
            vec!["", "beta", "", "n", "e", "c", "f"],
            vec!["", "Gamma", "Reach", "", "", "", ""],
        ]);

        import_evolution(&pool, &sheet).await.unwrap();

        let questions = list_evolution(&pool, None).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].title, DEFAULT_DIMENSION);
        assert_eq!(questions[0].program, 2);
        assert_eq!(questions[0].effective_description, "f");
        assert_eq!(questions[1].title, "Reach");
    }

    #[tokio::test]
    async fn test_evolution_unknown_program() {
        let pool = seeded_pool().await;
        let sheet = XlsxSheet::from_rows(vec![
            vec!["area", "program", "dimension"],
            vec!["", "Omega", "Reach"],
        ]);

        let err = import_evolution(&pool, &sheet).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid rows:\nLine 2. Program: 'Omega' does not exist."
        );
    }
}
