//! Agency import
//!
//! Columns: 0 agency, 1 program. An agency appearing on several rows is
//! created once and linked to every program named on its rows.

use sqlx::SqlitePool;
use std::collections::HashMap;

use super::xlsx::{XlsxLineObject, XlsxRow, XlsxSheet};
use super::{ensure_valid, ImportError, ImportSummary};

#[derive(Debug, Clone)]
struct AgencyLine {
    agency: String,
    program: String,
}

impl XlsxLineObject for AgencyLine {
    fn from_xlsx_row(row: &XlsxRow) -> Self {
        Self {
            agency: row.cell(0).to_string(),
            program: row.cell(1).to_string(),
        }
    }
}

pub(super) async fn import(
    pool: &SqlitePool,
    sheet: &XlsxSheet,
) -> Result<ImportSummary, ImportError> {
    let lines: Vec<(usize, AgencyLine)> = sheet.line_objects();

    let mut tx = pool.begin().await?;

    let mut errors = Vec::new();
    for (line, row) in &lines {
        if row.agency.is_empty() {
            errors.push(format!("Line {}. Missing agency.", line));
        }
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM programs WHERE name = ?)")
                .bind(&row.program)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            errors.push(format!("Line {}. Program: '{}' does not exist.", line, row.program));
        }
    }
    ensure_valid(errors)?;

    sqlx::query("DELETE FROM agencies").execute(&mut *tx).await?;

    let mut agencies: HashMap<String, i64> = HashMap::new();
    let mut links = 0;

    for (_, row) in &lines {
        let agency_id = match agencies.get(&row.agency.to_lowercase()) {
            Some(id) => *id,
            None => {
                let id = sqlx::query("INSERT INTO agencies (name) VALUES (?)")
                    .bind(&row.agency)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid();
                agencies.insert(row.agency.to_lowercase(), id);
                id
            }
        };

        // Program names are not unique across groups; link every match
        links += sqlx::query(
            r#"
            INSERT OR IGNORE INTO agency_programs (agency_id, program_id)
            SELECT ?, id FROM programs WHERE name = ?
            "#,
        )
        .bind(agency_id)
        .bind(&row.program)
        .execute(&mut *tx)
        .await?
        .rows_affected() as usize;
    }

    tx.commit().await?;

    Ok(ImportSummary {
        lines: lines.len(),
        records: vec![("agencies", agencies.len()), ("program links", links)],
    })
}
