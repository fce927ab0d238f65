//! Area → group → program tree import
//!
//! Columns: 0 area, 1 group, 2 program, 3 description (optional).

use sqlx::SqlitePool;
use std::collections::HashMap;

use super::xlsx::{XlsxLineObject, XlsxRow, XlsxSheet};
use super::{ensure_valid, ImportError, ImportSummary};

#[derive(Debug, Clone)]
struct DomainLine {
    area: String,
    group: String,
    program: String,
    description: String,
}

impl XlsxLineObject for DomainLine {
    fn from_xlsx_row(row: &XlsxRow) -> Self {
        Self {
            area: row.cell(0).to_string(),
            group: row.cell(1).to_string(),
            program: row.cell(2).to_string(),
            description: row.cell(3).to_string(),
        }
    }
}

fn validate(lines: &[(usize, DomainLine)]) -> Vec<String> {
    let mut errors = Vec::new();
    for (line, row) in lines {
        for (field, value) in [
            ("area", &row.area),
            ("group", &row.group),
            ("program", &row.program),
        ] {
            if value.is_empty() {
                errors.push(format!("Line {}. Missing {}.", line, field));
            }
        }
    }
    errors
}

pub(super) async fn import(
    pool: &SqlitePool,
    sheet: &XlsxSheet,
) -> Result<ImportSummary, ImportError> {
    let lines: Vec<(usize, DomainLine)> = sheet.line_objects();
    ensure_valid(validate(&lines))?;

    let mut tx = pool.begin().await?;

    // Cascades to groups, programs, questions and their answers
    sqlx::query("DELETE FROM areas").execute(&mut *tx).await?;

    let mut areas: HashMap<String, i64> = HashMap::new();
    let mut groups: HashMap<(i64, String), i64> = HashMap::new();
    let mut programs: HashMap<(i64, String), i64> = HashMap::new();

    for (_, row) in &lines {
        let area_id = match areas.get(&row.area.to_lowercase()) {
            Some(id) => *id,
            None => {
                let id = sqlx::query("INSERT INTO areas (name) VALUES (?)")
                    .bind(&row.area)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid();
                areas.insert(row.area.to_lowercase(), id);
                id
            }
        };

        let group_key = (area_id, row.group.to_lowercase());
        let group_id = match groups.get(&group_key) {
            Some(id) => *id,
            None => {
                let id = sqlx::query("INSERT INTO program_groups (name, area_id) VALUES (?, ?)")
                    .bind(&row.group)
                    .bind(area_id)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid();
                groups.insert(group_key, id);
                id
            }
        };

        let program_key = (group_id, row.program.to_lowercase());
        if !programs.contains_key(&program_key) {
            let id = sqlx::query(
                "INSERT INTO programs (name, description, group_id) VALUES (?, ?, ?)",
            )
            .bind(&row.program)
            .bind(&row.description)
            .bind(group_id)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
            programs.insert(program_key, id);
        }
    }

    tx.commit().await?;

    Ok(ImportSummary {
        lines: lines.len(),
        records: vec![
            ("areas", areas.len()),
            ("groups", groups.len()),
            ("programs", programs.len()),
        ],
    })
}
