//! Spreadsheet import
//!
//! Every importer reads the first worksheet of an `.xlsx` workbook, parses
//! each data row into a line object, validates all of them and then replaces
//! the target table with the new batch. Validation and replacement share one
//! transaction: a batch with any invalid row changes nothing.

mod agency;
mod domain;
mod questions;
pub mod xlsx;

use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

pub use xlsx::{XlsxLineObject, XlsxRow, XlsxSheet};

/// Entities that can be bulk-imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportEntity {
    /// Area → group → program tree
    Area,
    Agency,
    NationalFrameworkQuestion,
    KeyAgencyActionsQuestion,
    EvolutionQuestion,
}

impl ImportEntity {
    pub const ALL: [ImportEntity; 5] = [
        ImportEntity::Area,
        ImportEntity::Agency,
        ImportEntity::NationalFrameworkQuestion,
        ImportEntity::KeyAgencyActionsQuestion,
        ImportEntity::EvolutionQuestion,
    ];

    /// Path segment used by the admin import endpoints
    pub fn slug(&self) -> &'static str {
        match self {
            ImportEntity::Area => "area",
            ImportEntity::Agency => "agency",
            ImportEntity::NationalFrameworkQuestion => "nationalframeworkquestion",
            ImportEntity::KeyAgencyActionsQuestion => "keyagencyactionsquestion",
            ImportEntity::EvolutionQuestion => "evolutionquestion",
        }
    }
}

impl fmt::Display for ImportEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ImportEntity {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImportEntity::ALL
            .into_iter()
            .find(|entity| entity.slug() == s)
            .ok_or_else(|| ImportError::UnknownEntity(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unknown import entity: {0}")]
    UnknownEntity(String),

    /// Unreadable workbook or no worksheet
    #[error("Invalid workbook: {0}")]
    Workbook(String),

    /// One message per offending row
    #[error("Invalid rows:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Rows read and records inserted by one import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub lines: usize,
    pub records: Vec<(&'static str, usize)>,
}

impl ImportSummary {
    /// Inserted count for one record kind (0 when absent)
    pub fn count(&self, kind: &str) -> usize {
        self.records
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lines", self.lines)?;
        for (kind, count) in &self.records {
            write!(f, ", {} {}", count, kind)?;
        }
        Ok(())
    }
}

/// Import workbook bytes for `entity`
pub async fn import_xlsx(
    pool: &SqlitePool,
    entity: ImportEntity,
    bytes: &[u8],
) -> Result<ImportSummary, ImportError> {
    let result = match XlsxSheet::from_bytes(bytes) {
        Ok(sheet) => dispatch(pool, entity, &sheet).await,
        Err(e) => Err(e),
    };
    log_outcome(entity, &result);
    result
}

/// Import an already-read sheet for `entity`
pub async fn import_sheet(
    pool: &SqlitePool,
    entity: ImportEntity,
    sheet: &XlsxSheet,
) -> Result<ImportSummary, ImportError> {
    let result = dispatch(pool, entity, sheet).await;
    log_outcome(entity, &result);
    result
}

async fn dispatch(
    pool: &SqlitePool,
    entity: ImportEntity,
    sheet: &XlsxSheet,
) -> Result<ImportSummary, ImportError> {
    match entity {
        ImportEntity::Area => domain::import(pool, sheet).await,
        ImportEntity::Agency => agency::import(pool, sheet).await,
        ImportEntity::NationalFrameworkQuestion => {
            questions::import_yes_no(
                pool,
                epic_common::db::QuestionKind::NationalFramework,
                sheet,
            )
            .await
        }
        ImportEntity::KeyAgencyActionsQuestion => {
            questions::import_yes_no(
                pool,
                epic_common::db::QuestionKind::KeyAgencyActions,
                sheet,
            )
            .await
        }
        ImportEntity::EvolutionQuestion => questions::import_evolution(pool, sheet).await,
    }
}

fn log_outcome(entity: ImportEntity, result: &Result<ImportSummary, ImportError>) {
    match result {
        Ok(summary) => info!("Imported {}: {}", entity, summary),
        Err(e) => warn!("Import of {} failed: {}", entity, e),
    }
}

/// Fail with every collected row error, if any
fn ensure_valid(errors: Vec<String>) -> Result<(), ImportError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ImportError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_entity_slugs_round_trip() {
        for entity in ImportEntity::ALL {
            assert_eq!(entity.slug().parse::<ImportEntity>().unwrap(), entity);
        }
        assert!(matches!(
            "linkagesquestion".parse::<ImportEntity>(),
            Err(ImportError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_summary_display() {
        let summary = ImportSummary {
            lines: 3,
            records: vec![("areas", 1), ("programs", 3)],
        };
        assert_eq!(summary.to_string(), "3 lines, 1 areas, 3 programs");
        assert_eq!(summary.count("programs"), 3);
        assert_eq!(summary.count("groups"), 0);
    }

    /// Writer collecting formatted log output
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unreadable_workbook_is_logged() {
        let pool = epic_common::db::init_memory_database().await.unwrap();
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let result = import_xlsx(&pool, ImportEntity::Agency, b"not a workbook").await;
        assert!(matches!(result, Err(ImportError::Workbook(_))));

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("Import of agency failed"));
    }

    #[tokio::test]
    async fn test_header_below_blank_row_is_not_imported() {
        let pool = epic_common::db::init_memory_database().await.unwrap();
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        // Row 1 left empty
        for (col, value) in ["area", "group", "program"].iter().enumerate() {
            worksheet.write_string(1, col as u16, *value).unwrap();
        }
        for (col, value) in ["Water", "Coast", "Alpha"].iter().enumerate() {
            worksheet.write_string(2, col as u16, *value).unwrap();
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let summary = import_xlsx(&pool, ImportEntity::Area, &bytes).await.unwrap();
        assert_eq!(summary.lines, 1);

        let names: Vec<String> = crate::db::areas::list_areas(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Water".to_string()]);
    }
}
