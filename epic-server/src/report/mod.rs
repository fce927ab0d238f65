//! Survey report generation
//!
//! [`summary`] aggregates answers per program and question, [`document`]
//! turns the aggregate into flowables and [`pdf`] renders those.

pub mod document;
pub mod pdf;
pub mod summary;

use epic_common::db::get_setting;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

pub use document::{build_flowables, BarChart, Flowable, ReportMeta};
pub use pdf::{render_pdf, PdfMeta};
pub use summary::{
    build_summary, summarize_question, JustificationGroup, ProgramReport, QuestionReport, Tally,
};

const DEFAULT_TITLE: &str = "Epic Report";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Program not found: {0}")]
    ProgramNotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] epic_common::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Report texts from the settings table
pub async fn load_meta(pool: &SqlitePool, author: &str) -> Result<ReportMeta, ReportError> {
    Ok(ReportMeta {
        title: get_setting(pool, "report_title")
            .await?
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        subtitle: get_setting(pool, "report_subtitle").await?.unwrap_or_default(),
        description: get_setting(pool, "report_description")
            .await?
            .unwrap_or_default(),
        author: author.to_string(),
        generated_at: epic_common::time::now(),
    })
}

/// Summary for all programs, or only `program`
pub async fn report_summary(
    pool: &SqlitePool,
    program: Option<i64>,
) -> Result<Vec<ProgramReport>, ReportError> {
    let programs = build_summary(pool, program).await?;
    match program {
        Some(id) if programs.is_empty() => Err(ReportError::ProgramNotFound(id)),
        _ => Ok(programs),
    }
}

/// Generate the PDF report requested by `author`
pub async fn generate_report(
    pool: &SqlitePool,
    program: Option<i64>,
    author: &str,
) -> Result<Vec<u8>, ReportError> {
    let programs = report_summary(pool, program).await?;
    let meta = load_meta(pool, author).await?;

    let flowables = build_flowables(&meta, &programs);
    let pdf_meta = PdfMeta {
        title: meta.title.clone(),
        subtitle: meta.subtitle.clone(),
        author: meta.author.clone(),
        subject: meta.description.clone(),
    };
    let bytes = render_pdf(&pdf_meta, &flowables)?;

    info!(
        "Generated report for {} program(s), {} bytes",
        programs.len(),
        bytes.len()
    );
    Ok(bytes)
}
