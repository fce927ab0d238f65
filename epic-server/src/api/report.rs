//! Report endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use super::CurrentUser;
use crate::error::ApiResult;
use crate::report::{self, ProgramReport};
use crate::AppState;

const REPORT_FILENAME: &str = "epic_report.pdf";

/// `?program={id}` restricts the report to one program
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub program: Option<i64>,
}

/// GET /api/report
pub async fn get_report_pdf(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<impl IntoResponse> {
    let bytes = report::generate_report(&state.db, query.program, &user.0.username).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", REPORT_FILENAME),
            ),
        ],
        bytes,
    ))
}

/// GET /api/report/summary
pub async fn get_report_summary(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<ProgramReport>>> {
    Ok(Json(report::report_summary(&state.db, query.program).await?))
}
