//! Admin spreadsheet import
//!
//! `GET /admin/import/:entity` serves a bare upload form;
//! `POST /admin/import/:entity` runs the importer on the `xlsx_file` field.
//! Clients only ever see the two fixed messages below; the cause of a
//! failure goes to the log.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Html,
    Extension, Json,
};
use epic_common::api::MessageResponse;
use tracing::{info, warn};

use super::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::importers::{import_xlsx, ImportEntity};
use crate::AppState;

pub const IMPORT_SUCCESS_MESSAGE: &str = "Your xlsx file has been imported";
pub const IMPORT_FAILURE_MESSAGE: &str = "It was not possible to import the requested xlsx file.";

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const UPLOAD_FIELD: &str = "xlsx_file";

fn parse_entity(slug: &str) -> ApiResult<ImportEntity> {
    slug.parse()
        .map_err(|_| ApiError::NotFound(format!("No importer for '{}'", slug)))
}

/// GET /admin/import/:entity
pub async fn import_form(Path(entity): Path<String>) -> ApiResult<Html<String>> {
    let entity = parse_entity(&entity)?;

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Import {entity}</title></head>
<body>
<h1>Import {entity}</h1>
<form method="post" enctype="multipart/form-data">
<input type="file" name="{field}" accept=".xlsx" required>
<button type="submit">Upload</button>
</form>
</body>
</html>
"#,
        entity = entity,
        field = UPLOAD_FIELD,
    )))
}

/// POST /admin/import/:entity
pub async fn import_upload(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(entity): Path<String>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let entity = parse_entity(&entity)?;
    user.require_staff()?;

    let bytes = match read_upload(multipart).await {
        Ok(bytes) => bytes,
        Err(reason) => {
            warn!("Rejected {} upload from '{}': {}", entity, user.0.username, reason);
            return Ok(failure());
        }
    };

    match import_xlsx(&state.db, entity, &bytes).await {
        Ok(summary) => {
            info!(
                "'{}' imported {} xlsx: {}",
                user.0.username, entity, summary
            );
            Ok((
                StatusCode::OK,
                Json(MessageResponse::new(IMPORT_SUCCESS_MESSAGE)),
            ))
        }
        // import_xlsx logs the cause
        Err(_) => Ok(failure()),
    }
}

fn failure() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(MessageResponse::new(IMPORT_FAILURE_MESSAGE)),
    )
}

/// Bytes of the upload field
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await.map_err(|e| e.to_string())?;
            return Ok(bytes.to_vec());
        }
    }

    Err(format!("missing '{}' field", UPLOAD_FIELD))
}
