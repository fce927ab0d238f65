//! HTTP API handlers for epic-server

pub mod admin;
pub mod answers;
pub mod auth;
pub mod health;
pub mod organization;
pub mod questions;
pub mod report;
pub mod users;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    response::Redirect,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};

pub use auth::{auth_middleware, obtain_auth_token, CurrentUser};
pub use health::health_routes;

/// Collection endpoints listed by `GET /api`
pub const RESOURCES: [&str; 10] = [
    "epicuser",
    "area",
    "agency",
    "group",
    "program",
    "nationalframeworkquestion",
    "keyagencyactionsquestion",
    "evolutionquestion",
    "linkagesquestion",
    "answer",
];

/// JSON body extractor whose rejections render as 400 [`ApiError`]s
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(ApiJson(value))
    }
}

/// Reject blank names
pub(crate) fn require_name(name: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        Err(ApiError::Validation(vec![
            "name: This field may not be blank.".to_string(),
        ]))
    } else {
        Ok(())
    }
}

/// GET /
pub async fn root_redirect() -> Redirect {
    Redirect::to("/api")
}

/// GET /api
pub async fn api_root() -> Json<Value> {
    let resources: serde_json::Map<String, Value> = RESOURCES
        .iter()
        .map(|name| (name.to_string(), json!(format!("/api/{}", name))))
        .collect();

    Json(json!({
        "resources": resources,
        "token_auth": "/api/token-auth",
        "report": "/api/report",
        "report_summary": "/api/report/summary",
    }))
}
