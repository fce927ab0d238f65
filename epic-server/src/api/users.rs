//! User accounts

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use epic_common::db::EpicUser;
use serde::Deserialize;
use tracing::info;

use super::{ApiJson, CurrentUser};
use crate::db::users::{self, UserRecord};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub username: String,
    /// Required on create; on update, omitted keeps the current password
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub organization: Option<i64>,
    #[serde(default)]
    pub is_advisor: bool,
    #[serde(default)]
    pub is_staff: bool,
}

impl UserPayload {
    fn record(&self) -> ApiResult<UserRecord<'_>> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(ApiError::Validation(vec![
                "username: This field may not be blank.".to_string(),
            ]));
        }

        Ok(UserRecord {
            username,
            organization: self.organization,
            is_advisor: self.is_advisor,
            is_staff: self.is_staff,
        })
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<EpicUser>>> {
    Ok(Json(users::list_users(&state.db).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<EpicUser>> {
    users::get_user(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("User {}", id)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<(StatusCode, Json<EpicUser>)> {
    user.require_staff()?;
    let record = payload.record()?;
    let password = payload.password().ok_or_else(|| {
        ApiError::Validation(vec!["password: This field is required.".to_string()])
    })?;

    let created = users::insert_user(&state.db, &record, password).await?;
    info!("Created user {} '{}'", created.id, created.username);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<Json<EpicUser>> {
    user.require_staff()?;
    let record = payload.record()?;

    users::update_user(&state.db, id, &record, payload.password())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("User {}", id)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require_staff()?;

    if users::delete_user(&state.db, id).await? {
        info!("Deleted user {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("User {}", id)))
    }
}
