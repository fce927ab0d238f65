//! Answers
//!
//! Users work with their own answers. Staff see and may change everyone's;
//! for anyone else, other users' answers do not exist (404).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use epic_common::db::{Answer, AnswerValue, QuestionKind};
use serde::Deserialize;
use tracing::info;

use super::{ApiJson, CurrentUser};
use crate::db::answers::{self, AnswerFilter};
use crate::db::{programs, questions};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `?question_type=...&question=...`
#[derive(Debug, Default, Deserialize)]
pub struct AnswerQuery {
    pub question_type: Option<QuestionKind>,
    pub question: Option<i64>,
}

/// Question id plus the type-tagged payload
#[derive(Debug, Deserialize)]
pub struct AnswerPayload {
    pub question: i64,
    #[serde(flatten)]
    pub value: AnswerValue,
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Answer {}", id))
}

/// Check the referenced question and any selected programs exist
async fn validate(state: &AppState, payload: &AnswerPayload) -> ApiResult<()> {
    let kind = payload.value.kind();
    let mut errors = Vec::new();

    if !questions::question_exists(&state.db, kind, payload.question).await? {
        errors.push(format!(
            "question: Invalid pk \"{}\" - {} question does not exist.",
            payload.question,
            kind.display_name()
        ));
    }

    if let AnswerValue::Linkages { selected_programs } = &payload.value {
        for id in programs::missing_program_ids(&state.db, selected_programs).await? {
            errors.push(format!(
                "selected_programs: Invalid pk \"{}\" - object does not exist.",
                id
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Load an answer the current user may see
async fn visible_answer(state: &AppState, user: &CurrentUser, id: i64) -> ApiResult<Answer> {
    match answers::get_answer(&state.db, id).await? {
        Some(answer) if user.0.is_staff || answer.user == user.0.id => Ok(answer),
        _ => Err(not_found(id)),
    }
}

pub async fn list_answers(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<AnswerQuery>,
) -> ApiResult<Json<Vec<Answer>>> {
    let filter = AnswerFilter {
        user: (!user.0.is_staff).then_some(user.0.id),
        question_type: query.question_type,
        question: query.question,
    };

    Ok(Json(answers::list_answers(&state.db, &filter).await?))
}

pub async fn get_answer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Answer>> {
    Ok(Json(visible_answer(&state, &user, id).await?))
}

/// POST /api/answer
///
/// Answering a question twice replaces the earlier answer.
pub async fn create_answer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<AnswerPayload>,
) -> ApiResult<(StatusCode, Json<Answer>)> {
    validate(&state, &payload).await?;

    let answer = answers::upsert_answer(&state.db, user.0.id, payload.question, &payload.value)
        .await?;
    info!(
        "User '{}' answered {} question {}",
        user.0.username,
        payload.value.kind(),
        payload.question
    );
    Ok((StatusCode::CREATED, Json(answer)))
}

pub async fn update_answer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<AnswerPayload>,
) -> ApiResult<Json<Answer>> {
    visible_answer(&state, &user, id).await?;
    validate(&state, &payload).await?;

    answers::update_answer(&state.db, id, payload.question, &payload.value)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

pub async fn delete_answer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    visible_answer(&state, &user, id).await?;

    if answers::delete_answer(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
