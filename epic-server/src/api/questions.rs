//! Question resources
//!
//! National-Framework and Key-Agency-Actions questions share their handlers;
//! the route picks the kind through a [`YesNoKind`] marker.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use epic_common::db::{EvolutionQuestion, LinkagesQuestion, QuestionKind, YesNoJustifyQuestion};
use serde::Deserialize;
use tracing::info;

use super::{ApiJson, CurrentUser};
use crate::db::questions::{self, EvolutionStages};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `?program={id}`
#[derive(Debug, Default, Deserialize)]
pub struct ProgramFilter {
    pub program: Option<i64>,
}

/// Compile-time choice of yes/no question table
pub trait YesNoKind: Send + Sync + 'static {
    const KIND: QuestionKind;
}

pub struct NationalFramework;

impl YesNoKind for NationalFramework {
    const KIND: QuestionKind = QuestionKind::NationalFramework;
}

pub struct KeyAgencyActions;

impl YesNoKind for KeyAgencyActions {
    const KIND: QuestionKind = QuestionKind::KeyAgencyActions;
}

fn not_found(kind: QuestionKind, id: i64) -> ApiError {
    ApiError::NotFound(format!("{} question {}", kind.display_name(), id))
}

fn require_title(title: &str) -> ApiResult<()> {
    if title.trim().is_empty() {
        Err(ApiError::Validation(vec![
            "title: This field may not be blank.".to_string(),
        ]))
    } else {
        Ok(())
    }
}

async fn delete_any(
    state: &AppState,
    user: &CurrentUser,
    kind: QuestionKind,
    id: i64,
) -> ApiResult<StatusCode> {
    user.require_staff()?;

    if questions::delete_question(&state.db, kind, id).await? {
        info!("Deleted {} question {}", kind, id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(kind, id))
    }
}

// ========================================
// Yes/No-justify questions
// ========================================

#[derive(Debug, Deserialize)]
pub struct YesNoQuestionPayload {
    pub program: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub async fn list_yes_no<K: YesNoKind>(
    State(state): State<AppState>,
    Query(filter): Query<ProgramFilter>,
) -> ApiResult<Json<Vec<YesNoJustifyQuestion>>> {
    Ok(Json(
        questions::list_yes_no(&state.db, K::KIND, filter.program).await?,
    ))
}

pub async fn get_yes_no<K: YesNoKind>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<YesNoJustifyQuestion>> {
    questions::get_yes_no(&state.db, K::KIND, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(K::KIND, id))
}

pub async fn create_yes_no<K: YesNoKind>(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<YesNoQuestionPayload>,
) -> ApiResult<(StatusCode, Json<YesNoJustifyQuestion>)> {
    user.require_staff()?;
    require_title(&payload.title)?;

    let question = questions::insert_yes_no(
        &state.db,
        K::KIND,
        payload.program,
        &payload.title,
        &payload.description,
    )
    .await?;
    info!("Created {} question {}", K::KIND, question.id);
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_yes_no<K: YesNoKind>(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<YesNoQuestionPayload>,
) -> ApiResult<Json<YesNoJustifyQuestion>> {
    user.require_staff()?;
    require_title(&payload.title)?;

    questions::update_yes_no(
        &state.db,
        K::KIND,
        id,
        payload.program,
        &payload.title,
        &payload.description,
    )
    .await?
    .map(Json)
    .ok_or_else(|| not_found(K::KIND, id))
}

pub async fn delete_yes_no<K: YesNoKind>(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    delete_any(&state, &user, K::KIND, id).await
}

// ========================================
// Evolution questions
// ========================================

#[derive(Debug, Deserialize)]
pub struct EvolutionQuestionPayload {
    pub program: i64,
    pub title: String,
    #[serde(default)]
    pub nascent_description: String,
    #[serde(default)]
    pub engaged_description: String,
    #[serde(default)]
    pub capable_description: String,
    #[serde(default)]
    pub effective_description: String,
}

impl EvolutionQuestionPayload {
    fn stages(&self) -> EvolutionStages {
        EvolutionStages {
            nascent: self.nascent_description.clone(),
            engaged: self.engaged_description.clone(),
            capable: self.capable_description.clone(),
            effective: self.effective_description.clone(),
        }
    }
}

pub async fn list_evolution(
    State(state): State<AppState>,
    Query(filter): Query<ProgramFilter>,
) -> ApiResult<Json<Vec<EvolutionQuestion>>> {
    Ok(Json(questions::list_evolution(&state.db, filter.program).await?))
}

pub async fn get_evolution(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<EvolutionQuestion>> {
    questions::get_evolution(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(QuestionKind::Evolution, id))
}

pub async fn create_evolution(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<EvolutionQuestionPayload>,
) -> ApiResult<(StatusCode, Json<EvolutionQuestion>)> {
    user.require_staff()?;
    require_title(&payload.title)?;

    let question =
        questions::insert_evolution(&state.db, payload.program, &payload.title, &payload.stages())
            .await?;
    info!("Created evolution question {}", question.id);
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_evolution(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<EvolutionQuestionPayload>,
) -> ApiResult<Json<EvolutionQuestion>> {
    user.require_staff()?;
    require_title(&payload.title)?;

    questions::update_evolution(
        &state.db,
        id,
        payload.program,
        &payload.title,
        &payload.stages(),
    )
    .await?
    .map(Json)
    .ok_or_else(|| not_found(QuestionKind::Evolution, id))
}

pub async fn delete_evolution(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    delete_any(&state, &user, QuestionKind::Evolution, id).await
}

// ========================================
// Linkages questions
// ========================================

#[derive(Debug, Deserialize)]
pub struct LinkagesQuestionPayload {
    pub program: i64,
    pub title: String,
}

pub async fn list_linkages(
    State(state): State<AppState>,
    Query(filter): Query<ProgramFilter>,
) -> ApiResult<Json<Vec<LinkagesQuestion>>> {
    Ok(Json(questions::list_linkages(&state.db, filter.program).await?))
}

pub async fn get_linkages(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<LinkagesQuestion>> {
    questions::get_linkages(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(QuestionKind::Linkages, id))
}

pub async fn create_linkages(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<LinkagesQuestionPayload>,
) -> ApiResult<(StatusCode, Json<LinkagesQuestion>)> {
    user.require_staff()?;
    require_title(&payload.title)?;

    let question = questions::insert_linkages(&state.db, payload.program, &payload.title).await?;
    info!("Created linkages question {}", question.id);
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_linkages(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<LinkagesQuestionPayload>,
) -> ApiResult<Json<LinkagesQuestion>> {
    user.require_staff()?;
    require_title(&payload.title)?;

    questions::update_linkages(&state.db, id, payload.program, &payload.title)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(QuestionKind::Linkages, id))
}

pub async fn delete_linkages(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    delete_any(&state, &user, QuestionKind::Linkages, id).await
}
