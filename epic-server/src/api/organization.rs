//! Areas, groups, programs and agencies
//!
//! Any authenticated user may read; changes require staff.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use epic_common::db::{Agency, Area, Group, Program};
use serde::Deserialize;
use tracing::info;

use super::{require_name, ApiJson, CurrentUser};
use crate::db::{agencies, areas, groups, programs};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn not_found(kind: &str, id: i64) -> ApiError {
    ApiError::NotFound(format!("{} {}", kind, id))
}

// ========================================
// Areas
// ========================================

#[derive(Debug, Deserialize)]
pub struct AreaPayload {
    pub name: String,
}

pub async fn list_areas(State(state): State<AppState>) -> ApiResult<Json<Vec<Area>>> {
    Ok(Json(areas::list_areas(&state.db).await?))
}

pub async fn get_area(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Area>> {
    areas::get_area(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Area", id))
}

pub async fn create_area(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<AreaPayload>,
) -> ApiResult<(StatusCode, Json<Area>)> {
    user.require_staff()?;
    require_name(&payload.name)?;

    let area = areas::insert_area(&state.db, payload.name.trim()).await?;
    info!("Created area {} '{}'", area.id, area.name);
    Ok((StatusCode::CREATED, Json(area)))
}

pub async fn update_area(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<AreaPayload>,
) -> ApiResult<Json<Area>> {
    user.require_staff()?;
    require_name(&payload.name)?;

    areas::update_area(&state.db, id, payload.name.trim())
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Area", id))
}

pub async fn delete_area(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require_staff()?;

    if areas::delete_area(&state.db, id).await? {
        info!("Deleted area {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Area", id))
    }
}

// ========================================
// Groups
// ========================================

#[derive(Debug, Deserialize)]
pub struct GroupPayload {
    pub name: String,
    pub area: i64,
}

pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Json<Vec<Group>>> {
    Ok(Json(groups::list_groups(&state.db).await?))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Group>> {
    groups::get_group(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Group", id))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<GroupPayload>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    user.require_staff()?;
    require_name(&payload.name)?;

    let group = groups::insert_group(&state.db, payload.name.trim(), payload.area).await?;
    info!("Created group {} '{}'", group.id, group.name);
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<GroupPayload>,
) -> ApiResult<Json<Group>> {
    user.require_staff()?;
    require_name(&payload.name)?;

    groups::update_group(&state.db, id, payload.name.trim(), payload.area)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Group", id))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require_staff()?;

    if groups::delete_group(&state.db, id).await? {
        info!("Deleted group {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Group", id))
    }
}

// ========================================
// Programs
// ========================================

#[derive(Debug, Deserialize)]
pub struct ProgramPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub group: i64,
}

pub async fn list_programs(State(state): State<AppState>) -> ApiResult<Json<Vec<Program>>> {
    Ok(Json(programs::list_programs(&state.db).await?))
}

pub async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Program>> {
    programs::get_program(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Program", id))
}

pub async fn create_program(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<ProgramPayload>,
) -> ApiResult<(StatusCode, Json<Program>)> {
    user.require_staff()?;
    require_name(&payload.name)?;

    let program = programs::insert_program(
        &state.db,
        payload.name.trim(),
        &payload.description,
        payload.group,
    )
    .await?;
    info!("Created program {} '{}'", program.id, program.name);
    Ok((StatusCode::CREATED, Json(program)))
}

pub async fn update_program(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<ProgramPayload>,
) -> ApiResult<Json<Program>> {
    user.require_staff()?;
    require_name(&payload.name)?;

    programs::update_program(
        &state.db,
        id,
        payload.name.trim(),
        &payload.description,
        payload.group,
    )
    .await?
    .map(Json)
    .ok_or_else(|| not_found("Program", id))
}

pub async fn delete_program(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require_staff()?;

    if programs::delete_program(&state.db, id).await? {
        info!("Deleted program {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Program", id))
    }
}

// ========================================
// Agencies
// ========================================

#[derive(Debug, Deserialize)]
pub struct AgencyPayload {
    pub name: String,
    #[serde(default)]
    pub programs: Vec<i64>,
}

async fn check_programs(state: &AppState, ids: &[i64]) -> ApiResult<()> {
    let missing = programs::missing_program_ids(&state.db, ids).await?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(
            missing
                .into_iter()
                .map(|id| format!("programs: Invalid pk \"{}\" - object does not exist.", id))
                .collect(),
        ))
    }
}

pub async fn list_agencies(State(state): State<AppState>) -> ApiResult<Json<Vec<Agency>>> {
    Ok(Json(agencies::list_agencies(&state.db).await?))
}

pub async fn get_agency(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Agency>> {
    agencies::get_agency(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Agency", id))
}

pub async fn create_agency(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<AgencyPayload>,
) -> ApiResult<(StatusCode, Json<Agency>)> {
    user.require_staff()?;
    require_name(&payload.name)?;
    check_programs(&state, &payload.programs).await?;

    let agency = agencies::insert_agency(&state.db, payload.name.trim(), &payload.programs).await?;
    info!("Created agency {} '{}'", agency.id, agency.name);
    Ok((StatusCode::CREATED, Json(agency)))
}

pub async fn update_agency(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<AgencyPayload>,
) -> ApiResult<Json<Agency>> {
    user.require_staff()?;
    require_name(&payload.name)?;
    check_programs(&state, &payload.programs).await?;

    agencies::update_agency(&state.db, id, payload.name.trim(), &payload.programs)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Agency", id))
}

pub async fn delete_agency(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require_staff()?;

    if agencies::delete_agency(&state.db, id).await? {
        info!("Deleted agency {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Agency", id))
    }
}
