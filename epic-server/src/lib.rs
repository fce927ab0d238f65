//! epic-server library
//!
//! REST API, admin spreadsheet import and PDF report for the EPIC survey
//! backend.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod importers;
pub mod report;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
///
/// Everything except `/`, `/health` and `/api/token-auth` requires a token.
pub fn build_router(state: AppState) -> Router {
    use api::questions::{KeyAgencyActions, NationalFramework};
    use api::{admin, answers, organization as org, questions, report, users};
    use axum::middleware;
    use axum::routing::get;

    let resources = Router::new()
        .route("/api", get(api::api_root))
        .route("/api/epicuser", get(users::list_users).post(users::create_user))
        .route(
            "/api/epicuser/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/area", get(org::list_areas).post(org::create_area))
        .route(
            "/api/area/:id",
            get(org::get_area).put(org::update_area).delete(org::delete_area),
        )
        .route("/api/group", get(org::list_groups).post(org::create_group))
        .route(
            "/api/group/:id",
            get(org::get_group).put(org::update_group).delete(org::delete_group),
        )
        .route("/api/program", get(org::list_programs).post(org::create_program))
        .route(
            "/api/program/:id",
            get(org::get_program)
                .put(org::update_program)
                .delete(org::delete_program),
        )
        .route("/api/agency", get(org::list_agencies).post(org::create_agency))
        .route(
            "/api/agency/:id",
            get(org::get_agency)
                .put(org::update_agency)
                .delete(org::delete_agency),
        )
        .route(
            "/api/nationalframeworkquestion",
            get(questions::list_yes_no::<NationalFramework>)
                .post(questions::create_yes_no::<NationalFramework>),
        )
        .route(
            "/api/nationalframeworkquestion/:id",
            get(questions::get_yes_no::<NationalFramework>)
                .put(questions::update_yes_no::<NationalFramework>)
                .delete(questions::delete_yes_no::<NationalFramework>),
        )
        .route(
            "/api/keyagencyactionsquestion",
            get(questions::list_yes_no::<KeyAgencyActions>)
                .post(questions::create_yes_no::<KeyAgencyActions>),
        )
        .route(
            "/api/keyagencyactionsquestion/:id",
            get(questions::get_yes_no::<KeyAgencyActions>)
                .put(questions::update_yes_no::<KeyAgencyActions>)
                .delete(questions::delete_yes_no::<KeyAgencyActions>),
        )
        .route(
            "/api/evolutionquestion",
            get(questions::list_evolution).post(questions::create_evolution),
        )
        .route(
            "/api/evolutionquestion/:id",
            get(questions::get_evolution)
                .put(questions::update_evolution)
                .delete(questions::delete_evolution),
        )
        .route(
            "/api/linkagesquestion",
            get(questions::list_linkages).post(questions::create_linkages),
        )
        .route(
            "/api/linkagesquestion/:id",
            get(questions::get_linkages)
                .put(questions::update_linkages)
                .delete(questions::delete_linkages),
        )
        .route("/api/answer", get(answers::list_answers).post(answers::create_answer))
        .route(
            "/api/answer/:id",
            get(answers::get_answer)
                .put(answers::update_answer)
                .delete(answers::delete_answer),
        )
        .route("/api/report", get(report::get_report_pdf))
        .route("/api/report/summary", get(report::get_report_summary));

    // Uploads get their own, larger body limit
    let admin = Router::new()
        .route(
            "/admin/import/:entity",
            get(admin::import_form).post(admin::import_upload),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(admin::MAX_UPLOAD_BYTES));

    // route_layer: unmatched paths stay 404 instead of 401
    let protected = resources.merge(admin).route_layer(middleware::from_fn_with_state(
        state.clone(),
        api::auth_middleware,
    ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/", get(api::root_redirect))
        .route("/api/token-auth", axum::routing::post(api::obtain_auth_token))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
