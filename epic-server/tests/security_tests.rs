//! Authentication, permission and admin import tests
//!
//! Admin uploads are built as raw multipart bodies around workbooks written
//! with rust_xlsxwriter.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use epic_common::api::auth::get_or_create_token;
use epic_common::db::init_memory_database;
use epic_server::api::admin::{IMPORT_FAILURE_MESSAGE, IMPORT_SUCCESS_MESSAGE, MAX_UPLOAD_BYTES};
use epic_server::db::users::{self, UserRecord};
use epic_server::db::{areas, groups, programs, questions};
use epic_server::{build_router, AppState};
use epic_common::db::QuestionKind;
use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt;

const BOUNDARY: &str = "epic-test-boundary";

async fn setup_test_db() -> SqlitePool {
    init_memory_database()
        .await
        .expect("Should create in-memory database")
}

async fn create_user(pool: &SqlitePool, username: &str, is_staff: bool) -> String {
    let record = UserRecord {
        username,
        organization: None,
        is_advisor: false,
        is_staff,
    };
    let user = users::insert_user(pool, &record, "secret").await.unwrap();
    get_or_create_token(pool, user.id).await.unwrap()
}

fn setup_app(db: SqlitePool) -> axum::Router {
    build_router(AppState::new(db))
}

fn authorized(method: &str, uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

/// Test helper: single-sheet workbook from rows of strings
fn workbook(rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            worksheet.write_string(r as u32, c as u16, *value).unwrap();
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Test helper: multipart upload of `bytes` as the `xlsx_file` field
fn upload_request(entity: &str, token: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"xlsx_file\"; filename=\"import.xlsx\"\r\n",
    );
    body.extend_from_slice(
        b"Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n",
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(format!("/admin/import/{}", entity))
        .header(header::AUTHORIZATION, format!("Token {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: area Water, group Coast, programs Alpha and Beta
async fn seed_catalogue(pool: &SqlitePool) {
    let area = areas::insert_area(pool, "Water").await.unwrap();
    let group = groups::insert_group(pool, "Coast", area.id).await.unwrap();
    programs::insert_program(pool, "Alpha", "", group.id).await.unwrap();
    programs::insert_program(pool, "Beta", "", group.id).await.unwrap();
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = setup_app(setup_test_db().await);

    for uri in ["/api", "/api/area", "/api/answer", "/api/report/summary"] {
        let response = app
            .clone()
            .oneshot(authorized("GET", uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .oneshot(authorized("GET", "/api/area", Some("Token not-a-real-key")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_malformed_authorization_header_is_unauthorized() {
    let db = setup_test_db().await;
    let token = create_user(&db, "ana", false).await;
    let app = setup_app(db);

    let response = app
        .oneshot(authorized("GET", "/api/area", Some(&format!("Basic {}", token))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_scheme_is_accepted() {
    let db = setup_test_db().await;
    let token = create_user(&db, "ana", false).await;
    let app = setup_app(db);

    let response = app
        .oneshot(authorized("GET", "/api/area", Some(&format!("Bearer {}", token))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_not_found_without_token() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .oneshot(authorized("GET", "/api/nothing-here", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Permissions
// =============================================================================

#[tokio::test]
async fn test_non_staff_cannot_mutate_catalogue() {
    let db = setup_test_db().await;
    seed_catalogue(&db).await;
    let token = create_user(&db, "ana", false).await;
    let app = setup_app(db);

    let request = Request::builder()
        .method("POST")
        .uri("/api/area")
        .header(header::AUTHORIZATION, format!("Token {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"name": "Land"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(authorized("DELETE", "/api/program/1", Some(&format!("Token {}", token))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Reads stay open to any authenticated user
    let response = app
        .oneshot(authorized("GET", "/api/program", Some(&format!("Token {}", token))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_staff_cannot_import() {
    let db = setup_test_db().await;
    let token = create_user(&db, "ana", false).await;
    let app = setup_app(db);

    let bytes = workbook(&[&["area", "group", "program"], &["Water", "Coast", "Alpha"]]);
    let response = app.oneshot(upload_request("area", &token, &bytes)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Admin import
// =============================================================================

#[tokio::test]
async fn test_import_form_is_served() {
    let db = setup_test_db().await;
    let token = create_user(&db, "boss", true).await;
    let app = setup_app(db);

    let response = app
        .oneshot(authorized(
            "GET",
            "/admin/import/evolutionquestion",
            Some(&format!("Token {}", token)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("name=\"xlsx_file\""));
}

#[tokio::test]
async fn test_import_unknown_entity_is_not_found() {
    let db = setup_test_db().await;
    let token = create_user(&db, "boss", true).await;
    let app = setup_app(db);

    let bytes = workbook(&[&["x"]]);
    let response = app
        .oneshot(upload_request("linkagesquestion", &token, &bytes))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_domain_then_questions() {
    let db = setup_test_db().await;
    let token = create_user(&db, "boss", true).await;
    let app = setup_app(db.clone());

    let domain = workbook(&[
        &["area", "group", "program", "description"],
        &["Water", "Coast", "Alpha", "First"],
        &["water", "Coast", "Beta", ""],
    ]);
    let response = app
        .clone()
        .oneshot(upload_request("area", &token, &domain))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], IMPORT_SUCCESS_MESSAGE);

    let nf = workbook(&[
        &["group", "program", "description", "title"],
        &["Coast", "Alpha", "Plan", "Is there a plan?"],
        &["Coast", "Beta", "Law", "Is there a law?"],
    ]);
    let response = app
        .clone()
        .oneshot(upload_request("nationalframeworkquestion", &token, &nf))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(areas::list_areas(&db).await.unwrap().len(), 1);
    let headers = questions::list_headers(&db, QuestionKind::NationalFramework, None)
        .await
        .unwrap();
    assert_eq!(headers.len(), 2);
}

#[tokio::test]
async fn test_failed_import_keeps_previous_batch() {
    let db = setup_test_db().await;
    seed_catalogue(&db).await;
    let token = create_user(&db, "boss", true).await;
    let app = setup_app(db.clone());

    let good = workbook(&[
        &["group", "program", "dimension", "nascent", "engaged", "capable", "effective"],
        &["Coast", "Alpha", "", "n", "e", "c", "f"],
    ]);
    let response = app
        .clone()
        .oneshot(upload_request("evolutionquestion", &token, &good))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bad = workbook(&[
        &["group", "program", "dimension", "nascent", "engaged", "capable", "effective"],
        &["Coast", "Beta", "Reach", "n", "e", "c", "f"],
        &["Coast", "Nowhere", "Reach", "n", "e", "c", "f"],
    ]);
    let response = app
        .clone()
        .oneshot(upload_request("evolutionquestion", &token, &bad))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], IMPORT_FAILURE_MESSAGE);

    let remaining = questions::list_evolution(&db, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "Default dimension");
}

#[tokio::test]
async fn test_corrupt_upload_yields_generic_failure() {
    let db = setup_test_db().await;
    let token = create_user(&db, "boss", true).await;
    let app = setup_app(db);

    let response = app
        .oneshot(upload_request("agency", &token, b"not a workbook"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], IMPORT_FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let db = setup_test_db().await;
    let token = create_user(&db, "boss", true).await;
    let app = setup_app(db);

    let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
    let response = app
        .oneshot(upload_request("area", &token, &oversized))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
