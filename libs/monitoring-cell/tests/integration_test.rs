// =====================================================================================
// MONITORING CELL INTEGRATION TESTS - ROUTER & ADMIN ACCESS
// =====================================================================================

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use common::{collaborators, frontend_root, service_with, test_config};
use monitoring_cell::{create_monitoring_router, MonitoringHandlers};
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestUser};

fn setup_router(dir: &tempfile::TempDir) -> (Router, Arc<AppConfig>) {
    let config = test_config("http://127.0.0.1:1", &frontend_root(dir));
    let (service, _) = service_with(config.clone(), collaborators(&config));
    let handlers = Arc::new(MonitoringHandlers::with_service(config.clone(), Arc::new(service)));
    (create_monitoring_router(handlers), config)
}

fn admin_token(config: &AppConfig) -> String {
    let admin = TestUser::admin("ops@medicationreminder.com");
    JwtTestUtils::create_test_token(&admin, &config.supabase_jwt_secret, Some(1))
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_routes_require_a_token() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = setup_router(&dir);

    let response = app.oneshot(request("GET", "/dashboard", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = json_body(response).await;
    assert!(json.get("error").is_some());
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let (app, config) = setup_router(&dir);
    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.supabase_jwt_secret, Some(1));

    let response = app
        .oneshot(request("POST", "/sync-features", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_expired_admin_token_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (app, config) = setup_router(&dir);
    let admin = TestUser::admin("ops@medicationreminder.com");
    let token = JwtTestUtils::create_expired_token(&admin, &config.supabase_jwt_secret);

    let response = app.oneshot(request("GET", "/alerts", Some(&token), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_for_admin() {
    let dir = tempfile::tempdir().unwrap();
    let (app, config) = setup_router(&dir);
    let token = admin_token(&config);

    let response = app.oneshot(request("GET", "/dashboard", Some(&token), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["system_health"]["overall_status"], "unknown");
    assert_eq!(json["feature_sync"]["total_features"], 0);
    assert_eq!(json["current_version"]["version"], "Unknown");
}

#[tokio::test]
async fn test_sync_features_truncates_issues() {
    let dir = tempfile::tempdir().unwrap();
    let (app, config) = setup_router(&dir);
    let token = admin_token(&config);

    let response = app
        .oneshot(request("POST", "/sync-features", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["total_features"], 7);
    assert_eq!(json["issues"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_create_version_flow() {
    let dir = tempfile::tempdir().unwrap();
    let (app, config) = setup_router(&dir);
    let token = admin_token(&config);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/create-version",
            Some(&token),
            Some(json!({"version_number": "1.0.0", "release_notes": "First release"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["build_number"], 1);
    assert_eq!(json["is_current"], true);

    let duplicate = app
        .clone()
        .oneshot(request(
            "POST",
            "/create-version",
            Some(&token),
            Some(json!({"version_number": "1.0.0"})),
        ))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let missing = app
        .clone()
        .oneshot(request("POST", "/create-version", Some(&token), Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let report = app
        .oneshot(request("GET", "/version-report", Some(&token), None))
        .await
        .unwrap();
    let json = json_body(report).await;
    assert_eq!(json["current_version"]["version_number"], "1.0.0");
}

#[tokio::test]
async fn test_setup_tests_then_export_csv() {
    let dir = tempfile::tempdir().unwrap();
    let (app, config) = setup_router(&dir);
    let token = admin_token(&config);

    let setup = app
        .clone()
        .oneshot(request("POST", "/setup-tests", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(json_body(setup).await["count"], 9);

    let response = app
        .oneshot(request("GET", "/export?type=api_tests&format=csv", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"api_tests_report.csv\""
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 10);
}

#[tokio::test]
async fn test_export_rejects_unknown_kind() {
    let dir = tempfile::tempdir().unwrap();
    let (app, config) = setup_router(&dir);
    let token = admin_token(&config);

    let response = app
        .oneshot(request("GET", "/export?type=everything", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_check_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let (app, config) = setup_router(&dir);
    let token = admin_token(&config);

    let check = app
        .clone()
        .oneshot(request("POST", "/health-check", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(check.status(), StatusCode::OK);
    let snapshot = json_body(check).await;
    assert_eq!(snapshot["overall_status"], "warning");

    let history = app
        .oneshot(request("GET", "/health-history?limit=5", Some(&token), None))
        .await
        .unwrap();
    let json = json_body(history).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["check_id"], snapshot["check_id"]);
}
