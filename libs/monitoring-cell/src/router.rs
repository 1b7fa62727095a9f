// =====================================================================================
// MONITORING CELL ROUTER
// =====================================================================================

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers::{
    cancel_tests, create_version, export_report, get_alerts, get_dashboard, get_feature_report,
    get_health_history, get_version_report, run_health_check, run_tests, setup_tests,
    sync_features, MonitoringHandlers,
};
use shared_utils::extractor::admin_middleware;

/// Every monitoring route requires an administrator token.
pub fn create_monitoring_router(handlers: Arc<MonitoringHandlers>) -> Router {
    let config = handlers.config();

    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/sync-features", post(sync_features))
        .route("/feature-report", get(get_feature_report))
        .route("/run-tests", post(run_tests))
        .route("/run-tests/cancel", post(cancel_tests))
        .route("/setup-tests", post(setup_tests))
        .route("/health-check", post(run_health_check))
        .route("/health-history", get(get_health_history))
        .route("/version-report", get(get_version_report))
        .route("/create-version", post(create_version))
        .route("/export", get(export_report))
        .route("/alerts", get(get_alerts))
        .layer(middleware::from_fn_with_state(config, admin_middleware))
        .layer(CorsLayer::permissive())
        .with_state(handlers)
}
