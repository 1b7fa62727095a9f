use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use serde_json::{json, Value};

use monitoring_cell::{create_monitoring_router, MonitoringHandlers};

pub fn create_router(handlers: Arc<MonitoringHandlers>) -> Router {
    Router::new()
        .route("/", get(|| async { "Medication Reminder API is running!" }))
        .route("/health/", get(health))
        .nest("/monitoring", create_monitoring_router(handlers))
}

/// Liveness probe, also the target of the `/health/` endpoint test.
async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use monitoring_cell::MonitoringReportService;
    use monitoring_cell::services::collaborators::Collaborators;
    use monitoring_cell::services::InMemoryStore;
    use shared_config::AppConfig;
    use tower::ServiceExt;

    fn test_config() -> Arc<AppConfig> {
        let mut config = AppConfig::from_env();
        config.supabase_jwt_secret = "router-test-secret".to_string();
        config.redis_url = None;
        config.monitoring_state_path = None;
        Arc::new(config)
    }

    fn app() -> Router {
        let config = test_config();
        let service = MonitoringReportService::from_parts(
            config.clone(),
            Arc::new(InMemoryStore::new()),
            Collaborators::from_config(&config),
        );
        create_router(Arc::new(MonitoringHandlers::with_service(config, Arc::new(service))))
    }

    #[tokio::test]
    async fn test_public_health_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/health/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn test_monitoring_is_nested_and_protected() {
        let response = app()
            .oneshot(Request::builder().uri("/monitoring/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
