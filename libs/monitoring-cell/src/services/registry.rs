// =====================================================================================
// ENDPOINT TEST REGISTRY
// =====================================================================================

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument};

use crate::error::MonitoringError;
use crate::models::{
    ApiCallMetrics, ApiHealth, ApiTestSummary, EndpointTest, HealthStatus, HttpMethod, ProbeResult,
};
use crate::services::store::MonitoringStore;

/// The synthetic probes every deployment starts with.
pub fn default_endpoint_tests() -> Vec<EndpointTest> {
    vec![
        EndpointTest::new(HttpMethod::Post, "/api/auth/register/")
            .public()
            .with_payload(json!({
                "email": "newuser@test.com",
                "username": "newuser",
                "password": "testpass123",
                "password_confirm": "testpass123",
            }))
            .expect_status(201)
            .expect_keys(["access", "refresh", "user"]),
        EndpointTest::new(HttpMethod::Post, "/api/auth/login/")
            .public()
            .with_payload(json!({
                "email": "test@medicationreminder.com",
                "password": "testpass123",
            }))
            .expect_keys(["access", "refresh", "user"]),
        EndpointTest::new(HttpMethod::Get, "/api/auth/verify/").expect_keys(["valid", "user"]),
        EndpointTest::new(HttpMethod::Get, "/api/users/me/").expect_keys(["id", "email", "username"]),
        EndpointTest::new(HttpMethod::Get, "/api/medications/").expect_keys(["results"]),
        EndpointTest::new(HttpMethod::Post, "/api/medications/")
            .with_payload(json!({
                "name": "Test Medication",
                "dosage": "500mg",
                "frequency": "twice_daily",
                "times": ["08:00", "20:00"],
                "color": "#3B82F6",
            }))
            .expect_status(201)
            .expect_keys(["id", "name", "dosage"]),
        EndpointTest::new(HttpMethod::Get, "/api/schedules/today/").expect_keys(["schedules"]),
        EndpointTest::new(HttpMethod::Get, "/api/schedules/progress/")
            .expect_keys(["taken", "total", "percentage"]),
        EndpointTest::new(HttpMethod::Get, "/health/").public().expect_keys(["status"]),
    ]
}

/// API status from the share of endpoints whose latest run was healthy.
pub fn classify_api_health(healthy: usize, total: usize) -> HealthStatus {
    if total == 0 {
        return HealthStatus::Unknown;
    }

    let ratio = healthy as f64 / total as f64;
    if ratio >= 0.9 {
        HealthStatus::Healthy
    } else if ratio >= 0.7 {
        HealthStatus::Warning
    } else {
        HealthStatus::Critical
    }
}

pub struct EndpointTestRegistry {
    store: Arc<dyn MonitoringStore>,
}

impl EndpointTestRegistry {
    pub fn new(store: Arc<dyn MonitoringStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, test), fields(endpoint = %test.key()))]
    pub async fn register(&self, test: EndpointTest) -> Result<EndpointTest, MonitoringError> {
        if !test.path.starts_with('/') {
            return Err(MonitoringError::Validation(format!(
                "Endpoint path must start with '/': {}",
                test.path
            )));
        }
        self.store.upsert_endpoint_test(test).await
    }

    #[instrument(skip(self))]
    pub async fn setup_default_tests(&self) -> Result<usize, MonitoringError> {
        let defaults = default_endpoint_tests();
        let count = defaults.len();

        for test in defaults {
            self.register(test).await?;
        }

        info!("Setup {} default API tests", count);
        Ok(count)
    }

    pub async fn list(&self) -> Result<Vec<EndpointTest>, MonitoringError> {
        self.store.list_endpoint_tests().await
    }

    pub async fn record_result(&self, result: &ProbeResult) -> Result<EndpointTest, MonitoringError> {
        self.store.record_probe_result(result).await
    }

    pub async fn api_health(&self) -> Result<ApiHealth, MonitoringError> {
        let tests = self.list().await?;
        let total = tests.len();
        let healthy = tests.iter().filter(|t| t.is_healthy).count();

        Ok(ApiHealth {
            status: classify_api_health(healthy, total),
            healthy,
            total,
            ratio: (total > 0).then(|| healthy as f64 / total as f64),
        })
    }

    /// Call totals accumulated by the probes.
    pub async fn api_call_metrics(&self) -> Result<ApiCallMetrics, MonitoringError> {
        let tests = self.list().await?;
        Ok(aggregate_call_metrics(&tests))
    }

    pub async fn summary(&self) -> Result<ApiTestSummary, MonitoringError> {
        let tests = self.list().await?;
        let metrics = aggregate_call_metrics(&tests);

        Ok(ApiTestSummary {
            total_tests: tests.len(),
            healthy_endpoints: tests.iter().filter(|t| t.is_healthy).count(),
            average_response_time_ms: metrics.average_response_time_ms.unwrap_or(0.0),
        })
    }
}

fn aggregate_call_metrics(tests: &[EndpointTest]) -> ApiCallMetrics {
    let averages: Vec<f64> = tests.iter().filter_map(|t| t.average_response_time_ms).collect();
    let average_response_time_ms = if averages.is_empty() {
        None
    } else {
        Some(averages.iter().sum::<f64>() / averages.len() as f64)
    };

    ApiCallMetrics {
        total_api_calls_24h: tests.iter().map(|t| t.total_runs).sum(),
        failed_api_calls_24h: tests.iter().map(|t| t.failed_runs + t.error_runs).sum(),
        average_response_time_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeStatus;
    use crate::services::store::InMemoryStore;
    use chrono::Utc;

    fn registry() -> EndpointTestRegistry {
        EndpointTestRegistry::new(Arc::new(InMemoryStore::new()))
    }

    fn probe_result(method: HttpMethod, path: &str, status: ProbeStatus, ms: f64) -> ProbeResult {
        ProbeResult {
            method,
            endpoint: path.to_string(),
            status,
            response_time_ms: ms,
            status_code: Some(200),
            expected_status: 200,
            error: None,
            tested_at: Utc::now(),
        }
    }

    #[test]
    fn test_classify_api_health_bands() {
        assert_eq!(classify_api_health(0, 0), HealthStatus::Unknown);
        assert_eq!(classify_api_health(9, 10), HealthStatus::Healthy);
        assert_eq!(classify_api_health(7, 10), HealthStatus::Warning);
        assert_eq!(classify_api_health(6, 10), HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_setup_default_tests_is_idempotent() {
        let registry = registry();
        assert_eq!(registry.setup_default_tests().await.unwrap(), 9);

        registry
            .record_result(&probe_result(HttpMethod::Get, "/health/", ProbeStatus::Passed, 12.0))
            .await
            .unwrap();
        registry.setup_default_tests().await.unwrap();

        let tests = registry.list().await.unwrap();
        assert_eq!(tests.len(), 9);
        let health = tests.iter().find(|t| t.path == "/health/").unwrap();
        assert_eq!(health.total_runs, 1);
        assert!(!health.requires_auth);
    }

    #[tokio::test]
    async fn test_register_rejects_relative_path() {
        let result = registry().register(EndpointTest::new(HttpMethod::Get, "health")).await;
        assert!(matches!(result, Err(MonitoringError::Validation(_))));
    }

    #[tokio::test]
    async fn test_api_call_metrics_aggregate_counters() {
        let registry = registry();
        registry.register(EndpointTest::new(HttpMethod::Get, "/a/")).await.unwrap();
        registry.register(EndpointTest::new(HttpMethod::Get, "/b/")).await.unwrap();
        registry.register(EndpointTest::new(HttpMethod::Get, "/c/")).await.unwrap();

        for (path, status, ms) in [
            ("/a/", ProbeStatus::Passed, 100.0),
            ("/a/", ProbeStatus::Failed, 300.0),
            ("/b/", ProbeStatus::Error, 50.0),
        ] {
            registry
                .record_result(&probe_result(HttpMethod::Get, path, status, ms))
                .await
                .unwrap();
        }

        let metrics = registry.api_call_metrics().await.unwrap();
        assert_eq!(metrics.total_api_calls_24h, 3);
        assert_eq!(metrics.failed_api_calls_24h, 2);
        assert_eq!(metrics.average_response_time_ms, Some(125.0));

        // "/c/" has never run and still counts as healthy
        let health = registry.api_health().await.unwrap();
        assert_eq!(health.healthy, 1);
        assert_eq!(health.status, HealthStatus::Critical);
    }
}
