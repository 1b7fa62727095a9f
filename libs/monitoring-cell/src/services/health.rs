// =====================================================================================
// HEALTH AGGREGATOR
// =====================================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::error::MonitoringError;
use crate::models::{
    ApiCallMetrics, ApiHealth, ComponentStatuses, HealthScore, HealthSnapshot, HealthStatus,
    UsageMetrics,
};
use crate::services::collaborators::ComponentCheck;

const FAILED_CALL_RATIO_LIMIT: f64 = 0.10;
const SLOW_RESPONSE_LIMIT_MS: f64 = 1000.0;

/// Score component statuses plus, when any call was made, the API success
/// rate. Returns the mean on a 0-100 scale and its label.
pub fn calculate_health_score(
    components: &ComponentStatuses,
    total_calls: u64,
    failed_calls: u64,
) -> HealthScore {
    let mut scores: Vec<f64> = components.as_array().iter().map(HealthStatus::score).collect();

    if total_calls > 0 {
        let succeeded = total_calls.saturating_sub(failed_calls);
        scores.push(succeeded as f64 * 100.0 / total_calls as f64);
    }

    let score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    HealthScore { score, status: status_for_score(score) }
}

pub fn status_for_score(score: f64) -> HealthStatus {
    if score >= 90.0 {
        HealthStatus::Healthy
    } else if score >= 70.0 {
        HealthStatus::Warning
    } else if score >= 30.0 {
        HealthStatus::Critical
    } else {
        HealthStatus::Unknown
    }
}

/// Advice for whatever is not healthy in `snapshot`, in a fixed order.
pub fn recommendations(snapshot: &HealthSnapshot) -> Vec<String> {
    let mut advice = Vec::new();

    let components = [
        ("Database", snapshot.database_status, "check Supabase availability and credentials"),
        ("Cache", snapshot.cache_status, "verify the Redis server is reachable"),
        ("Reminder worker", snapshot.worker_status, "restart the reminder workers and check their heartbeats"),
        ("API", snapshot.api_status, "review failing endpoint tests"),
    ];
    for (name, status, action) in components {
        if status != HealthStatus::Healthy {
            advice.push(format!("{} status is {}: {}", name, status, action));
        }
    }

    if snapshot.total_api_calls_24h > 0 {
        let ratio = snapshot.failed_api_calls_24h as f64 / snapshot.total_api_calls_24h as f64;
        if ratio > FAILED_CALL_RATIO_LIMIT {
            advice.push(format!(
                "{:.1}% of API calls failed in the last 24h: investigate error logs",
                ratio * 100.0
            ));
        }
    }

    if let Some(average) = snapshot.average_response_time_ms {
        if average > SLOW_RESPONSE_LIMIT_MS {
            advice.push(format!(
                "Average response time is {:.0}ms: review slow endpoints and database queries",
                average
            ));
        }
    }

    advice
}

pub struct HealthAggregator {
    database: Arc<dyn ComponentCheck>,
    cache: Arc<dyn ComponentCheck>,
    worker: Arc<dyn ComponentCheck>,
    timeout: Duration,
}

impl HealthAggregator {
    pub fn new(
        database: Arc<dyn ComponentCheck>,
        cache: Arc<dyn ComponentCheck>,
        worker: Arc<dyn ComponentCheck>,
        timeout: Duration,
    ) -> Self {
        Self { database, cache, worker, timeout }
    }

    /// Runs one check. Errors and timeouts are critical.
    async fn check_component(&self, check: &dyn ComponentCheck) -> HealthStatus {
        let start = Instant::now();

        let status = match tokio::time::timeout(self.timeout, check.check()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                let error = MonitoringError::ComponentCheck(format!("{}: {}", check.name(), e));
                error!("{}", error);
                HealthStatus::Critical
            }
            Err(_) => {
                warn!(
                    "{}",
                    MonitoringError::ComponentCheck(format!(
                        "{} timed out after {}ms",
                        check.name(),
                        self.timeout.as_millis()
                    ))
                );
                HealthStatus::Critical
            }
        };

        debug!("Component {} is {} ({:?})", check.name(), status, start.elapsed());
        status
    }

    /// Database, cache and worker checks, run concurrently. The API status
    /// comes from the endpoint registry.
    #[instrument(skip(self, api))]
    pub async fn check_components(&self, api: &ApiHealth) -> ComponentStatuses {
        let (database, cache, worker) = tokio::join!(
            self.check_component(self.database.as_ref()),
            self.check_component(self.cache.as_ref()),
            self.check_component(self.worker.as_ref()),
        );

        ComponentStatuses { database, cache, worker, api: api.status }
    }

    pub fn build_snapshot(
        &self,
        components: ComponentStatuses,
        api: &ApiHealth,
        usage: UsageMetrics,
        calls: ApiCallMetrics,
    ) -> HealthSnapshot {
        let score = calculate_health_score(
            &components,
            calls.total_api_calls_24h,
            calls.failed_api_calls_24h,
        );

        let mut snapshot = HealthSnapshot {
            check_id: Uuid::new_v4(),
            database_status: components.database,
            cache_status: components.cache,
            worker_status: components.worker,
            api_status: components.api,
            total_users: usage.total_users,
            active_users_24h: usage.active_users_24h,
            total_medications: usage.total_medications,
            schedules_today: usage.schedules_today,
            total_api_calls_24h: calls.total_api_calls_24h,
            failed_api_calls_24h: calls.failed_api_calls_24h,
            average_response_time_ms: calls.average_response_time_ms,
            overall_status: score.status,
            health_score: score.score,
            detailed_report: json!({
                "components": components,
                "api_health": api,
                "metrics": usage,
                "api_calls": calls,
                "component_timeout_ms": self.timeout.as_millis() as u64,
            }),
            recommendations: Vec::new(),
            created_at: Utc::now(),
        };
        snapshot.recommendations = recommendations(&snapshot);

        snapshot
    }
}
