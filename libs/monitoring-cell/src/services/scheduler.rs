// =====================================================================================
// SCHEDULED MONITORING
// =====================================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::services::report::{MonitoringReportService, DEFAULT_RETENTION_DAYS};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub features_synced: bool,
    pub tests_run: bool,
    pub health_checked: bool,
    pub snapshots_removed: usize,
    pub alerts: usize,
}

/// One monitoring pass. Each step is independent; failures are logged and
/// the remaining steps still run.
pub async fn run_cycle(service: &MonitoringReportService, cancel: &CancellationToken) -> CycleOutcome {
    let mut outcome = CycleOutcome::default();

    match service.sync_features().await {
        Ok(report) => {
            outcome.features_synced = true;
            debug!("Scheduled sync: {}/{} features synchronized", report.synchronized, report.total_features);
        }
        Err(e) => error!("Scheduled feature sync failed: {}", e),
    }

    match service.run_api_tests(cancel).await {
        Ok(report) => {
            outcome.tests_run = !report.cancelled;
            debug!("Scheduled API tests: {} passed of {}", report.passed, report.total_tests);
        }
        Err(e) => error!("Scheduled API tests failed: {}", e),
    }

    match service.perform_health_check().await {
        Ok(_) => outcome.health_checked = true,
        Err(e) => error!("Scheduled health check failed: {}", e),
    }

    match service.cleanup_health_history(DEFAULT_RETENTION_DAYS).await {
        Ok(removed) => outcome.snapshots_removed = removed,
        Err(e) => error!("Health history cleanup failed: {}", e),
    }

    match service.critical_alerts().await {
        Ok(alerts) => {
            for alert in &alerts {
                warn!("Monitoring alert: {}", alert.message);
            }
            outcome.alerts = alerts.len();
        }
        Err(e) => error!("Failed to evaluate alerts: {}", e),
    }

    outcome
}

/// Runs `run_cycle` every `period` until `cancel` fires.
pub fn spawn_monitoring_loop(
    service: Arc<MonitoringReportService>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Scheduled monitoring every {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = run_cycle(&service, &cancel).await;
                    debug!("Monitoring cycle finished: {:?}", outcome);
                }
                _ = cancel.cancelled() => {
                    debug!("Scheduled monitoring shutting down");
                    break;
                }
            }
        }
    })
}
