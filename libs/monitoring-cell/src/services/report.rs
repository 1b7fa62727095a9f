// =====================================================================================
// MONITORING REPORT SERVICE
// =====================================================================================
//
// Orchestrates feature sync, API tests and health checks, persists their
// results and builds the dashboard, version report, alerts and exports.
//
// =====================================================================================

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use shared_config::AppConfig;

use crate::error::MonitoringError;
use crate::models::{
    Alert, AlertKind, ApiTestReport, CurrentVersionInfo, Dashboard, DashboardHealth,
    DashboardVersion, ExportFormat, ExportKind, ExportOutcome, FeatureSyncOverview,
    FeatureSyncReport, HealthSnapshot, HealthStatus, NewSystemVersion, Priority, SystemInfo,
    SystemVersion, TestStatus, UsageMetrics, VersionReport, VersionSummary,
};
use crate::services::collaborators::{Collaborators, MetricsSource};
use crate::services::export;
use crate::services::features::{summarize, FeatureSyncChecker};
use crate::services::health::HealthAggregator;
use crate::services::probe::EndpointProbe;
use crate::services::registry::EndpointTestRegistry;
use crate::services::store::{InMemoryStore, MonitoringStore};

pub const HEALTH_HISTORY_EXPORT_LIMIT: usize = 100;
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
const VERSION_HISTORY_LIMIT: usize = 5;
const DATABASE_ENGINE: &str = "postgresql (supabase)";

pub struct MonitoringReportService {
    config: Arc<AppConfig>,
    store: Arc<dyn MonitoringStore>,
    registry: EndpointTestRegistry,
    probe: EndpointProbe,
    features: FeatureSyncChecker,
    health: HealthAggregator,
    metrics: Arc<dyn MetricsSource>,
    runs: Mutex<CancellationToken>,
}

impl MonitoringReportService {
    /// Wires the default collaborators, loading persisted state when
    /// `monitoring_state_path` is set.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, MonitoringError> {
        let store: Arc<dyn MonitoringStore> = match &config.monitoring_state_path {
            Some(path) => Arc::new(InMemoryStore::persistent(path).await?),
            None => Arc::new(InMemoryStore::new()),
        };
        let collaborators = Collaborators::from_config(&config);

        Ok(Self::from_parts(config, store, collaborators))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn MonitoringStore>,
        collaborators: Collaborators,
    ) -> Self {
        let probe = EndpointProbe::new(&config, collaborators.auth.clone());
        Self::with_probe(config, store, collaborators, probe)
    }

    pub fn with_probe(
        config: Arc<AppConfig>,
        store: Arc<dyn MonitoringStore>,
        collaborators: Collaborators,
        probe: EndpointProbe,
    ) -> Self {
        let registry = EndpointTestRegistry::new(store.clone());
        let features = FeatureSyncChecker::new(
            collaborators.frontend.clone(),
            collaborators.apps.clone(),
            store.clone(),
        );
        let health = HealthAggregator::new(
            collaborators.database.clone(),
            collaborators.cache.clone(),
            collaborators.worker.clone(),
            Duration::from_millis(config.component_timeout_ms),
        );

        Self {
            config,
            store,
            registry,
            probe,
            features,
            health,
            metrics: collaborators.metrics,
            runs: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn registry(&self) -> &EndpointTestRegistry {
        &self.registry
    }

    pub fn environment(&self) -> &str {
        &self.config.environment
    }

    // =================================================================================
    // FEATURE SYNC
    // =================================================================================

    pub async fn sync_features(&self) -> Result<FeatureSyncReport, MonitoringError> {
        self.features.sync_all().await
    }

    pub async fn feature_report(&self) -> Result<FeatureSyncOverview, MonitoringError> {
        self.features.sync_report().await
    }

    // =================================================================================
    // API TESTS
    // =================================================================================

    pub async fn setup_default_tests(&self) -> Result<usize, MonitoringError> {
        self.registry.setup_default_tests().await
    }

    /// Runs every registered probe. The run stops starting new probes when
    /// either `cancel` fires or `cancel_api_tests` is called.
    pub async fn run_api_tests(&self, cancel: &CancellationToken) -> Result<ApiTestReport, MonitoringError> {
        let run = self.active_runs().child_token();
        if cancel.is_cancelled() {
            run.cancel();
        }
        let relay = {
            let run = run.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => run.cancel(),
                    _ = run.cancelled() => {}
                }
            })
        };

        let report = self.probe.run_all(&self.registry, &run).await;
        relay.abort();

        report
    }

    fn active_runs(&self) -> CancellationToken {
        self.runs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Cancels the API test runs in progress. Later runs are unaffected.
    pub fn cancel_api_tests(&self) {
        warn!("Cancelling API test runs");
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        runs.cancel();
        *runs = CancellationToken::new();
    }

    // =================================================================================
    // HEALTH
    // =================================================================================

    #[instrument(skip(self))]
    pub async fn perform_health_check(&self) -> Result<HealthSnapshot, MonitoringError> {
        let api = self.registry.api_health().await?;
        let calls = self.registry.api_call_metrics().await?;

        let (components, usage) = tokio::join!(
            self.health.check_components(&api),
            self.collect_usage(),
        );

        let snapshot = self.health.build_snapshot(components, &api, usage, calls);
        self.store.insert_health_snapshot(snapshot.clone()).await?;

        info!(
            "Health check completed: {} ({:.1})",
            snapshot.overall_status, snapshot.health_score
        );
        Ok(snapshot)
    }

    async fn collect_usage(&self) -> UsageMetrics {
        match self.metrics.collect().await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("Usage metrics unavailable, reporting zeros: {}", e);
                UsageMetrics::default()
            }
        }
    }

    pub async fn health_history(&self, limit: usize) -> Result<Vec<HealthSnapshot>, MonitoringError> {
        self.store.recent_health_snapshots(limit).await
    }

    /// Drops snapshots older than `retention_days`, returning how many.
    #[instrument(skip(self))]
    pub async fn cleanup_health_history(&self, retention_days: i64) -> Result<usize, MonitoringError> {
        if retention_days < 0 {
            return Err(MonitoringError::Validation(
                "Retention days must not be negative".to_string(),
            ));
        }

        let cutoff = Utc::now() - ChronoDuration::days(retention_days);
        let removed = self.store.delete_health_snapshots_before(cutoff).await?;
        info!("Cleaned up {} health checks older than {} days", removed, retention_days);
        Ok(removed)
    }

    // =================================================================================
    // VERSIONS
    // =================================================================================

    pub async fn generate_version_report(&self) -> Result<VersionReport, MonitoringError> {
        let environment = self.environment().to_string();
        let current = self.store.current_version(&environment).await?;
        let frontend_version = self.features.frontend_version().await;
        let feature_sync = summarize(&self.store.list_features().await?);
        let last_versions = self
            .store
            .recent_versions(VERSION_HISTORY_LIMIT)
            .await?
            .iter()
            .map(VersionSummary::from)
            .collect();

        let current_version = match current {
            Some(version) => CurrentVersionInfo {
                version_number: version.version_number,
                build_number: version.build_number,
                backend_version: version.backend_version,
                frontend_version,
                release_date: Some(version.release_date),
            },
            None => CurrentVersionInfo {
                version_number: "Unknown".to_string(),
                build_number: 0,
                backend_version: env!("CARGO_PKG_VERSION").to_string(),
                frontend_version,
                release_date: None,
            },
        };

        Ok(VersionReport {
            generated_at: Utc::now(),
            current_version,
            system_info: SystemInfo {
                service_version: env!("CARGO_PKG_VERSION").to_string(),
                environment,
                debug_mode: cfg!(debug_assertions),
                database: DATABASE_ENGINE.to_string(),
                os: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
                installed_modules: self.config.installed_modules.clone(),
            },
            feature_sync,
            last_versions,
        })
    }

    pub async fn create_version(
        &self,
        version_number: &str,
        release_notes: &str,
    ) -> Result<SystemVersion, MonitoringError> {
        let environment = self.environment().to_string();
        self.create_version_in(&environment, version_number, release_notes).await
    }

    #[instrument(skip(self, release_notes))]
    pub async fn create_version_in(
        &self,
        environment: &str,
        version_number: &str,
        release_notes: &str,
    ) -> Result<SystemVersion, MonitoringError> {
        let version_number = version_number.trim();
        if version_number.is_empty() {
            return Err(MonitoringError::Validation("version_number is required".to_string()));
        }
        if environment.trim().is_empty() {
            return Err(MonitoringError::Validation("environment is required".to_string()));
        }

        let frontend_version = self.features.frontend_version().await;
        let version = self
            .store
            .create_current_version(NewSystemVersion {
                version_number: version_number.to_string(),
                environment: environment.to_string(),
                backend_version: version_number.to_string(),
                frontend_version,
                database_version: DATABASE_ENGINE.to_string(),
                release_notes: release_notes.to_string(),
            })
            .await?;

        info!(
            "Created version {} (build {}) for {}",
            version.version_number, version.build_number, version.environment
        );
        Ok(version)
    }

    // =================================================================================
    // DASHBOARD & ALERTS
    // =================================================================================

    pub async fn dashboard(&self) -> Result<Dashboard, MonitoringError> {
        let latest = self.store.recent_health_snapshots(1).await?.into_iter().next();
        let feature_sync = summarize(&self.store.list_features().await?);
        let api_tests = self.registry.summary().await?;
        let current = self.store.current_version(self.environment()).await?;

        Ok(Dashboard {
            timestamp: Utc::now(),
            system_health: DashboardHealth::from_snapshot(latest.as_ref()),
            feature_sync,
            api_tests,
            current_version: match current {
                Some(version) => DashboardVersion {
                    version: version.version_number,
                    build: version.build_number,
                    release_date: Some(version.release_date),
                },
                None => DashboardVersion {
                    version: "Unknown".to_string(),
                    build: 0,
                    release_date: None,
                },
            },
            quick_stats: latest.as_ref().map(HealthSnapshot::usage).unwrap_or_default(),
        })
    }

    pub async fn critical_alerts(&self) -> Result<Vec<Alert>, MonitoringError> {
        let mut alerts = Vec::new();

        if let Some(latest) = self.store.recent_health_snapshots(1).await?.into_iter().next() {
            if latest.overall_status == HealthStatus::Critical {
                alerts.push(Alert {
                    kind: AlertKind::CriticalHealth,
                    message: format!("System health is critical (score {:.1})", latest.health_score),
                    details: json!({
                        "check_id": latest.check_id,
                        "components": latest.components(),
                        "recommendations": latest.recommendations,
                    }),
                });
            }
        }

        let unsynced: Vec<String> = self
            .store
            .list_features()
            .await?
            .into_iter()
            .filter(|f| f.priority == Priority::Critical && !f.is_synchronized)
            .map(|f| f.feature_name)
            .collect();
        if !unsynced.is_empty() {
            alerts.push(Alert {
                kind: AlertKind::CriticalFeatures,
                message: format!("{} critical features are not synchronized", unsynced.len()),
                details: json!({ "features": unsynced }),
            });
        }

        let failing: Vec<String> = self
            .registry
            .list()
            .await?
            .iter()
            .filter(|t| matches!(t.last_status, TestStatus::Failed | TestStatus::Error))
            .map(|t| t.key().to_string())
            .collect();
        if !failing.is_empty() {
            alerts.push(Alert {
                kind: AlertKind::ApiFailures,
                message: format!("{} API endpoints are failing", failing.len()),
                details: json!({ "endpoints": failing }),
            });
        }

        if !alerts.is_empty() {
            error!("{} critical monitoring alerts raised", alerts.len());
        }
        Ok(alerts)
    }

    // =================================================================================
    // EXPORTS
    // =================================================================================

    /// Renders a report into memory.
    pub async fn render_export(
        &self,
        kind: ExportKind,
        format: ExportFormat,
    ) -> Result<Vec<u8>, MonitoringError> {
        match (kind, format) {
            (ExportKind::Features, ExportFormat::Csv) => {
                export::features_csv(&self.store.list_features().await?)
            }
            (ExportKind::Features, ExportFormat::Json) => export::to_json(&self.feature_report().await?),
            (ExportKind::ApiTests, ExportFormat::Csv) => export::api_tests_csv(&self.registry.list().await?),
            (ExportKind::ApiTests, ExportFormat::Json) => export::to_json(&self.registry.list().await?),
            (ExportKind::HealthHistory, ExportFormat::Csv) => {
                export::health_history_csv(&self.health_history(HEALTH_HISTORY_EXPORT_LIMIT).await?)
            }
            (ExportKind::HealthHistory, ExportFormat::Json) => {
                export::to_json(&self.health_history(HEALTH_HISTORY_EXPORT_LIMIT).await?)
            }
            (ExportKind::Dashboard, ExportFormat::Csv) => export::dashboard_csv(&self.dashboard().await?),
            (ExportKind::Dashboard, ExportFormat::Json) => export::to_json(&self.dashboard().await?),
        }
    }

    /// Writes a report to `destination`, which must not exist yet.
    #[instrument(skip(self))]
    pub async fn export_report(
        &self,
        kind: ExportKind,
        format: ExportFormat,
        destination: &Path,
    ) -> Result<ExportOutcome, MonitoringError> {
        let bytes = self.render_export(kind, format).await?;
        let path = destination.to_path_buf();

        let written = tokio::task::spawn_blocking(move || -> std::io::Result<usize> {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            Ok(bytes.len())
        })
        .await
        .map_err(|e| MonitoringError::Export(e.to_string()))?
        .map_err(|e| MonitoringError::Export(format!("{}: {}", destination.display(), e)))?;

        info!("Exported {:?} report to {}", kind, destination.display());
        Ok(ExportOutcome {
            kind,
            format,
            destination: destination.display().to_string(),
            bytes_written: written,
        })
    }
}
