#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use monitoring_cell::error::MonitoringError;
use monitoring_cell::models::{HealthStatus, UsageMetrics};
use monitoring_cell::services::collaborators::{
    AppRegistry, AuthTokenProvider, Collaborators, ComponentCheck, ConfiguredAppRegistry,
    LocalFrontendFs, MetricsSource,
};
use monitoring_cell::services::{EndpointProbe, InMemoryStore, MonitoringReportService, MonitoringStore};
use shared_config::AppConfig;
use shared_utils::test_utils::TestConfig;

pub const TEST_TOKEN: &str = "probe-token";

pub struct StaticToken(pub &'static str);

#[async_trait]
impl AuthTokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, MonitoringError> {
        Ok(self.0.to_string())
    }
}

pub struct FailingToken;

#[async_trait]
impl AuthTokenProvider for FailingToken {
    async fn bearer_token(&self) -> Result<String, MonitoringError> {
        Err(MonitoringError::Unauthorized("service account disabled".to_string()))
    }
}

pub enum CheckBehavior {
    Status(HealthStatus),
    Fail,
    Hang,
}

pub struct FakeCheck {
    name: &'static str,
    behavior: CheckBehavior,
    pub calls: AtomicUsize,
}

impl FakeCheck {
    pub fn new(name: &'static str, behavior: CheckBehavior) -> Arc<Self> {
        Arc::new(Self { name, behavior, calls: AtomicUsize::new(0) })
    }

    pub fn healthy(name: &'static str) -> Arc<Self> {
        Self::new(name, CheckBehavior::Status(HealthStatus::Healthy))
    }
}

#[async_trait]
impl ComponentCheck for FakeCheck {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn check(&self) -> Result<HealthStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            CheckBehavior::Status(status) => Ok(status),
            CheckBehavior::Fail => Err(anyhow!("{} unreachable", self.name)),
            CheckBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(HealthStatus::Healthy)
            }
        }
    }
}

pub struct FakeMetrics(pub Option<UsageMetrics>);

#[async_trait]
impl MetricsSource for FakeMetrics {
    async fn collect(&self) -> Result<UsageMetrics> {
        self.0.ok_or_else(|| anyhow!("metrics backend down"))
    }
}

pub struct BrokenAppRegistry;

impl AppRegistry for BrokenAppRegistry {
    fn is_module_installed(&self, _name: &str) -> Result<bool> {
        Err(anyhow!("registry unavailable"))
    }
}

pub fn usage() -> UsageMetrics {
    UsageMetrics {
        total_users: 40,
        active_users_24h: 12,
        total_medications: 95,
        schedules_today: 60,
    }
}

pub fn test_config(api_base_url: &str, frontend_root: &Path) -> Arc<AppConfig> {
    let mut config = TestConfig::default().to_app_config();
    config.api_base_url = api_base_url.to_string();
    config.frontend_project_root = frontend_root.display().to_string();
    config.probe_concurrency = 2;
    Arc::new(config)
}

pub fn collaborators(config: &AppConfig) -> Collaborators {
    Collaborators {
        auth: Arc::new(StaticToken(TEST_TOKEN)),
        apps: Arc::new(ConfiguredAppRegistry::from_config(config)),
        frontend: Arc::new(LocalFrontendFs::new(&config.frontend_project_root)),
        database: FakeCheck::healthy("database"),
        cache: FakeCheck::healthy("cache"),
        worker: FakeCheck::healthy("worker"),
        metrics: Arc::new(FakeMetrics(Some(usage()))),
    }
}

pub fn service_with(
    config: Arc<AppConfig>,
    collaborators: Collaborators,
) -> (MonitoringReportService, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let probe = EndpointProbe::with_timeout(
        &config.api_base_url,
        collaborators.auth.clone(),
        config.probe_concurrency,
        Duration::from_millis(500),
    );
    let service = MonitoringReportService::with_probe(
        config,
        store.clone() as Arc<dyn MonitoringStore>,
        collaborators,
        probe,
    );
    (service, store)
}

/// Frontend project directory inside a scratch dir, named like the real one.
pub fn frontend_root(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let root = dir.path().join("MedicationReminderRN");
    std::fs::create_dir_all(&root).unwrap();
    root
}

/// Creates `files` (relative to `root`) with placeholder contents.
pub fn touch_files(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "export {};\n").unwrap();
    }
}

pub const ALL_FRONTEND_FILES: &[&str] = &[
    "src/services/StorageService.ts",
    "src/App.tsx",
    "src/screens/AddMedicationScreen.tsx",
    "src/hooks/useMedications.ts",
    "src/screens/TodayScreen.tsx",
    "src/services/NotificationService.ts",
];
