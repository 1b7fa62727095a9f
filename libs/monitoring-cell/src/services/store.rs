// =====================================================================================
// MONITORING STORE
// =====================================================================================
//
// Persistence boundary for endpoint tests, feature descriptors, health
// snapshots and system versions. Every mutation runs under a single write
// guard: the state is cloned, changed, optionally flushed to disk and only
// then committed, so a failed flush leaves the previous state intact.
//
// =====================================================================================

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::MonitoringError;
use crate::models::{
    EndpointKey, EndpointTest, FeatureDescriptor, HealthSnapshot, HttpMethod, NewSystemVersion,
    ProbeResult, SystemVersion,
};

type StoreResult<T> = Result<T, MonitoringError>;

#[async_trait]
pub trait MonitoringStore: Send + Sync {
    /// Inserts a test or replaces the configuration of an existing one.
    async fn upsert_endpoint_test(&self, test: EndpointTest) -> StoreResult<EndpointTest>;
    async fn list_endpoint_tests(&self) -> StoreResult<Vec<EndpointTest>>;
    async fn record_probe_result(&self, result: &ProbeResult) -> StoreResult<EndpointTest>;

    async fn get_feature(&self, name: &str) -> StoreResult<Option<FeatureDescriptor>>;
    async fn save_feature(&self, feature: FeatureDescriptor) -> StoreResult<()>;
    async fn list_features(&self) -> StoreResult<Vec<FeatureDescriptor>>;

    async fn insert_health_snapshot(&self, snapshot: HealthSnapshot) -> StoreResult<()>;
    /// Newest first.
    async fn recent_health_snapshots(&self, limit: usize) -> StoreResult<Vec<HealthSnapshot>>;
    async fn delete_health_snapshots_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    /// Inserts a version as the current one of its environment with the next
    /// build number, demoting any previous current version.
    async fn create_current_version(&self, version: NewSystemVersion) -> StoreResult<SystemVersion>;
    async fn current_version(&self, environment: &str) -> StoreResult<Option<SystemVersion>>;
    /// Newest first, across environments.
    async fn recent_versions(&self, limit: usize) -> StoreResult<Vec<SystemVersion>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    endpoint_tests: BTreeMap<String, EndpointTest>,
    features: BTreeMap<String, FeatureDescriptor>,
    health_checks: Vec<HealthSnapshot>,
    versions: Vec<SystemVersion>,
}

fn state_key(method: HttpMethod, path: &str) -> String {
    format!("{} {}", path, method)
}

pub struct InMemoryStore {
    state: RwLock<StoreState>,
    path: Option<PathBuf>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            path: None,
        }
    }

    /// Store backed by a JSON file, loaded now when present and rewritten
    /// after every mutation.
    pub async fn persistent(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                info!("Loading monitoring state from {}", path.display());
                serde_json::from_slice(&bytes)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    async fn flush(&self, state: &StoreState) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Flushed monitoring state to {}", path.display());
        Ok(())
    }

    /// Applies `f` to a copy of the state and commits it once flushed.
    async fn mutate<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut StoreState) -> StoreResult<T> + Send,
        T: Send,
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let value = f(&mut next)?;
        self.flush(&next).await?;
        *guard = next;
        Ok(value)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl MonitoringStore for InMemoryStore {
    async fn upsert_endpoint_test(&self, test: EndpointTest) -> StoreResult<EndpointTest> {
        self.mutate(move |state| {
            let key = state_key(test.http_method, &test.path);
            let stored = match state.endpoint_tests.get_mut(&key) {
                Some(existing) => {
                    existing.reconfigure(&test);
                    existing.clone()
                }
                None => {
                    state.endpoint_tests.insert(key, test.clone());
                    test
                }
            };
            Ok(stored)
        })
        .await
    }

    async fn list_endpoint_tests(&self) -> StoreResult<Vec<EndpointTest>> {
        let state = self.state.read().await;
        let mut tests: Vec<EndpointTest> = state.endpoint_tests.values().cloned().collect();
        tests.sort_by_key(EndpointTest::key);
        Ok(tests)
    }

    async fn record_probe_result(&self, result: &ProbeResult) -> StoreResult<EndpointTest> {
        self.mutate(|state| {
            let key = state_key(result.method, &result.endpoint);
            let test = state.endpoint_tests.get_mut(&key).ok_or_else(|| {
                MonitoringError::Persistence(format!(
                    "Unknown endpoint test: {}",
                    EndpointKey::new(result.method, &result.endpoint)
                ))
            })?;
            test.record(result);
            Ok(test.clone())
        })
        .await
    }

    async fn get_feature(&self, name: &str) -> StoreResult<Option<FeatureDescriptor>> {
        Ok(self.state.read().await.features.get(name).cloned())
    }

    async fn save_feature(&self, feature: FeatureDescriptor) -> StoreResult<()> {
        self.mutate(move |state| {
            state.features.insert(feature.feature_name.clone(), feature);
            Ok(())
        })
        .await
    }

    async fn list_features(&self) -> StoreResult<Vec<FeatureDescriptor>> {
        Ok(self.state.read().await.features.values().cloned().collect())
    }

    async fn insert_health_snapshot(&self, snapshot: HealthSnapshot) -> StoreResult<()> {
        self.mutate(move |state| {
            state.health_checks.push(snapshot);
            Ok(())
        })
        .await
    }

    async fn recent_health_snapshots(&self, limit: usize) -> StoreResult<Vec<HealthSnapshot>> {
        let state = self.state.read().await;
        let mut snapshots = state.health_checks.clone();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots.truncate(limit);
        Ok(snapshots)
    }

    async fn delete_health_snapshots_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.mutate(move |state| {
            let before = state.health_checks.len();
            state.health_checks.retain(|s| s.created_at >= cutoff);
            Ok(before - state.health_checks.len())
        })
        .await
    }

    async fn create_current_version(&self, version: NewSystemVersion) -> StoreResult<SystemVersion> {
        self.mutate(move |state| {
            let duplicate = state.versions.iter().any(|v| {
                v.environment == version.environment && v.version_number == version.version_number
            });
            if duplicate {
                return Err(MonitoringError::DuplicateVersion {
                    version_number: version.version_number,
                    environment: version.environment,
                });
            }

            let build_number = state
                .versions
                .iter()
                .filter(|v| v.environment == version.environment)
                .map(|v| v.build_number)
                .max()
                .unwrap_or(0)
                + 1;

            for existing in state.versions.iter_mut() {
                if existing.environment == version.environment {
                    existing.is_current = false;
                }
            }

            let created = SystemVersion {
                id: Uuid::new_v4(),
                version_number: version.version_number,
                environment: version.environment,
                build_number,
                backend_version: version.backend_version,
                frontend_version: version.frontend_version,
                database_version: version.database_version,
                release_date: Utc::now(),
                release_notes: version.release_notes,
                is_current: true,
            };
            state.versions.push(created.clone());
            Ok(created)
        })
        .await
    }

    async fn current_version(&self, environment: &str) -> StoreResult<Option<SystemVersion>> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .find(|v| v.environment == environment && v.is_current)
            .cloned())
    }

    async fn recent_versions(&self, limit: usize) -> StoreResult<Vec<SystemVersion>> {
        let state = self.state.read().await;
        let mut versions = state.versions.clone();
        versions.sort_by(|a, b| {
            b.release_date
                .cmp(&a.release_date)
                .then(b.build_number.cmp(&a.build_number))
        });
        versions.truncate(limit);
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeStatus;

    fn new_version(number: &str, environment: &str) -> NewSystemVersion {
        NewSystemVersion {
            version_number: number.to_string(),
            environment: environment.to_string(),
            backend_version: number.to_string(),
            frontend_version: "1.0.0".to_string(),
            database_version: "postgres".to_string(),
            release_notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_build_numbers_are_per_environment() {
        let store = InMemoryStore::new();
        let a = store.create_current_version(new_version("1.0.0", "production")).await.unwrap();
        let b = store.create_current_version(new_version("1.0.1", "production")).await.unwrap();
        let c = store.create_current_version(new_version("1.0.0", "staging")).await.unwrap();

        assert_eq!((a.build_number, b.build_number, c.build_number), (1, 2, 1));

        let current = store.current_version("production").await.unwrap().unwrap();
        assert_eq!(current.version_number, "1.0.1");
        assert!(store.current_version("staging").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_version_leaves_state_unchanged() {
        let store = InMemoryStore::new();
        store.create_current_version(new_version("2.0.0", "production")).await.unwrap();

        let result = store.create_current_version(new_version("2.0.0", "production")).await;
        assert!(matches!(result, Err(MonitoringError::DuplicateVersion { .. })));
        assert_eq!(store.recent_versions(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_unknown_endpoint_is_persistence_error() {
        let store = InMemoryStore::new();
        let result = ProbeResult {
            method: HttpMethod::Get,
            endpoint: "/missing/".to_string(),
            status: ProbeStatus::Passed,
            response_time_ms: 1.0,
            status_code: Some(200),
            expected_status: 200,
            error: None,
            tested_at: Utc::now(),
        };

        let outcome = store.record_probe_result(&result).await;
        assert!(matches!(outcome, Err(MonitoringError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_persistent_store_reloads_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitoring.json");

        {
            let store = InMemoryStore::persistent(&path).await.unwrap();
            store
                .upsert_endpoint_test(EndpointTest::new(HttpMethod::Get, "/health/").public())
                .await
                .unwrap();
            store.create_current_version(new_version("1.0.0", "test")).await.unwrap();
        }

        let reloaded = InMemoryStore::persistent(&path).await.unwrap();
        let tests = reloaded.list_endpoint_tests().await.unwrap();
        assert_eq!(tests.len(), 1);
        assert!(!tests[0].requires_auth);
        assert!(reloaded.current_version("test").await.unwrap().is_some());
    }
}
