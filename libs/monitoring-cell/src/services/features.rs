// =====================================================================================
// FEATURE REGISTRY & SYNC CHECKER
// =====================================================================================
//
// Each product feature declares the frontend files and backend endpoints it
// needs. A feature is synchronized when every declared file exists in the
// frontend project and every endpoint belongs to an installed backend module.
//
// =====================================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::MonitoringError;
use crate::models::{
    FeatureDescriptor, FeatureSpec, FeatureSyncOverview, FeatureSyncReport, Priority, SyncSummary,
    SyncVerdict,
};
use crate::services::collaborators::{AppRegistry, FrontendFs};
use crate::services::store::MonitoringStore;

pub const UNKNOWN_VERSION: &str = "Unknown";

pub static FEATURE_REGISTRY: &[FeatureSpec] = &[
    FeatureSpec {
        name: "user_authentication",
        description: "User login, register, logout functionality",
        frontend_files: &[
            "MedicationReminderRN/src/services/StorageService.ts",
            "MedicationReminderRN/src/App.tsx",
        ],
        backend_app: "authentication",
        backend_endpoints: &[
            "POST /api/auth/login/",
            "POST /api/auth/register/",
            "POST /api/auth/logout/",
            "GET /api/auth/verify/",
        ],
        priority: Priority::Critical,
    },
    FeatureSpec {
        name: "medication_management",
        description: "CRUD operations for medications",
        frontend_files: &[
            "MedicationReminderRN/src/screens/AddMedicationScreen.tsx",
            "MedicationReminderRN/src/hooks/useMedications.ts",
            "MedicationReminderRN/src/services/StorageService.ts",
        ],
        backend_app: "medications",
        backend_endpoints: &[
            "GET /api/medications/",
            "POST /api/medications/",
            "PUT /api/medications/{id}/",
            "DELETE /api/medications/{id}/",
        ],
        priority: Priority::Critical,
    },
    FeatureSpec {
        name: "daily_schedules",
        description: "Daily medication schedules and progress tracking",
        frontend_files: &[
            "MedicationReminderRN/src/screens/TodayScreen.tsx",
            "MedicationReminderRN/src/services/StorageService.ts",
        ],
        backend_app: "schedules",
        backend_endpoints: &[
            "GET /api/schedules/today/",
            "POST /api/schedules/mark_taken/",
            "GET /api/schedules/progress/",
        ],
        priority: Priority::Critical,
    },
    FeatureSpec {
        name: "push_notifications",
        description: "Push notification system for medication reminders",
        frontend_files: &["MedicationReminderRN/src/services/NotificationService.ts"],
        backend_app: "notifications",
        backend_endpoints: &[
            "GET /api/notifications/",
            "POST /api/notifications/mark_read/",
            "PUT /api/notifications/settings/",
        ],
        priority: Priority::High,
    },
    FeatureSpec {
        name: "user_profile",
        description: "User profile management and preferences",
        frontend_files: &[],
        backend_app: "users",
        backend_endpoints: &[
            "GET /api/users/me/",
            "PUT /api/users/update_me/",
            "GET /api/users/profile/",
            "PUT /api/users/update_profile/",
        ],
        priority: Priority::Medium,
    },
    FeatureSpec {
        name: "analytics_reports",
        description: "Analytics and progress reports",
        frontend_files: &[],
        backend_app: "analytics",
        backend_endpoints: &[
            "GET /api/analytics/stats/",
            "GET /api/analytics/adherence/",
            "GET /api/analytics/progress/",
        ],
        priority: Priority::Medium,
    },
    FeatureSpec {
        name: "offline_sync",
        description: "Offline data synchronization",
        frontend_files: &["MedicationReminderRN/src/services/StorageService.ts"],
        backend_app: "core",
        backend_endpoints: &["POST /api/sync/upload/", "GET /api/sync/download/"],
        priority: Priority::Low,
    },
];

/// Backend module owning an endpoint signature such as
/// `GET /api/medications/{id}/`: the third segment of the path.
pub fn owning_module(signature: &str) -> Option<&str> {
    let (_, path) = signature.trim().split_once(' ')?;
    path.trim()
        .split('/')
        .nth(2)
        .filter(|segment| !segment.is_empty())
}

pub struct FeatureSyncChecker {
    frontend: Arc<dyn FrontendFs>,
    apps: Arc<dyn AppRegistry>,
    store: Arc<dyn MonitoringStore>,
    features: Vec<FeatureSpec>,
}

impl FeatureSyncChecker {
    pub fn new(
        frontend: Arc<dyn FrontendFs>,
        apps: Arc<dyn AppRegistry>,
        store: Arc<dyn MonitoringStore>,
    ) -> Self {
        Self::with_features(frontend, apps, store, FEATURE_REGISTRY.to_vec())
    }

    pub fn with_features(
        frontend: Arc<dyn FrontendFs>,
        apps: Arc<dyn AppRegistry>,
        store: Arc<dyn MonitoringStore>,
        features: Vec<FeatureSpec>,
    ) -> Self {
        Self { frontend, apps, store, features }
    }

    async fn frontend_file_exists(&self, path: &str) -> bool {
        match self.frontend.exists(path).await {
            Ok(exists) => exists,
            Err(e) => {
                let error = MonitoringError::SyncCheck(format!("{}: {}", path, e));
                warn!("{}", error);
                false
            }
        }
    }

    fn backend_endpoint_exists(&self, signature: &str) -> bool {
        let Some(module) = owning_module(signature) else {
            warn!("{}", MonitoringError::SyncCheck(format!("Malformed endpoint signature: {}", signature)));
            return false;
        };

        match self.apps.is_module_installed(module) {
            Ok(installed) => installed,
            Err(e) => {
                warn!("{}", MonitoringError::SyncCheck(format!("{}: {}", signature, e)));
                false
            }
        }
    }

    /// Checks one feature. Lookup failures count the item as missing.
    pub async fn evaluate(&self, feature: &FeatureSpec) -> SyncVerdict {
        let mut issues = Vec::new();

        let mut files_present = 0;
        for file in feature.frontend_files {
            if self.frontend_file_exists(file).await {
                files_present += 1;
            } else {
                issues.push(format!("Frontend file missing: {}", file));
            }
        }
        let files_checked = feature.frontend_files.len();
        let frontend_implemented = files_checked > 0 && files_present == files_checked;

        let mut endpoints_present = 0;
        for endpoint in feature.backend_endpoints {
            if self.backend_endpoint_exists(endpoint) {
                endpoints_present += 1;
            } else {
                issues.push(format!("Backend endpoint missing: {}", endpoint));
            }
        }
        let endpoints_checked = feature.backend_endpoints.len();
        let backend_implemented = endpoints_checked > 0 && endpoints_present == endpoints_checked;

        SyncVerdict {
            feature_name: feature.name.to_string(),
            frontend_implemented,
            backend_implemented,
            is_synchronized: frontend_implemented && backend_implemented,
            issues,
            frontend_files_checked: files_checked,
            backend_endpoints_checked: endpoints_checked,
        }
    }

    /// Evaluates every feature and upserts its descriptor. Descriptors are
    /// never removed, even when a feature leaves the table.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> Result<FeatureSyncReport, MonitoringError> {
        let mut report = FeatureSyncReport {
            timestamp: Utc::now(),
            total_features: self.features.len(),
            synchronized: 0,
            unsynchronized: 0,
            issues: Vec::new(),
            details: BTreeMap::new(),
        };

        for feature in &self.features {
            let verdict = self.evaluate(feature).await;

            let mut descriptor = match self.store.get_feature(feature.name).await? {
                Some(existing) => existing,
                None => FeatureDescriptor::from_spec(feature),
            };
            descriptor.frontend_files = feature.frontend_files.iter().map(|f| f.to_string()).collect();
            descriptor.backend_app = feature.backend_app.to_string();
            descriptor.backend_endpoints = feature.backend_endpoints.iter().map(|e| e.to_string()).collect();
            descriptor.frontend_implemented = verdict.frontend_implemented;
            descriptor.backend_implemented = verdict.backend_implemented;
            descriptor.is_synchronized = verdict.is_synchronized;
            descriptor.sync_issues = verdict.issues.clone();
            descriptor.status = verdict.lifecycle_status();
            descriptor.last_sync_check = Some(Utc::now());
            self.store.save_feature(descriptor).await?;

            if verdict.is_synchronized {
                report.synchronized += 1;
            } else {
                report.unsynchronized += 1;
                report.issues.extend(verdict.issues.iter().cloned());
            }
            report.details.insert(feature.name.to_string(), verdict);
        }

        info!(
            "Feature sync completed: {}/{} synchronized, {} issues",
            report.synchronized,
            report.total_features,
            report.issues.len()
        );

        Ok(report)
    }

    /// Persisted descriptors, critical first.
    pub async fn sync_report(&self) -> Result<FeatureSyncOverview, MonitoringError> {
        let mut features = self.store.list_features().await?;
        features.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.feature_name.cmp(&b.feature_name))
        });

        Ok(FeatureSyncOverview {
            generated_at: Utc::now(),
            summary: summarize(&features),
            features,
        })
    }

    pub async fn frontend_version(&self) -> String {
        let manifest = match self.frontend.read_to_string("package.json").await {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Frontend package.json unavailable: {}", e);
                return UNKNOWN_VERSION.to_string();
            }
        };

        serde_json::from_str::<Value>(&manifest)
            .ok()
            .and_then(|json| json.get("version").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }
}

pub fn summarize(features: &[FeatureDescriptor]) -> SyncSummary {
    let synchronized = features.iter().filter(|f| f.is_synchronized).count();
    SyncSummary {
        total_features: features.len(),
        synchronized,
        unsynchronized: features.len() - synchronized,
        critical_issues: features
            .iter()
            .filter(|f| f.priority == Priority::Critical && !f.is_synchronized)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owning_module_is_third_segment() {
        assert_eq!(owning_module("GET /api/medications/{id}/"), Some("medications"));
        assert_eq!(owning_module("POST /api/sync/upload/"), Some("sync"));
        assert_eq!(owning_module("GET /health/"), None);
        assert_eq!(owning_module("nonsense"), None);
    }

    #[test]
    fn test_registry_table_shape() {
        assert_eq!(FEATURE_REGISTRY.len(), 7);
        let critical: Vec<_> = FEATURE_REGISTRY
            .iter()
            .filter(|f| f.priority == Priority::Critical)
            .map(|f| f.name)
            .collect();
        assert_eq!(critical, vec!["user_authentication", "medication_management", "daily_schedules"]);
        assert!(FEATURE_REGISTRY
            .iter()
            .all(|f| f.backend_endpoints.iter().all(|e| owning_module(e).is_some())));
    }
}
