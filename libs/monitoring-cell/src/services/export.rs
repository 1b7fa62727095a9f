// =====================================================================================
// REPORT EXPORTS
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::MonitoringError;
use crate::models::{Dashboard, EndpointTest, FeatureDescriptor, HealthSnapshot};

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn csv_error(error: impl std::fmt::Display) -> MonitoringError {
    MonitoringError::Export(error.to_string())
}

struct CsvTable {
    writer: csv::Writer<Vec<u8>>,
}

impl CsvTable {
    fn new(headers: &[&str]) -> Result<Self, MonitoringError> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(headers).map_err(csv_error)?;
        Ok(Self { writer })
    }

    fn row<I, S>(&mut self, values: I) -> Result<(), MonitoringError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.writer.write_record(values).map_err(csv_error)
    }

    fn finish(self) -> Result<Vec<u8>, MonitoringError> {
        self.writer.into_inner().map_err(csv_error)
    }
}

pub fn features_csv(features: &[FeatureDescriptor]) -> Result<Vec<u8>, MonitoringError> {
    let mut table = CsvTable::new(&[
        "Feature Name",
        "Description",
        "Priority",
        "Status",
        "Frontend Implemented",
        "Backend Implemented",
        "Synchronized",
        "Last Check",
        "Issues",
    ])?;

    for feature in features {
        table.row([
            feature.feature_name.clone(),
            feature.description.clone(),
            feature.priority.as_str().to_string(),
            feature.status.as_str().to_string(),
            yes_no(feature.frontend_implemented).to_string(),
            yes_no(feature.backend_implemented).to_string(),
            yes_no(feature.is_synchronized).to_string(),
            timestamp(feature.last_sync_check),
            feature.sync_issues.join("; "),
        ])?;
    }

    table.finish()
}

pub fn api_tests_csv(tests: &[EndpointTest]) -> Result<Vec<u8>, MonitoringError> {
    let mut table = CsvTable::new(&[
        "Endpoint",
        "Method",
        "Last Status",
        "Response Time (ms)",
        "Success Rate (%)",
        "Total Tests",
        "Passed",
        "Failed",
        "Errors",
        "Is Healthy",
        "Last Test Date",
    ])?;

    for test in tests {
        table.row([
            test.path.clone(),
            test.http_method.to_string(),
            test.last_status.as_str().to_string(),
            format!("{:.2}", test.last_response_time_ms.unwrap_or(0.0)),
            format!("{:.2}", test.success_rate()),
            test.total_runs.to_string(),
            test.passed_runs.to_string(),
            test.failed_runs.to_string(),
            test.error_runs.to_string(),
            yes_no(test.is_healthy).to_string(),
            timestamp(test.last_tested_at),
        ])?;
    }

    table.finish()
}

pub fn health_history_csv(snapshots: &[HealthSnapshot]) -> Result<Vec<u8>, MonitoringError> {
    let mut table = CsvTable::new(&[
        "Check Date",
        "Overall Status",
        "Health Score",
        "Database Status",
        "Cache Status",
        "Worker Status",
        "API Status",
        "Total Users",
        "Active Users 24h",
        "Total Medications",
    ])?;

    for check in snapshots {
        table.row([
            check.created_at.to_rfc3339(),
            check.overall_status.to_string(),
            format!("{:.1}", check.health_score),
            check.database_status.to_string(),
            check.cache_status.to_string(),
            check.worker_status.to_string(),
            check.api_status.to_string(),
            check.total_users.to_string(),
            check.active_users_24h.to_string(),
            check.total_medications.to_string(),
        ])?;
    }

    table.finish()
}

/// Two-column Metric/Value table.
pub fn dashboard_csv(dashboard: &Dashboard) -> Result<Vec<u8>, MonitoringError> {
    let mut table = CsvTable::new(&["Metric", "Value"])?;
    let health = &dashboard.system_health;
    let stats = &dashboard.quick_stats;
    let sync = &dashboard.feature_sync;
    let version = &dashboard.current_version;

    let mut rows: Vec<(&str, String)> = Vec::new();
    if health.last_check.is_some() {
        rows.extend([
            ("Overall Status", health.overall_status.to_string()),
            ("Health Score", format!("{:.1}", health.health_score)),
            ("Database Status", health.database_status.to_string()),
            ("Cache Status", health.cache_status.to_string()),
            ("Worker Status", health.worker_status.to_string()),
            ("API Status", health.api_status.to_string()),
            ("Total Users", stats.total_users.to_string()),
            ("Active Users (24h)", stats.active_users_24h.to_string()),
            ("Total Medications", stats.total_medications.to_string()),
        ]);
    }

    rows.extend([
        ("Total Features", sync.total_features.to_string()),
        ("Synchronized Features", sync.synchronized.to_string()),
        ("Unsynchronized Features", sync.unsynchronized.to_string()),
        ("Critical Issues", sync.critical_issues.to_string()),
    ]);

    if let Some(release_date) = version.release_date {
        rows.extend([
            ("Current Version", version.version.clone()),
            ("Build Number", version.build.to_string()),
            ("Release Date", release_date.to_rfc3339()),
        ]);
    }

    rows.push(("Report Generated", dashboard.timestamp.to_rfc3339()));

    for (metric, value) in rows {
        table.row([metric, value.as_str()])?;
    }

    table.finish()
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, MonitoringError> {
    serde_json::to_vec_pretty(value).map_err(|e| MonitoringError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureSpec, HttpMethod, Priority};

    #[test]
    fn test_features_csv_joins_issues() {
        let spec = FeatureSpec {
            name: "offline_sync",
            description: "Offline data synchronization",
            frontend_files: &[],
            backend_app: "core",
            backend_endpoints: &["POST /api/sync/upload/"],
            priority: Priority::Low,
        };
        let mut feature = FeatureDescriptor::from_spec(&spec);
        feature.sync_issues = vec!["a".to_string(), "b".to_string()];

        let csv = String::from_utf8(features_csv(&[feature]).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Feature Name,Description,Priority"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("offline_sync,Offline data synchronization,low,planned,No,No,No,"));
        assert!(row.ends_with("a; b"));
    }

    #[test]
    fn test_api_tests_csv_has_header_and_one_row_per_test() {
        let tests = vec![
            EndpointTest::new(HttpMethod::Get, "/health/"),
            EndpointTest::new(HttpMethod::Post, "/api/medications/"),
        ];
        let csv = String::from_utf8(api_tests_csv(&tests).unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("/health/,GET,not_tested,0.00,0.00,0,0,0,0,Yes,"));
    }
}
