// =====================================================================================
// MONITORING CELL MODELS
// =====================================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::MonitoringError;

pub const DEFAULT_HEALTH_THRESHOLD_MS: f64 = 1000.0;

// =====================================================================================
// ENDPOINT TESTS
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and DELETE probes never carry a body.
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(MonitoringError::Validation(format!("Unsupported HTTP method: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    NotTested,
    Passed,
    Failed,
    Error,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::NotTested => "not_tested",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Error => "error",
        }
    }
}

/// Outcome of a single probe. Every probe lands in exactly one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Passed,
    Failed,
    Error,
}

impl From<ProbeStatus> for TestStatus {
    fn from(status: ProbeStatus) -> Self {
        match status {
            ProbeStatus::Passed => TestStatus::Passed,
            ProbeStatus::Failed => TestStatus::Failed,
            ProbeStatus::Error => TestStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointTest {
    pub http_method: HttpMethod,
    pub path: String,
    pub requires_auth: bool,
    pub request_payload: Value,
    pub expected_status_code: u16,
    pub expected_response_keys: Vec<String>,

    pub last_status: TestStatus,
    pub last_response_time_ms: Option<f64>,
    pub last_error_message: String,
    pub last_tested_at: Option<DateTime<Utc>>,

    pub total_runs: u64,
    pub passed_runs: u64,
    pub failed_runs: u64,
    pub error_runs: u64,
    pub average_response_time_ms: Option<f64>,

    pub is_healthy: bool,
    pub health_threshold_ms: f64,
}

impl EndpointTest {
    pub fn new(http_method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            http_method,
            path: path.into(),
            requires_auth: true,
            request_payload: Value::Object(Default::default()),
            expected_status_code: 200,
            expected_response_keys: Vec::new(),
            last_status: TestStatus::NotTested,
            last_response_time_ms: None,
            last_error_message: String::new(),
            last_tested_at: None,
            total_runs: 0,
            passed_runs: 0,
            failed_runs: 0,
            error_runs: 0,
            average_response_time_ms: None,
            is_healthy: true,
            health_threshold_ms: DEFAULT_HEALTH_THRESHOLD_MS,
        }
    }

    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.request_payload = payload;
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status_code = status;
        self
    }

    pub fn expect_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_response_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threshold_ms(mut self, threshold_ms: f64) -> Self {
        self.health_threshold_ms = threshold_ms;
        self
    }

    pub fn key(&self) -> EndpointKey {
        EndpointKey::new(self.http_method, &self.path)
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_runs == 0 {
            return 0.0;
        }
        (self.passed_runs as f64 / self.total_runs as f64) * 100.0
    }

    /// Folds one probe result into the rolling statistics.
    pub fn record(&mut self, result: &ProbeResult) {
        self.total_runs += 1;
        match result.status {
            ProbeStatus::Passed => self.passed_runs += 1,
            ProbeStatus::Failed => self.failed_runs += 1,
            ProbeStatus::Error => self.error_runs += 1,
        }

        let sample = result.response_time_ms;
        self.average_response_time_ms = Some(match self.average_response_time_ms {
            Some(average) => {
                let n = self.total_runs as f64;
                (average * (n - 1.0) + sample) / n
            }
            None => sample,
        });

        self.last_status = result.status.into();
        self.last_response_time_ms = Some(sample);
        self.last_error_message = result.error.clone().unwrap_or_default();
        self.last_tested_at = Some(result.tested_at);
        self.is_healthy = result.status == ProbeStatus::Passed && sample <= self.health_threshold_ms;
    }

    /// Replaces the probe configuration, keeping the accumulated statistics.
    pub fn reconfigure(&mut self, other: &EndpointTest) {
        self.requires_auth = other.requires_auth;
        self.request_payload = other.request_payload.clone();
        self.expected_status_code = other.expected_status_code;
        self.expected_response_keys = other.expected_response_keys.clone();
        self.health_threshold_ms = other.health_threshold_ms;
    }
}

/// Identity of an endpoint test: path first so that ordering groups methods
/// of the same path together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub path: String,
    pub method: HttpMethod,
}

impl EndpointKey {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self { path: path.to_string(), method }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub method: HttpMethod,
    pub endpoint: String,
    pub status: ProbeStatus,
    pub response_time_ms: f64,
    pub status_code: Option<u16>,
    pub expected_status: u16,
    pub error: Option<String>,
    pub tested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTestReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub total_time_ms: f64,
    pub results: Vec<ProbeResult>,
}

impl ApiTestReport {
    pub fn failures(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.status != ProbeStatus::Passed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTestSummary {
    pub total_tests: usize,
    pub healthy_endpoints: usize,
    pub average_response_time_ms: f64,
}

// =====================================================================================
// FEATURE SYNC
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Planned,
    InProgress,
    Completed,
    Deprecated,
    Broken,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureStatus::Planned => "planned",
            FeatureStatus::InProgress => "in_progress",
            FeatureStatus::Completed => "completed",
            FeatureStatus::Deprecated => "deprecated",
            FeatureStatus::Broken => "broken",
        }
    }
}

/// Static declaration of what a feature needs on both sides.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub frontend_files: &'static [&'static str],
    pub backend_app: &'static str,
    pub backend_endpoints: &'static [&'static str],
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub feature_name: String,
    pub description: String,
    pub frontend_files: Vec<String>,
    pub backend_app: String,
    pub backend_endpoints: Vec<String>,
    pub priority: Priority,
    pub status: FeatureStatus,
    pub frontend_implemented: bool,
    pub backend_implemented: bool,
    pub is_synchronized: bool,
    pub sync_issues: Vec<String>,
    pub last_sync_check: Option<DateTime<Utc>>,
}

impl FeatureDescriptor {
    pub fn from_spec(spec: &FeatureSpec) -> Self {
        Self {
            feature_name: spec.name.to_string(),
            description: spec.description.to_string(),
            frontend_files: spec.frontend_files.iter().map(|f| f.to_string()).collect(),
            backend_app: spec.backend_app.to_string(),
            backend_endpoints: spec.backend_endpoints.iter().map(|e| e.to_string()).collect(),
            priority: spec.priority,
            status: FeatureStatus::Planned,
            frontend_implemented: false,
            backend_implemented: false,
            is_synchronized: false,
            sync_issues: Vec::new(),
            last_sync_check: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncVerdict {
    pub feature_name: String,
    pub frontend_implemented: bool,
    pub backend_implemented: bool,
    pub is_synchronized: bool,
    pub issues: Vec<String>,
    pub frontend_files_checked: usize,
    pub backend_endpoints_checked: usize,
}

impl SyncVerdict {
    pub fn lifecycle_status(&self) -> FeatureStatus {
        if self.is_synchronized {
            FeatureStatus::Completed
        } else if !self.issues.is_empty() {
            FeatureStatus::Broken
        } else {
            FeatureStatus::InProgress
        }
    }
}

/// Number of issues shown in caller-facing summaries.
pub const DISPLAY_ISSUE_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSyncReport {
    pub timestamp: DateTime<Utc>,
    pub total_features: usize,
    pub synchronized: usize,
    pub unsynchronized: usize,
    pub issues: Vec<String>,
    pub details: BTreeMap<String, SyncVerdict>,
}

impl FeatureSyncReport {
    pub fn display_issues(&self) -> &[String] {
        let end = self.issues.len().min(DISPLAY_ISSUE_LIMIT);
        &self.issues[..end]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub total_features: usize,
    pub synchronized: usize,
    pub unsynchronized: usize,
    pub critical_issues: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSyncOverview {
    pub generated_at: DateTime<Utc>,
    pub summary: SyncSummary,
    pub features: Vec<FeatureDescriptor>,
}

// =====================================================================================
// SYSTEM HEALTH
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            HealthStatus::Healthy => 100.0,
            HealthStatus::Warning => 60.0,
            HealthStatus::Critical => 20.0,
            HealthStatus::Unknown => 0.0,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatuses {
    pub database: HealthStatus,
    pub cache: HealthStatus,
    pub worker: HealthStatus,
    pub api: HealthStatus,
}

impl ComponentStatuses {
    pub fn all(status: HealthStatus) -> Self {
        Self { database: status, cache: status, worker: status, api: status }
    }

    pub fn as_array(&self) -> [HealthStatus; 4] {
        [self.database, self.cache, self.worker, self.api]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: HealthStatus,
    pub healthy: usize,
    pub total: usize,
    pub ratio: Option<f64>,
}

/// Counts supplied by the user, medication and schedule subsystems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub total_users: u64,
    pub active_users_24h: u64,
    pub total_medications: u64,
    pub schedules_today: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiCallMetrics {
    pub total_api_calls_24h: u64,
    pub failed_api_calls_24h: u64,
    pub average_response_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: f64,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub check_id: Uuid,
    pub database_status: HealthStatus,
    pub cache_status: HealthStatus,
    pub worker_status: HealthStatus,
    pub api_status: HealthStatus,

    pub total_users: u64,
    pub active_users_24h: u64,
    pub total_medications: u64,
    pub schedules_today: u64,
    pub total_api_calls_24h: u64,
    pub failed_api_calls_24h: u64,
    pub average_response_time_ms: Option<f64>,

    pub overall_status: HealthStatus,
    pub health_score: f64,
    pub detailed_report: Value,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn components(&self) -> ComponentStatuses {
        ComponentStatuses {
            database: self.database_status,
            cache: self.cache_status,
            worker: self.worker_status,
            api: self.api_status,
        }
    }

    pub fn usage(&self) -> UsageMetrics {
        UsageMetrics {
            total_users: self.total_users,
            active_users_24h: self.active_users_24h,
            total_medications: self.total_medications,
            schedules_today: self.schedules_today,
        }
    }
}

// =====================================================================================
// VERSIONS
// =====================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemVersion {
    pub id: Uuid,
    pub version_number: String,
    pub environment: String,
    pub build_number: u32,
    pub backend_version: String,
    pub frontend_version: String,
    pub database_version: String,
    pub release_date: DateTime<Utc>,
    pub release_notes: String,
    pub is_current: bool,
}

#[derive(Debug, Clone)]
pub struct NewSystemVersion {
    pub version_number: String,
    pub environment: String,
    pub backend_version: String,
    pub frontend_version: String,
    pub database_version: String,
    pub release_notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentVersionInfo {
    pub version_number: String,
    pub build_number: u32,
    pub backend_version: String,
    pub frontend_version: String,
    pub release_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version_number: String,
    pub build_number: u32,
    pub release_date: DateTime<Utc>,
    pub environment: String,
}

impl From<&SystemVersion> for VersionSummary {
    fn from(version: &SystemVersion) -> Self {
        Self {
            version_number: version.version_number.clone(),
            build_number: version.build_number,
            release_date: version.release_date,
            environment: version.environment.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub service_version: String,
    pub environment: String,
    pub debug_mode: bool,
    pub database: String,
    pub os: String,
    pub arch: String,
    pub installed_modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionReport {
    pub generated_at: DateTime<Utc>,
    pub current_version: CurrentVersionInfo,
    pub system_info: SystemInfo,
    pub feature_sync: SyncSummary,
    pub last_versions: Vec<VersionSummary>,
}

// =====================================================================================
// DASHBOARD & ALERTS
// =====================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardHealth {
    pub overall_status: HealthStatus,
    pub health_score: f64,
    pub database_status: HealthStatus,
    pub cache_status: HealthStatus,
    pub worker_status: HealthStatus,
    pub api_status: HealthStatus,
    pub last_check: Option<DateTime<Utc>>,
}

impl DashboardHealth {
    pub fn from_snapshot(snapshot: Option<&HealthSnapshot>) -> Self {
        match snapshot {
            Some(s) => Self {
                overall_status: s.overall_status,
                health_score: s.health_score,
                database_status: s.database_status,
                cache_status: s.cache_status,
                worker_status: s.worker_status,
                api_status: s.api_status,
                last_check: Some(s.created_at),
            },
            None => Self {
                overall_status: HealthStatus::Unknown,
                health_score: 0.0,
                database_status: HealthStatus::Unknown,
                cache_status: HealthStatus::Unknown,
                worker_status: HealthStatus::Unknown,
                api_status: HealthStatus::Unknown,
                last_check: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardVersion {
    pub version: String,
    pub build: u32,
    pub release_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub timestamp: DateTime<Utc>,
    pub system_health: DashboardHealth,
    pub feature_sync: SyncSummary,
    pub api_tests: ApiTestSummary,
    pub current_version: DashboardVersion,
    pub quick_stats: UsageMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CriticalHealth,
    CriticalFeatures,
    ApiFailures,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub details: Value,
}

// =====================================================================================
// EXPORTS
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Features,
    ApiTests,
    HealthHistory,
    Dashboard,
}

impl ExportKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ExportKind::Features => "feature_sync_report",
            ExportKind::ApiTests => "api_tests_report",
            ExportKind::HealthHistory => "health_history_report",
            ExportKind::Dashboard => "dashboard_report",
        }
    }
}

impl FromStr for ExportKind {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "features" => Ok(ExportKind::Features),
            "api_tests" => Ok(ExportKind::ApiTests),
            "health_history" => Ok(ExportKind::HealthHistory),
            "dashboard" => Ok(ExportKind::Dashboard),
            other => Err(MonitoringError::Validation(format!("Invalid export kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(MonitoringError::Validation(format!("Invalid export format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub kind: ExportKind,
    pub format: ExportFormat,
    pub destination: String,
    pub bytes_written: usize,
}

// Request/Response models
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateVersionRequest {
    pub version_number: Option<String>,
    pub release_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: ProbeStatus, response_time_ms: f64) -> ProbeResult {
        ProbeResult {
            method: HttpMethod::Get,
            endpoint: "/health/".to_string(),
            status,
            response_time_ms,
            status_code: Some(200),
            expected_status: 200,
            error: None,
            tested_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_seeds_then_averages_response_time() {
        let mut test = EndpointTest::new(HttpMethod::Get, "/health/");
        test.record(&result(ProbeStatus::Passed, 100.0));
        assert_eq!(test.average_response_time_ms, Some(100.0));

        test.record(&result(ProbeStatus::Passed, 200.0));
        test.record(&result(ProbeStatus::Failed, 300.0));
        assert_eq!(test.average_response_time_ms, Some(200.0));
        assert_eq!(test.total_runs, 3);
        assert_eq!(test.passed_runs + test.failed_runs + test.error_runs, 3);
    }

    #[test]
    fn test_health_follows_latest_run_only() {
        let mut test = EndpointTest::new(HttpMethod::Get, "/health/").with_threshold_ms(50.0);
        test.record(&result(ProbeStatus::Error, 5.0));
        assert!(!test.is_healthy);

        test.record(&result(ProbeStatus::Passed, 10.0));
        assert!(test.is_healthy);

        test.record(&result(ProbeStatus::Passed, 51.0));
        assert!(!test.is_healthy);
        assert_eq!(test.last_status, TestStatus::Passed);
    }

    #[test]
    fn test_reconfigure_keeps_statistics() {
        let mut test = EndpointTest::new(HttpMethod::Post, "/api/medications/");
        test.record(&result(ProbeStatus::Passed, 10.0));

        let replacement = EndpointTest::new(HttpMethod::Post, "/api/medications/")
            .expect_status(201)
            .expect_keys(["id"]);
        test.reconfigure(&replacement);

        assert_eq!(test.expected_status_code, 201);
        assert_eq!(test.expected_response_keys, vec!["id"]);
        assert_eq!(test.total_runs, 1);
    }

    #[test]
    fn test_success_rate_handles_no_runs() {
        let test = EndpointTest::new(HttpMethod::Get, "/health/");
        assert_eq!(test.success_rate(), 0.0);
    }

    #[test]
    fn test_lifecycle_status_from_verdict() {
        let mut verdict = SyncVerdict {
            feature_name: "x".to_string(),
            frontend_implemented: false,
            backend_implemented: true,
            is_synchronized: false,
            issues: Vec::new(),
            frontend_files_checked: 0,
            backend_endpoints_checked: 1,
        };
        assert_eq!(verdict.lifecycle_status(), FeatureStatus::InProgress);

        verdict.issues.push("Frontend file missing: a.tsx".to_string());
        assert_eq!(verdict.lifecycle_status(), FeatureStatus::Broken);
    }

    #[test]
    fn test_export_kind_rejects_unknown_values() {
        assert_eq!("api_tests".parse::<ExportKind>().unwrap(), ExportKind::ApiTests);
        assert!("everything".parse::<ExportKind>().is_err());
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
