// =====================================================================================
// MONITORING CELL HANDLERS
// =====================================================================================

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::error::MonitoringError;
use crate::models::{
    Alert, ApiTestReport, CreateVersionRequest, Dashboard, ExportFormat, ExportKind, ExportQuery,
    FeatureSyncOverview, FeatureSyncReport, HealthSnapshot, HistoryQuery, SystemVersion,
    VersionReport,
};
use crate::services::MonitoringReportService;
use shared_config::AppConfig;
use shared_models::auth::User;

const DEFAULT_HISTORY_LIMIT: usize = 20;

pub struct MonitoringHandlers {
    service: Arc<MonitoringReportService>,
    config: Arc<AppConfig>,
}

impl MonitoringHandlers {
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, MonitoringError> {
        let service = Arc::new(MonitoringReportService::new(config.clone()).await?);
        Ok(Self::with_service(config, service))
    }

    pub fn with_service(config: Arc<AppConfig>, service: Arc<MonitoringReportService>) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> Arc<MonitoringReportService> {
        self.service.clone()
    }

    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }
}

// =====================================================================================
// DASHBOARD & REPORTS
// =====================================================================================

#[instrument(skip(handlers, user), fields(user_id = %user.id))]
pub async fn get_dashboard(
    State(handlers): State<Arc<MonitoringHandlers>>,
    Extension(user): Extension<User>,
) -> Result<Json<Dashboard>, MonitoringError> {
    Ok(Json(handlers.service.dashboard().await?))
}

#[instrument(skip(handlers, user), fields(user_id = %user.id))]
pub async fn sync_features(
    State(handlers): State<Arc<MonitoringHandlers>>,
    Extension(user): Extension<User>,
) -> Result<Json<FeatureSyncReport>, MonitoringError> {
    let mut report = handlers.service.sync_features().await?;
    report.issues = report.display_issues().to_vec();
    Ok(Json(report))
}

pub async fn get_feature_report(
    State(handlers): State<Arc<MonitoringHandlers>>,
) -> Result<Json<FeatureSyncOverview>, MonitoringError> {
    Ok(Json(handlers.service.feature_report().await?))
}

#[instrument(skip(handlers))]
pub async fn get_version_report(
    State(handlers): State<Arc<MonitoringHandlers>>,
) -> Result<Json<VersionReport>, MonitoringError> {
    Ok(Json(handlers.service.generate_version_report().await?))
}

#[instrument(skip(handlers, user, request), fields(user_id = %user.id))]
pub async fn create_version(
    State(handlers): State<Arc<MonitoringHandlers>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateVersionRequest>,
) -> Result<(StatusCode, Json<SystemVersion>), MonitoringError> {
    let version_number = request
        .version_number
        .ok_or_else(|| MonitoringError::Validation("version_number is required".to_string()))?;
    let notes = request.release_notes.unwrap_or_default();

    let version = handlers.service.create_version(&version_number, &notes).await?;
    info!("Admin {} created version {}", user.id, version.version_number);

    Ok((StatusCode::CREATED, Json(version)))
}

// =====================================================================================
// API TESTS
// =====================================================================================

#[instrument(skip(handlers, user), fields(user_id = %user.id))]
pub async fn run_tests(
    State(handlers): State<Arc<MonitoringHandlers>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiTestReport>, MonitoringError> {
    let report = handlers.service.run_api_tests(&CancellationToken::new()).await?;
    Ok(Json(report))
}

#[instrument(skip(handlers, user), fields(user_id = %user.id))]
pub async fn cancel_tests(
    State(handlers): State<Arc<MonitoringHandlers>>,
    Extension(user): Extension<User>,
) -> StatusCode {
    handlers.service.cancel_api_tests();
    StatusCode::ACCEPTED
}

pub async fn setup_tests(
    State(handlers): State<Arc<MonitoringHandlers>>,
) -> Result<Json<serde_json::Value>, MonitoringError> {
    let count = handlers.service.setup_default_tests().await?;
    Ok(Json(serde_json::json!({
        "message": format!("Setup {} default API tests", count),
        "count": count,
    })))
}

// =====================================================================================
// HEALTH
// =====================================================================================

#[instrument(skip(handlers))]
pub async fn run_health_check(
    State(handlers): State<Arc<MonitoringHandlers>>,
) -> Result<Json<HealthSnapshot>, MonitoringError> {
    Ok(Json(handlers.service.perform_health_check().await?))
}

pub async fn get_health_history(
    State(handlers): State<Arc<MonitoringHandlers>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HealthSnapshot>>, MonitoringError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(handlers.service.health_history(limit).await?))
}

pub async fn get_alerts(
    State(handlers): State<Arc<MonitoringHandlers>>,
) -> Result<Json<Vec<Alert>>, MonitoringError> {
    Ok(Json(handlers.service.critical_alerts().await?))
}

// =====================================================================================
// EXPORTS
// =====================================================================================

#[instrument(skip(handlers))]
pub async fn export_report(
    State(handlers): State<Arc<MonitoringHandlers>>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, MonitoringError> {
    let kind: ExportKind = query.kind.as_deref().unwrap_or("dashboard").parse()?;
    let format: ExportFormat = query.format.as_deref().unwrap_or("csv").parse()?;

    let body = handlers.service.render_export(kind, format).await?;
    let disposition = format!(
        "attachment; filename=\"{}.{}\"",
        kind.file_stem(),
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

// =====================================================================================
// ERROR RESPONSE IMPLEMENTATION
// =====================================================================================

impl IntoResponse for MonitoringError {
    fn into_response(self) -> Response {
        let status = match &self {
            MonitoringError::Validation(_) | MonitoringError::DuplicateVersion { .. } => {
                StatusCode::BAD_REQUEST
            }
            MonitoringError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Monitoring request failed: {}", self);
        }

        (status, Json(serde_json::json!({
            "error": self.to_string(),
            "timestamp": chrono::Utc::now()
        }))).into_response()
    }
}
