// =====================================================================================
// MONITORING CELL - MEDICATION REMINDER SELF-TEST & HEALTH REPORTING
// =====================================================================================
//
// This cell keeps the medication reminder backend honest about itself:
// - Feature sync between the mobile frontend and the backend modules
// - Synthetic API endpoint probes with rolling statistics
// - Component health checks reduced to a single health score
// - Dashboard, version history, alerts and report exports
//
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use error::MonitoringError;
pub use models::{
    ApiTestReport, Dashboard, EndpointTest, ExportFormat, ExportKind, FeatureDescriptor,
    FeatureSyncReport, HealthSnapshot, HealthStatus, HttpMethod, ProbeResult, ProbeStatus,
    SystemVersion, VersionReport,
};

pub use services::{
    EndpointProbe, EndpointTestRegistry, FeatureSyncChecker, HealthAggregator, InMemoryStore,
    MonitoringReportService, MonitoringStore,
};

pub use router::create_monitoring_router;
pub use handlers::MonitoringHandlers;
