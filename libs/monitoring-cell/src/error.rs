use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitoringError {
    /// The probe request could not be completed.
    #[error("Endpoint probe error: {0}")]
    Probe(String),

    /// The probe request completed with an unexpected status or body.
    #[error("Endpoint probe failed: {0}")]
    ProbeFailure(String),

    #[error("Feature sync check error: {0}")]
    SyncCheck(String),

    #[error("Component health check failed: {0}")]
    ComponentCheck(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Version {version_number} already exists in {environment}")]
    DuplicateVersion {
        version_number: String,
        environment: String,
    },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl From<std::io::Error> for MonitoringError {
    fn from(error: std::io::Error) -> Self {
        MonitoringError::Persistence(error.to_string())
    }
}

impl From<serde_json::Error> for MonitoringError {
    fn from(error: serde_json::Error) -> Self {
        MonitoringError::Persistence(error.to_string())
    }
}
