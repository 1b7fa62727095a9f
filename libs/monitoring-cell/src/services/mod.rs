pub mod collaborators;
pub mod components;
pub mod export;
pub mod features;
pub mod health;
pub mod probe;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod store;

pub use collaborators::{
    AppRegistry, AuthTokenProvider, Collaborators, ComponentCheck, FrontendFs, MetricsSource,
};
pub use features::{FeatureSyncChecker, FEATURE_REGISTRY};
pub use health::{calculate_health_score, HealthAggregator};
pub use probe::EndpointProbe;
pub use registry::EndpointTestRegistry;
pub use report::MonitoringReportService;
pub use store::{InMemoryStore, MonitoringStore};
