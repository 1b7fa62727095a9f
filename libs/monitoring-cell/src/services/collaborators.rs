// =====================================================================================
// COLLABORATOR SEAMS
// =====================================================================================
//
// The monitoring cell observes the rest of the platform only through these
// traits. Default implementations are built from `AppConfig`; tests swap in
// their own.
//
// =====================================================================================

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::auth::JwtClaims;
use shared_utils::jwt::sign_token;

use crate::error::MonitoringError;
use crate::models::{HealthStatus, UsageMetrics};

/// Supplies the bearer token attached to probes of authenticated endpoints.
#[async_trait]
pub trait AuthTokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, MonitoringError>;
}

pub trait AppRegistry: Send + Sync {
    fn is_module_installed(&self, name: &str) -> Result<bool>;
}

/// Read-only view of the frontend project. Paths are relative to its root.
#[async_trait]
pub trait FrontendFs: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool>;
    async fn read_to_string(&self, path: &str) -> Result<String>;
}

#[async_trait]
pub trait ComponentCheck: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check(&self) -> Result<HealthStatus>;
}

#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn collect(&self) -> Result<UsageMetrics>;
}

// =====================================================================================
// SERVICE ACCOUNT TOKENS
// =====================================================================================

const TOKEN_LIFETIME_HOURS: i64 = 1;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Signs tokens for the monitoring service account with the platform secret,
/// reusing the last one until it is close to expiry.
pub struct ServiceAccountTokenProvider {
    subject: String,
    email: String,
    secret: String,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            subject: config.service_account_id.clone(),
            email: config.service_account_email.clone(),
            secret: config.supabase_jwt_secret.clone(),
            cached: RwLock::new(None),
        }
    }

    fn issue(&self) -> Result<CachedToken, MonitoringError> {
        let now = Utc::now();
        let expires_at = (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp();

        let claims = JwtClaims {
            sub: self.subject.clone(),
            exp: Some(expires_at as u64),
            email: Some(self.email.clone()),
            role: Some("authenticated".to_string()),
            app_metadata: None,
            user_metadata: None,
            aud: Some("authenticated".to_string()),
            iat: Some(now.timestamp() as u64),
        };

        let token = sign_token(&claims, &self.secret).map_err(MonitoringError::Unauthorized)?;
        Ok(CachedToken { token, expires_at })
    }
}

#[async_trait]
impl AuthTokenProvider for ServiceAccountTokenProvider {
    async fn bearer_token(&self) -> Result<String, MonitoringError> {
        let now = Utc::now().timestamp();

        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.expires_at - TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(cached.token.clone());
            }
        }

        let mut guard = self.cached.write().await;
        let fresh = self.issue()?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        debug!("Issued service account token for {}", self.email);

        Ok(token)
    }
}

// =====================================================================================
// INSTALLED MODULES
// =====================================================================================

pub struct ConfiguredAppRegistry {
    modules: HashSet<String>,
}

impl ConfiguredAppRegistry {
    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.installed_modules.iter().cloned())
    }
}

impl AppRegistry for ConfiguredAppRegistry {
    fn is_module_installed(&self, name: &str) -> Result<bool> {
        Ok(self.modules.contains(name))
    }
}

// =====================================================================================
// FRONTEND FILESYSTEM
// =====================================================================================

pub struct LocalFrontendFs {
    root: PathBuf,
}

impl LocalFrontendFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a declared path onto the root. Declared paths may start with the
    /// project directory name, which is dropped. Escaping the root is refused.
    fn resolve(&self, declared: &str) -> Result<PathBuf> {
        let mut relative = Path::new(declared);

        if let Some(project_dir) = self.root.file_name() {
            if let Ok(stripped) = relative.strip_prefix(project_dir) {
                relative = stripped;
            }
        }

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            anyhow::bail!("Path escapes the frontend root: {}", declared);
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FrontendFs for LocalFrontendFs {
    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&full_path).await?)
    }

    async fn read_to_string(&self, path: &str) -> Result<String> {
        let full_path = self.resolve(path)?;
        Ok(tokio::fs::read_to_string(&full_path).await?)
    }
}

// =====================================================================================
// WIRING
// =====================================================================================

#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthTokenProvider>,
    pub apps: Arc<dyn AppRegistry>,
    pub frontend: Arc<dyn FrontendFs>,
    pub database: Arc<dyn ComponentCheck>,
    pub cache: Arc<dyn ComponentCheck>,
    pub worker: Arc<dyn ComponentCheck>,
    pub metrics: Arc<dyn MetricsSource>,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> Self {
        use crate::services::components::{
            redis_pool, CacheCheck, DatabaseCheck, SupabaseMetricsSource, WorkerCheck,
        };

        let pool = match redis_pool(config) {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Redis pool unavailable, cache and worker checks will report critical: {}", e);
                None
            }
        };

        Self {
            auth: Arc::new(ServiceAccountTokenProvider::new(config)),
            apps: Arc::new(ConfiguredAppRegistry::from_config(config)),
            frontend: Arc::new(LocalFrontendFs::new(&config.frontend_project_root)),
            database: Arc::new(DatabaseCheck::new(config)),
            cache: Arc::new(CacheCheck::new(pool.clone())),
            worker: Arc::new(WorkerCheck::new(pool)),
            metrics: Arc::new(SupabaseMetricsSource::new(config)),
        }
    }
}
