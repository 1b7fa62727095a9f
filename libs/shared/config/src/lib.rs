use std::env;
use std::str::FromStr;
use tracing::warn;

/// Modules assumed installed when `INSTALLED_MODULES` is not set.
pub const DEFAULT_INSTALLED_MODULES: &[&str] = &[
    "auth",
    "users",
    "medications",
    "schedules",
    "notifications",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub redis_url: Option<String>,

    // Monitoring
    pub api_base_url: String,
    pub frontend_project_root: String,
    pub environment: String,
    pub installed_modules: Vec<String>,
    pub service_account_id: String,
    pub service_account_email: String,
    pub probe_concurrency: usize,
    pub component_timeout_ms: u64,
    pub monitoring_interval_secs: Option<u64>,
    pub monitoring_state_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok(),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("API_BASE_URL not set, using default");
                    "http://localhost:8000".to_string()
                }),
            frontend_project_root: env::var("FRONTEND_PROJECT_ROOT")
                .unwrap_or_else(|_| {
                    warn!("FRONTEND_PROJECT_ROOT not set, using default");
                    "../MedicationReminderRN".to_string()
                }),
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            installed_modules: env::var("INSTALLED_MODULES")
                .map(|raw| parse_list(&raw))
                .unwrap_or_else(|_| {
                    DEFAULT_INSTALLED_MODULES.iter().map(|m| m.to_string()).collect()
                }),
            service_account_id: env::var("MONITORING_SERVICE_ACCOUNT_ID")
                .unwrap_or_else(|_| "00000000-0000-4000-8000-00000000a11e".to_string()),
            service_account_email: env::var("MONITORING_SERVICE_ACCOUNT_EMAIL")
                .unwrap_or_else(|_| "test@medicationreminder.com".to_string()),
            probe_concurrency: parse_var("PROBE_CONCURRENCY", 4),
            component_timeout_ms: parse_var("COMPONENT_TIMEOUT_MS", 800),
            monitoring_interval_secs: env::var("MONITORING_INTERVAL_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok()),
            monitoring_state_path: env::var("MONITORING_STATE_PATH").ok(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_cache_configured(&self) -> bool {
        self.redis_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value, using default", name);
            default
        }),
        Err(_) => default,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_skips_blank_entries() {
        assert_eq!(
            parse_list("auth, medications,,schedules "),
            vec!["auth", "medications", "schedules"]
        );
    }
}
