// =====================================================================================
// COMPONENT CHECKS & USAGE METRICS
// =====================================================================================

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{HealthStatus, UsageMetrics};
use crate::services::collaborators::{ComponentCheck, MetricsSource};

const SLOW_DATABASE_THRESHOLD: Duration = Duration::from_millis(2000);
const CACHE_PROBE_KEY: &str = "health_check";
const CACHE_PROBE_VALUE: &str = "ok";
const CACHE_PROBE_TTL_SECS: u64 = 10;
pub const WORKER_HEARTBEAT_PATTERN: &str = "reminder_worker:heartbeat:*";

/// Builds the shared Redis pool, `None` when no Redis URL is configured.
pub fn redis_pool(config: &AppConfig) -> Result<Option<Pool>> {
    if !config.is_cache_configured() {
        return Ok(None);
    }

    let url = config.redis_url.clone().unwrap_or_default();
    let pool = Config::from_url(url)
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| anyhow!("Failed to create Redis pool: {}", e))?;

    Ok(Some(pool))
}

fn require_pool(pool: &Option<Pool>) -> Result<&Pool> {
    pool.as_ref().ok_or_else(|| anyhow!("Redis is not configured"))
}

pub struct DatabaseCheck {
    client: SupabaseClient,
}

impl DatabaseCheck {
    pub fn new(config: &AppConfig) -> Self {
        Self { client: SupabaseClient::new(config) }
    }
}

#[async_trait]
impl ComponentCheck for DatabaseCheck {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn check(&self) -> Result<HealthStatus> {
        let start = Instant::now();
        self.client.ping().await?;

        let elapsed = start.elapsed();
        debug!("Database ping took {:?}", elapsed);

        if elapsed > SLOW_DATABASE_THRESHOLD {
            Ok(HealthStatus::Warning)
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

/// SET/GET round-trip against the cache.
pub struct CacheCheck {
    pool: Option<Pool>,
}

impl CacheCheck {
    pub fn new(pool: Option<Pool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComponentCheck for CacheCheck {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn check(&self) -> Result<HealthStatus> {
        let mut conn = require_pool(&self.pool)?.get().await?;

        let _: () = redis::cmd("SET")
            .arg(CACHE_PROBE_KEY)
            .arg(CACHE_PROBE_VALUE)
            .arg("EX")
            .arg(CACHE_PROBE_TTL_SECS)
            .query_async(&mut conn)
            .await?;
        let value: Option<String> = conn.get(CACHE_PROBE_KEY).await?;

        if value.as_deref() == Some(CACHE_PROBE_VALUE) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Warning)
        }
    }
}

/// Reminder workers refresh a heartbeat key while alive.
pub struct WorkerCheck {
    pool: Option<Pool>,
}

impl WorkerCheck {
    pub fn new(pool: Option<Pool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComponentCheck for WorkerCheck {
    fn name(&self) -> &'static str {
        "worker"
    }

    async fn check(&self) -> Result<HealthStatus> {
        let mut conn = require_pool(&self.pool)?.get().await?;
        let heartbeats: Vec<String> = conn.keys(WORKER_HEARTBEAT_PATTERN).await?;
        debug!("Found {} worker heartbeats", heartbeats.len());

        if heartbeats.is_empty() {
            Ok(HealthStatus::Warning)
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

/// Usage counts read from the Supabase REST API.
pub struct SupabaseMetricsSource {
    client: SupabaseClient,
}

impl SupabaseMetricsSource {
    pub fn new(config: &AppConfig) -> Self {
        Self { client: SupabaseClient::new(config) }
    }
}

#[async_trait]
impl MetricsSource for SupabaseMetricsSource {
    async fn collect(&self) -> Result<UsageMetrics> {
        let now = Utc::now();
        let active_since = format!(
            "last_active=gte.{}",
            (now - ChronoDuration::hours(24)).to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let today = format!("date=eq.{}", now.date_naive());

        let (total_users, active_users_24h, total_medications, schedules_today) = tokio::try_join!(
            self.client.count_rows("users", None),
            self.client.count_rows("users", Some(&active_since)),
            self.client.count_rows("medications", Some("is_active=eq.true")),
            self.client.count_rows("daily_schedules", Some(&today)),
        )?;

        Ok(UsageMetrics {
            total_users,
            active_users_24h,
            total_medications,
            schedules_today,
        })
    }
}
