use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use tracing::{debug, error};

use shared_config::AppConfig;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_timeout(config, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(config: &AppConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    /// Cheap reachability check against the REST root.
    pub async fn ping(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow!("Supabase URL is not configured"));
        }

        let url = format!("{}/rest/v1/", self.base_url);
        debug!("Pinging {}", url);

        let response = self.client
            .request(Method::GET, &url)
            .headers(self.get_headers(None)?)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(anyhow!("Database API returned {}", status));
        }

        Ok(())
    }

    /// Counts the rows of `table` matching the PostgREST `filter`
    /// (for example `is_active=eq.true`).
    pub async fn count_rows(&self, table: &str, filter: Option<&str>) -> Result<u64> {
        let mut url = format!("{}/rest/v1/{}?select=id", self.base_url, table);
        if let Some(filter) = filter {
            url.push('&');
            url.push_str(filter);
        }
        debug!("Counting rows at {}", url);

        let mut headers = self.get_headers(None)?;
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));
        headers.insert("Range", HeaderValue::from_static("0-0"));

        let response = self.client
            .request(Method::GET, &url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| anyhow!("Missing row count for table {}", table))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// Extracts the total from a `Content-Range` header such as `0-0/42` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(url: &str) -> AppConfig {
        AppConfig {
            supabase_url: url.to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            redis_url: None,
            api_base_url: "http://localhost:8000".to_string(),
            frontend_project_root: "/tmp".to_string(),
            environment: "test".to_string(),
            installed_modules: Vec::new(),
            service_account_id: "svc".to_string(),
            service_account_email: "svc@example.com".to_string(),
            probe_concurrency: 1,
            component_timeout_ms: 100,
            monitoring_interval_secs: None,
            monitoring_state_path: None,
        }
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-0/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn test_count_rows_reads_content_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/medications"))
            .and(query_param("is_active", "eq.true"))
            .and(header("Prefer", "count=exact"))
            .respond_with(ResponseTemplate::new(206).insert_header("Content-Range", "0-0/17"))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server.uri()));
        let count = client.count_rows("medications", Some("is_active=eq.true")).await.unwrap();
        assert_eq!(count, 17);
    }

    #[tokio::test]
    async fn test_ping_fails_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server.uri()));
        assert!(client.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_ping_without_url_fails() {
        let client = SupabaseClient::new(&config_for(""));
        assert!(client.ping().await.is_err());
    }
}
