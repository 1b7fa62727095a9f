// =====================================================================================
// ENDPOINT PROBE
// =====================================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Client, Method};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;

use crate::error::MonitoringError;
use crate::models::{ApiTestReport, EndpointTest, HttpMethod, ProbeResult, ProbeStatus};
use crate::services::collaborators::AuthTokenProvider;
use crate::services::registry::EndpointTestRegistry;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything observed during one request, before classification.
struct Attempt {
    status_code: Option<u16>,
    response_time_ms: f64,
    verdict: Result<(), MonitoringError>,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

pub struct EndpointProbe {
    client: Client,
    base_url: String,
    auth: Arc<dyn AuthTokenProvider>,
    concurrency: usize,
    timeout: Duration,
}

impl EndpointProbe {
    pub fn new(config: &AppConfig, auth: Arc<dyn AuthTokenProvider>) -> Self {
        Self::with_timeout(&config.api_base_url, auth, config.probe_concurrency, PROBE_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        auth: Arc<dyn AuthTokenProvider>,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Sends one request and classifies it as passed, failed or error.
    #[instrument(skip(self, test), fields(method = %test.http_method, path = %test.path))]
    pub async fn probe(&self, test: &EndpointTest) -> ProbeResult {
        let tested_at = Utc::now();
        let attempt = self.attempt(test).await;

        let (status, error) = match attempt.verdict {
            Ok(()) => (ProbeStatus::Passed, None),
            Err(MonitoringError::ProbeFailure(message)) => (ProbeStatus::Failed, Some(message)),
            Err(MonitoringError::Probe(message)) => (ProbeStatus::Error, Some(message)),
            Err(other) => (ProbeStatus::Error, Some(other.to_string())),
        };

        match &error {
            Some(message) => debug!("Probe {:?}: {}", status, message),
            None => debug!("Probe passed in {:.1}ms", attempt.response_time_ms),
        }

        ProbeResult {
            method: test.http_method,
            endpoint: test.path.clone(),
            status,
            response_time_ms: attempt.response_time_ms,
            status_code: attempt.status_code,
            expected_status: test.expected_status_code,
            error,
            tested_at,
        }
    }

    async fn attempt(&self, test: &EndpointTest) -> Attempt {
        let url = format!("{}{}", self.base_url, test.path);
        let mut request = self.client.request(test.http_method.into(), &url);

        if test.requires_auth {
            match self.auth.bearer_token().await {
                Ok(token) => request = request.bearer_auth(token),
                Err(e) => {
                    return Attempt {
                        status_code: None,
                        response_time_ms: 0.0,
                        verdict: Err(MonitoringError::Probe(format!("Auth token unavailable: {}", e))),
                    }
                }
            }
        }

        if test.http_method.sends_body() {
            request = request.json(&test.request_payload);
        }

        let start = Instant::now();
        let sent = request.send().await;
        let response_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("Request timed out after {}s", self.timeout.as_secs())
                } else {
                    e.to_string()
                };
                return Attempt {
                    status_code: None,
                    response_time_ms,
                    verdict: Err(MonitoringError::Probe(message)),
                };
            }
        };

        let status_code = response.status().as_u16();
        let verdict = check_response(test, response).await;

        Attempt {
            status_code: Some(status_code),
            response_time_ms,
            verdict,
        }
    }

    /// Probes every registered test with at most `concurrency` in flight and
    /// folds each result into the registry. Tests not yet started when
    /// `cancel` fires are skipped.
    #[instrument(skip_all)]
    pub async fn run_all(
        &self,
        registry: &EndpointTestRegistry,
        cancel: &CancellationToken,
    ) -> Result<ApiTestReport, MonitoringError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let tests = registry.list().await?;
        let total_tests = tests.len();
        info!("Running {} API tests (concurrency {})", total_tests, self.concurrency);

        let outcomes: Vec<Option<ProbeResult>> = stream::iter(tests)
            .map(|test| async move {
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                let result = self.probe(&test).await;
                registry.record_result(&result).await?;
                Ok::<_, MonitoringError>(Some(result))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let skipped = outcomes.iter().filter(|o| o.is_none()).count();
        let mut results: Vec<ProbeResult> = outcomes.into_iter().flatten().collect();
        results.sort_by(|a, b| a.endpoint.cmp(&b.endpoint).then(a.method.cmp(&b.method)));

        let count = |status: ProbeStatus| results.iter().filter(|r| r.status == status).count();
        let report = ApiTestReport {
            started_at,
            completed_at: Utc::now(),
            total_tests,
            passed: count(ProbeStatus::Passed),
            failed: count(ProbeStatus::Failed),
            errors: count(ProbeStatus::Error),
            skipped,
            cancelled: cancel.is_cancelled(),
            total_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            results,
        };

        if report.cancelled {
            warn!("API test run cancelled, {} of {} tests skipped", skipped, total_tests);
        }
        info!(
            "API tests completed: {} passed, {} failed, {} errors",
            report.passed, report.failed, report.errors
        );

        Ok(report)
    }
}

async fn check_response(test: &EndpointTest, response: reqwest::Response) -> Result<(), MonitoringError> {
    let actual = response.status().as_u16();
    if actual != test.expected_status_code {
        return Err(MonitoringError::ProbeFailure(format!(
            "Status: {}, Expected: {}",
            actual, test.expected_status_code
        )));
    }

    if test.expected_response_keys.is_empty() {
        return Ok(());
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| MonitoringError::Probe(format!("Invalid JSON response: {}", e)))?;
    let object = body
        .as_object()
        .ok_or_else(|| MonitoringError::Probe("Response body is not a JSON object".to_string()))?;

    match test
        .expected_response_keys
        .iter()
        .find(|key| !object.contains_key(key.as_str()))
    {
        Some(missing) => Err(MonitoringError::ProbeFailure(format!("Missing response key: {}", missing))),
        None => Ok(()),
    }
}
