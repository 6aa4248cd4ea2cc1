//! Retryable HTTP client for career-page fetching.
//!
//! Wraps a shared `reqwest::Client` with status-aware retry policy, rotated
//! browser headers, and crawl-log accounting. TLS validation errors are
//! accepted because career pages are frequently misconfigured.

use crate::config::HttpConfig;
use crate::data::crawl_logs;
use crate::net::headers::{origin_referer, realistic_headers};
use anyhow::Context;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{debug, warn};

/// Classification of a failed fetch, mirrored into crawl-log outcome tags.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchFailure {
    #[error("rate limited (429) on {0}")]
    RateLimited(String),
    #[error("access denied ({status}) on {url}")]
    AccessDenied { status: u16, url: String },
    #[error("HTTP {status} on {url}")]
    Status { status: u16, url: String },
    #[error("timeout on {0}")]
    Timeout(String),
    #[error("client error on {url}: {message}")]
    Client { url: String, message: String },
}

impl FetchFailure {
    /// Outcome tag recorded in `crawl_logs.status`.
    pub fn outcome_tag(&self) -> String {
        match self {
            FetchFailure::RateLimited(_) => "rate_limited".to_string(),
            FetchFailure::AccessDenied { .. } => "access_denied".to_string(),
            FetchFailure::Status { status, .. } => format!("http_{status}"),
            FetchFailure::Timeout(_) => "timeout".to_string(),
            FetchFailure::Client { .. } => "client_error".to_string(),
        }
    }
}

/// HTTP fetcher shared by the worker pool and the HTML parser.
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
    db_pool: PgPool,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig, db_pool: PgPool) -> crate::error::Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .tcp_keepalive(Some(Duration::from_secs(60 * 5)))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            db_pool,
        })
    }

    /// The underlying client, for callers that manage their own policy
    /// (provider API requests bypass the retry envelope).
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET with retries. Returns the response body, or the last failure once
    /// all attempts are exhausted.
    pub async fn get(
        &self,
        url: &str,
        extra_headers: Option<HeaderMap>,
        params: Option<&[(&str, String)]>,
        log_crawl: bool,
    ) -> Result<String, FetchFailure> {
        let mut request_headers = self.build_headers(url, extra_headers.as_ref());

        let start = Instant::now();
        let mut last_failure = None;

        for attempt in 1..=self.config.retry_attempts {
            debug!(url, attempt, max = self.config.retry_attempts, "GET request");

            let mut request = self.client.get(url).headers(request_headers.clone());
            if let Some(params) = params {
                request = request.query(params);
            }

            let failure = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let response_time_ms = start.elapsed().as_millis() as i32;

                    if status.is_success() {
                        let body = match response.text().await {
                            Ok(body) => body,
                            Err(e) => {
                                let failure = FetchFailure::Client {
                                    url: url.to_string(),
                                    message: format!("failed to read body: {e}"),
                                };
                                self.record(&failure, log_crawl, Some(response_time_ms)).await;
                                last_failure = Some(failure);
                                time::sleep(exponential_backoff(&self.config, attempt)).await;
                                continue;
                            }
                        };

                        if log_crawl {
                            crawl_logs::insert(&self.db_pool, url, "success", None, Some(response_time_ms))
                                .await;
                        }
                        debug!(url, bytes = body.len(), "fetch succeeded");
                        return Ok(body);
                    }

                    let failure = classify_status(status, url);
                    self.record(&failure, log_crawl, Some(response_time_ms)).await;

                    let wait = match &failure {
                        FetchFailure::RateLimited(_) => rate_limited_backoff(&self.config, attempt),
                        FetchFailure::AccessDenied { .. } => {
                            // Rotate identity before trying again
                            request_headers = self.build_headers(url, extra_headers.as_ref());
                            linear_backoff(&self.config, attempt)
                        }
                        _ => linear_backoff(&self.config, attempt),
                    };
                    last_failure = Some(failure);
                    time::sleep(wait).await;
                    continue;
                }
                Err(e) if e.is_timeout() => FetchFailure::Timeout(url.to_string()),
                Err(e) => FetchFailure::Client {
                    url: url.to_string(),
                    message: e.to_string(),
                },
            };

            // Transport-level failures land here
            self.record(&failure, log_crawl, None).await;
            let wait = match &failure {
                FetchFailure::Timeout(_) => linear_backoff(&self.config, attempt),
                _ => exponential_backoff(&self.config, attempt),
            };
            last_failure = Some(failure);
            time::sleep(wait).await;
        }

        let failure = last_failure.unwrap_or_else(|| FetchFailure::Client {
            url: url.to_string(),
            message: "no attempts were made".to_string(),
        });
        warn!(url, error = %failure, "all retries exhausted");
        Err(failure)
    }

    /// POST with the same retry shape as [`Self::get`], without status-specific
    /// handling beyond success/non-success.
    pub async fn post(
        &self,
        url: &str,
        json: Option<&serde_json::Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<String, FetchFailure> {
        let request_headers = self.build_headers(url, extra_headers.as_ref());
        let mut last_failure = None;

        for attempt in 1..=self.config.retry_attempts {
            debug!(url, attempt, max = self.config.retry_attempts, "POST request");

            let mut request = self.client.post(url).headers(request_headers.clone());
            if let Some(json) = json {
                request = request.json(json);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return response.text().await.map_err(|e| FetchFailure::Client {
                        url: url.to_string(),
                        message: format!("failed to read body: {e}"),
                    });
                }
                Ok(response) => {
                    last_failure = Some(classify_status(response.status(), url));
                    time::sleep(linear_backoff(&self.config, attempt)).await;
                }
                Err(e) => {
                    last_failure = Some(if e.is_timeout() {
                        FetchFailure::Timeout(url.to_string())
                    } else {
                        FetchFailure::Client {
                            url: url.to_string(),
                            message: e.to_string(),
                        }
                    });
                    time::sleep(exponential_backoff(&self.config, attempt)).await;
                }
            }
        }

        let failure = last_failure.unwrap_or_else(|| FetchFailure::Client {
            url: url.to_string(),
            message: "no attempts were made".to_string(),
        });
        warn!(url, error = %failure, "all retries exhausted for POST");
        Err(failure)
    }

    /// Realistic defaults, caller extras on top, and the URL's own origin as
    /// Referer.
    fn build_headers(&self, url: &str, extra: Option<&HeaderMap>) -> HeaderMap {
        let mut headers = realistic_headers();
        if let Some(extra) = extra {
            for (name, value) in extra {
                headers.insert(name.clone(), value.clone());
            }
        }
        if let Some(referer) = origin_referer(url) {
            headers.insert(reqwest::header::REFERER, referer);
        }
        headers
    }

    async fn record(&self, failure: &FetchFailure, log_crawl: bool, response_time_ms: Option<i32>) {
        warn!(error = %failure, "fetch attempt failed");
        if log_crawl {
            let url = match failure {
                FetchFailure::RateLimited(url) | FetchFailure::Timeout(url) => url,
                FetchFailure::AccessDenied { url, .. }
                | FetchFailure::Status { url, .. }
                | FetchFailure::Client { url, .. } => url,
            };
            crawl_logs::insert(
                &self.db_pool,
                url,
                &failure.outcome_tag(),
                Some(&failure.to_string()),
                response_time_ms,
            )
            .await;
        }
    }
}

fn classify_status(status: StatusCode, url: &str) -> FetchFailure {
    match status.as_u16() {
        429 => FetchFailure::RateLimited(url.to_string()),
        401 | 403 => FetchFailure::AccessDenied {
            status: status.as_u16(),
            url: url.to_string(),
        },
        other => FetchFailure::Status {
            status: other,
            url: url.to_string(),
        },
    }
}

/// `retry_delay · backoff^attempt · 2`; 429s get extra headroom.
fn rate_limited_backoff(config: &HttpConfig, attempt: u32) -> Duration {
    Duration::from_secs_f64(config.retry_delay * config.retry_backoff.powi(attempt as i32) * 2.0)
}

/// `retry_delay · attempt`
fn linear_backoff(config: &HttpConfig, attempt: u32) -> Duration {
    Duration::from_secs_f64(config.retry_delay * f64::from(attempt))
}

/// `retry_delay · backoff^attempt`
fn exponential_backoff(config: &HttpConfig, attempt: u32) -> Duration {
    Duration::from_secs_f64(config.retry_delay * config.retry_backoff.powi(attempt as i32))
}
