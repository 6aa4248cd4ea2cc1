//! Outbound networking: rate gate, retryable fetcher, and the shared session
//! handle that couples them.

pub mod fetcher;
pub mod headers;
pub mod rate_gate;

pub use fetcher::{FetchFailure, HttpFetcher};
pub use rate_gate::RateGate;

use crate::config::Config;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared crawl session: one HTTP client plus the per-origin rate gate.
///
/// Handed to workers and the HTML parser as an `Arc` so that every component
/// funnels through the same admission control and connection pool. Tests
/// substitute their own instance; nothing reads this through a global.
pub struct CrawlSession {
    pub fetcher: HttpFetcher,
    pub gate: RateGate,
}

impl CrawlSession {
    pub fn new(config: &Config, db_pool: PgPool) -> crate::error::Result<Arc<Self>> {
        Ok(Arc::new(Self {
            fetcher: HttpFetcher::new(config.http(), db_pool)?,
            gate: RateGate::new(config.rate_gate()),
        }))
    }

    /// Rate-gated GET with crawl-log accounting. Returns the body, or `None`
    /// after the fetcher exhausts its retries.
    pub async fn get(&self, url: &str) -> Option<String> {
        self.gate.acquire(url).await;
        self.fetcher.get(url, None, None, true).await.ok()
    }
}
