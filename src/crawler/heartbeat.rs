//! Heartbeat file for external liveness checks.

use chrono::Utc;
use std::path::PathBuf;
use tracing::warn;

/// Writes an ISO-8601 timestamp to a fixed path. Consumed by an external
/// health check; failures are logged and swallowed so a full disk cannot
/// take down the crawl loop.
pub struct Heartbeat {
    path: PathBuf,
}

impl Heartbeat {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn touch(&self) {
        let timestamp = Utc::now().to_rfc3339();
        if let Err(e) = tokio::fs::write(&self.path, &timestamp).await {
            warn!(path = %self.path.display(), error = %e, "could not update heartbeat");
        }
    }
}
