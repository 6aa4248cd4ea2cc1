//! Per-origin admission control for outbound crawling.
//!
//! Two coupled mechanisms per origin: a requests-per-minute window, and a
//! randomized inter-request delay to mimic human pacing. Acquisition for one
//! origin is serialized through that origin's mutex; distinct origins proceed
//! in parallel.

use crate::config::RateGateConfig;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::{debug, info};
use url::Url;

const WINDOW: Duration = Duration::from_secs(60);

/// Lower and upper bounds of the first-request warm-up delay, seconds.
const WARMUP_RANGE: (f64, f64) = (0.5, 1.5);

#[derive(Debug)]
struct OriginState {
    window_start: Instant,
    window_count: u32,
    last_request: Option<Instant>,
}

/// Per-origin rate gate keyed by `scheme://host`.
pub struct RateGate {
    origins: DashMap<String, Arc<Mutex<OriginState>>>,
    config: RateGateConfig,
}

/// Point-in-time counters for one origin, exposed via the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OriginStats {
    pub origin: String,
    pub requests_this_minute: u32,
    pub seconds_since_last_request: Option<f64>,
}

impl RateGate {
    pub fn new(config: RateGateConfig) -> Self {
        Self {
            origins: DashMap::new(),
            config,
        }
    }

    /// Extract the `scheme://host` gate key from a URL.
    pub fn origin_key(url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        Some(format!("{}://{}", parsed.scheme(), host))
    }

    /// Block until a request to `url`'s origin is safe to issue.
    ///
    /// Holds the origin's mutex across any sleep so that concurrent callers
    /// against the same origin are strictly serialized and each observes the
    /// spacing left by the previous request.
    pub async fn acquire(&self, url: &str) {
        let Some(origin) = Self::origin_key(url) else {
            return;
        };

        let state = self
            .origins
            .entry(origin.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(OriginState {
                    window_start: Instant::now(),
                    window_count: 0,
                    last_request: None,
                }))
            })
            .clone();
        let mut state = state.lock().await;

        let now = Instant::now();

        // Reset the window once a minute has passed
        if now.duration_since(state.window_start) > WINDOW {
            state.window_start = now;
            state.window_count = 0;
            debug!(origin = %origin, "rate window reset");
        }

        // At the ceiling: sleep out the remainder of the window, then reset
        if state.window_count >= self.config.requests_per_minute {
            let elapsed = now.duration_since(state.window_start);
            if elapsed < WINDOW {
                let wait = WINDOW - elapsed;
                info!(origin = %origin, wait = format!("{wait:.1?}"), "rate limit reached, waiting");
                time::sleep(wait).await;
            }
            state.window_start = Instant::now();
            state.window_count = 0;
        }

        match state.last_request {
            Some(last) => {
                // Randomized spacing since the previous request to this origin
                let delay = Duration::from_secs_f64(random_in(
                    self.config.min_delay,
                    self.config.max_delay,
                ));
                let since_last = last.elapsed();
                if since_last < delay {
                    let wait = delay - since_last;
                    debug!(origin = %origin, wait = format!("{wait:.2?}"), "delaying request");
                    time::sleep(wait).await;
                }
            }
            None => {
                // First contact with this origin gets a small warm-up delay
                let warmup = Duration::from_secs_f64(random_in(WARMUP_RANGE.0, WARMUP_RANGE.1));
                time::sleep(warmup).await;
            }
        }

        state.last_request = Some(Instant::now());
        state.window_count += 1;

        debug!(
            origin = %origin,
            count = state.window_count,
            limit = self.config.requests_per_minute,
            "rate gate acquired"
        );
    }

    /// Snapshot of all tracked origins.
    pub async fn stats(&self) -> Vec<OriginStats> {
        // The map's shard guard must not be held across the lock await
        let origins: Vec<(String, Arc<Mutex<OriginState>>)> = self
            .origins
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut out = Vec::with_capacity(origins.len());
        for (origin, state) in origins {
            let state = state.lock().await;
            out.push(OriginStats {
                origin,
                requests_this_minute: state.window_count,
                seconds_since_last_request: state.last_request.map(|t| t.elapsed().as_secs_f64()),
            });
        }
        out
    }
}

/// Uniform sample from `[low, high]`, computed outside any await point.
fn random_in(low: f64, high: f64) -> f64 {
    use rand::Rng;
    rand::rng().random_range(low..=high)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(rpm: u32, min_delay: f64, max_delay: f64) -> RateGate {
        RateGate::new(RateGateConfig {
            requests_per_minute: rpm,
            min_delay,
            max_delay,
        })
    }

    // -- origin_key tests --

    #[test]
    fn origin_key_is_scheme_and_host() {
        assert_eq!(
            RateGate::origin_key("https://boards.greenhouse.io/acme/jobs/1?x=1").as_deref(),
            Some("https://boards.greenhouse.io")
        );
        assert_eq!(
            RateGate::origin_key("http://acme.example/careers").as_deref(),
            Some("http://acme.example")
        );
    }

    #[test]
    fn origin_key_ignores_port_path_and_query() {
        let a = RateGate::origin_key("https://acme.example/careers").unwrap();
        let b = RateGate::origin_key("https://acme.example/jobs/42?ref=home").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn origin_key_rejects_garbage() {
        assert!(RateGate::origin_key("not a url").is_none());
    }

    // -- acquire timing tests (paused clock) --

    #[tokio::test(start_paused = true)]
    async fn first_request_incurs_warmup_only() {
        let gate = gate(20, 2.0, 5.0);
        let start = Instant::now();
        gate.acquire("https://acme.example/careers").await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs_f64(0.5), "got {elapsed:?}");
        assert!(elapsed <= Duration::from_secs_f64(1.5), "got {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_requests_respect_min_spacing() {
        let gate = gate(20, 2.0, 5.0);
        gate.acquire("https://acme.example/careers").await;
        let start = Instant::now();
        gate.acquire("https://acme.example/jobs/1").await;
        let gap = start.elapsed();
        assert!(gap >= Duration::from_secs_f64(2.0), "gap was {gap:?}");
        assert!(gap <= Duration::from_secs_f64(5.0), "gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn window_ceiling_forces_wait_for_remainder() {
        // Zero jitter isolates the minute window
        let gate = gate(3, 0.0, 0.0);
        let window_start = Instant::now();
        for _ in 0..3 {
            gate.acquire("https://acme.example/careers").await;
        }
        let before_fourth = Instant::now();
        gate.acquire("https://acme.example/careers").await;

        // The fourth request must not start inside the original minute window
        let window_elapsed_at_grant = before_fourth.duration_since(window_start)
            + before_fourth.elapsed();
        assert!(
            window_elapsed_at_grant >= Duration::from_secs(58),
            "fourth request granted after only {window_elapsed_at_grant:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_origins_do_not_share_spacing() {
        let gate = gate(20, 30.0, 30.0);
        gate.acquire("https://a.example/careers").await;
        let start = Instant::now();
        // A different origin only pays its own warm-up, not a.example's jitter
        gate.acquire("https://b.example/careers").await;
        assert!(start.elapsed() <= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_reports_window_counts() {
        let gate = gate(20, 0.0, 0.0);
        gate.acquire("https://acme.example/careers").await;
        gate.acquire("https://acme.example/careers").await;

        let stats = gate.stats().await;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].origin, "https://acme.example");
        assert_eq!(stats[0].requests_this_minute, 2);
        assert!(stats[0].seconds_since_last_request.is_some());
    }
}
