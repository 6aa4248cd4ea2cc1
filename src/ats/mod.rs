//! Structured-API routing for hosted career-site providers.
//!
//! Each provider declares a URL-match predicate, a tenant-slug extractor, and
//! a typed fetch against its public job-board API. The registry is ordered
//! because match predicates may overlap; the first match wins. Provider APIs
//! are hosted infrastructure with generous quotas, so requests bypass the
//! rate gate and use a fixed 30 s timeout.

pub mod ashby;
pub mod detector;
pub mod greenhouse;
mod json;
pub mod lever;
pub mod workable;

use crate::data::models::JobPosting;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const API_TIMEOUT: Duration = Duration::from_secs(30);

/// A hosted career-site platform with a structured job-board API.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Tag persisted to `companies.ats_provider` and the cache.
    fn name(&self) -> &'static str;

    /// Whether this provider can serve the given career URL.
    fn matches_url(&self, career_url: &str) -> bool;

    /// Tenant identifier carved from a provider-hosted URL.
    fn extract_slug(&self, career_url: &str) -> Option<String>;

    /// Fetch the tenant's full posting set via the provider API.
    async fn fetch_jobs(
        &self,
        client: &Client,
        slug: &str,
    ) -> crate::error::Result<Vec<JobPosting>>;
}

/// Ordered provider registry.
pub fn providers() -> &'static [&'static dyn Provider] {
    static PROVIDERS: [&'static dyn Provider; 4] = [
        &greenhouse::Greenhouse,
        &lever::Lever,
        &ashby::Ashby,
        &workable::Workable,
    ];
    &PROVIDERS
}

/// First provider whose predicate matches the URL, if any.
pub fn provider_for(career_url: &str) -> Option<&'static dyn Provider> {
    providers()
        .iter()
        .copied()
        .find(|p| p.matches_url(career_url))
}

/// Provider tag detectable from the URL alone.
pub fn detect_from_url(career_url: &str) -> Option<&'static str> {
    provider_for(career_url).map(|p| p.name())
}

/// Result of a successful structured-API fetch. An empty `jobs` list is
/// authoritative: the provider answered and the tenant has no open postings.
pub struct ApiFetch {
    pub jobs: Vec<JobPosting>,
    pub provider: &'static str,
    pub duration: Duration,
}

/// Attempt the structured-API path for a career URL.
///
/// `None` signals HTML fallback: no provider matched, the slug could not be
/// extracted, or the request/decode failed.
pub async fn fetch_jobs_via_api(client: &Client, career_url: &str) -> Option<ApiFetch> {
    let provider = provider_for(career_url)?;

    let Some(slug) = provider.extract_slug(career_url) else {
        warn!(
            provider = provider.name(),
            url = career_url,
            "could not extract tenant slug"
        );
        return None;
    };

    let start = Instant::now();
    match provider.fetch_jobs(client, &slug).await {
        Ok(jobs) => {
            let duration = start.elapsed();
            info!(
                provider = provider.name(),
                slug,
                count = jobs.len(),
                duration = format!("{duration:.2?}"),
                "fetched jobs via provider API"
            );
            Some(ApiFetch {
                jobs,
                provider: provider.name(),
                duration,
            })
        }
        Err(e) => {
            warn!(provider = provider.name(), slug, error = %e, "provider API fetch failed");
            None
        }
    }
}

/// GET a provider endpoint and return the body text.
pub(crate) async fn fetch_api_body(client: &Client, url: &str) -> crate::error::Result<String> {
    let response = client
        .get(url)
        .timeout(API_TIMEOUT)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()
        .with_context(|| format!("{url} returned an error status"))?;

    response
        .text()
        .await
        .with_context(|| format!("failed to read body from {url}"))
}

/// Parse an ISO-8601 timestamp (`Z` suffix or offset form).
pub(crate) fn parse_iso_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an epoch-milliseconds timestamp.
pub(crate) fn parse_epoch_ms(value: Option<i64>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_is_stable() {
        let names: Vec<_> = providers().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["greenhouse", "lever", "ashby", "workable"]);
    }

    #[test]
    fn provider_for_picks_first_match() {
        assert_eq!(
            detect_from_url("https://boards.greenhouse.io/acme"),
            Some("greenhouse")
        );
        assert_eq!(
            detect_from_url("https://jobs.lever.co/notion"),
            Some("lever")
        );
        assert_eq!(
            detect_from_url("https://jobs.ashbyhq.com/anthropic"),
            Some("ashby")
        );
        assert_eq!(
            detect_from_url("https://apply.workable.com/acme"),
            Some("workable")
        );
        assert_eq!(detect_from_url("https://acme.example/careers"), None);
    }

    #[test]
    fn iso_dates_parse_with_z_and_offset() {
        let z = parse_iso_date(Some("2025-06-01T09:30:00Z")).unwrap();
        assert_eq!(z.to_rfc3339(), "2025-06-01T09:30:00+00:00");

        let offset = parse_iso_date(Some("2025-06-01T05:30:00-04:00")).unwrap();
        assert_eq!(offset, z);

        assert!(parse_iso_date(Some("yesterday")).is_none());
        assert!(parse_iso_date(None).is_none());
    }

    #[test]
    fn epoch_ms_parses() {
        let dt = parse_epoch_ms(Some(1_717_236_000_000)).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-06-01T10:00:00+00:00");
        assert!(parse_epoch_ms(None).is_none());
    }
}
