//! Workable widget API client.
//!
//! Endpoint: `https://apply.workable.com/api/v1/widget/accounts/{slug}`

use crate::ats::{Provider, fetch_api_body, json::parse_json_with_context};
use crate::data::models::JobPosting;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;

const API_BASE: &str = "https://apply.workable.com/api/v1/widget/accounts";

/// Path segments that can precede the account slug on workable.com URLs.
const RESERVED_SEGMENTS: &[&str] = &["api", "v1", "widget"];

static SLUG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)apply\.workable\.com/([^/?#]+)").unwrap(),
        Regex::new(r"(?i)workable\.com/([^/?#]+)").unwrap(),
    ]
});

#[derive(Deserialize)]
struct AccountResponse {
    #[serde(default)]
    jobs: Vec<AccountJob>,
}

#[derive(Deserialize)]
struct AccountJob {
    #[serde(default)]
    title: String,
    #[serde(default)]
    location: Option<JobLocation>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    employment_type: Option<String>,
}

#[derive(Deserialize)]
struct JobLocation {
    #[serde(default)]
    city: Option<String>,
}

pub struct Workable;

#[async_trait]
impl Provider for Workable {
    fn name(&self) -> &'static str {
        "workable"
    }

    fn matches_url(&self, career_url: &str) -> bool {
        career_url.to_lowercase().contains("workable.com")
    }

    fn extract_slug(&self, career_url: &str) -> Option<String> {
        SLUG_PATTERNS
            .iter()
            .find_map(|pattern| pattern.captures(career_url))
            .map(|captures| captures[1].to_lowercase())
            .filter(|slug| !RESERVED_SEGMENTS.contains(&slug.as_str()))
    }

    async fn fetch_jobs(
        &self,
        client: &Client,
        slug: &str,
    ) -> crate::error::Result<Vec<JobPosting>> {
        let url = format!("{API_BASE}/{slug}");
        let body = fetch_api_body(client, &url).await?;
        let response: AccountResponse = parse_json_with_context(&body)?;
        Ok(response.jobs.into_iter().map(map_job).collect())
    }
}

fn map_job(job: AccountJob) -> JobPosting {
    JobPosting {
        title: job.title,
        location: job.location.and_then(|l| l.city),
        description: None,
        requirements: None,
        application_url: job.url,
        posted_date: None,
        department: job.department,
        employment_type: job.employment_type,
    }
}
