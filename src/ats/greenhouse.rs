//! Greenhouse job-board API client.
//!
//! Endpoint: `https://boards-api.greenhouse.io/v1/boards/{slug}/jobs`

use crate::ats::{Provider, fetch_api_body, json::parse_json_with_context, parse_iso_date};
use crate::data::models::JobPosting;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;

const API_BASE: &str = "https://boards-api.greenhouse.io/v1/boards";

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)greenhouse\.io").unwrap());

static SLUG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)boards\.greenhouse\.io/([^/?#]+)").unwrap(),
        Regex::new(r"(?i)job-boards\.greenhouse\.io/([^/?#]+)").unwrap(),
        Regex::new(r"(?i)greenhouse\.io/([^/?#]+)").unwrap(),
    ]
});

#[derive(Deserialize)]
struct BoardResponse {
    #[serde(default)]
    jobs: Vec<BoardJob>,
}

#[derive(Deserialize)]
struct BoardJob {
    #[serde(default)]
    title: String,
    #[serde(default)]
    location: Option<BoardLocation>,
    #[serde(default)]
    absolute_url: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    departments: Vec<BoardDepartment>,
}

#[derive(Deserialize)]
struct BoardLocation {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct BoardDepartment {
    #[serde(default)]
    name: Option<String>,
}

pub struct Greenhouse;

#[async_trait]
impl Provider for Greenhouse {
    fn name(&self) -> &'static str {
        "greenhouse"
    }

    fn matches_url(&self, career_url: &str) -> bool {
        URL_PATTERN.is_match(career_url)
    }

    fn extract_slug(&self, career_url: &str) -> Option<String> {
        SLUG_PATTERNS
            .iter()
            .find_map(|pattern| pattern.captures(career_url))
            .map(|captures| captures[1].to_lowercase())
    }

    async fn fetch_jobs(
        &self,
        client: &Client,
        slug: &str,
    ) -> crate::error::Result<Vec<JobPosting>> {
        let url = format!("{API_BASE}/{slug}/jobs");
        let body = fetch_api_body(client, &url).await?;
        let response: BoardResponse = parse_json_with_context(&body)?;
        Ok(response.jobs.into_iter().map(map_job).collect())
    }
}

fn map_job(job: BoardJob) -> JobPosting {
    JobPosting {
        title: job.title,
        location: job.location.and_then(|l| l.name),
        description: None,
        requirements: None,
        application_url: job.absolute_url,
        posted_date: parse_iso_date(job.updated_at.as_deref()),
        department: job.departments.into_iter().find_map(|d| d.name),
        employment_type: None,
    }
}
