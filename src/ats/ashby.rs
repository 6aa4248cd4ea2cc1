//! Ashby posting API client.
//!
//! Endpoint: `https://api.ashbyhq.com/posting-api/job-board/{slug}`

use crate::ats::{Provider, fetch_api_body, json::parse_json_with_context, parse_iso_date};
use crate::data::models::JobPosting;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;

const API_BASE: &str = "https://api.ashbyhq.com/posting-api/job-board";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)ashbyhq\.com").unwrap());

static SLUG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)jobs\.ashbyhq\.com/([^/?#]+)").unwrap(),
        Regex::new(r"(?i)ashbyhq\.com/([^/?#]+)").unwrap(),
    ]
});

#[derive(Deserialize)]
struct BoardResponse {
    #[serde(default)]
    jobs: Vec<BoardJob>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardJob {
    #[serde(default)]
    title: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description_html: Option<String>,
    #[serde(default)]
    application_url: Option<String>,
    #[serde(default)]
    job_url: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    employment_type: Option<String>,
}

pub struct Ashby;

#[async_trait]
impl Provider for Ashby {
    fn name(&self) -> &'static str {
        "ashby"
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
        let url = format!("{API_BASE}/{slug}");
        let body = fetch_api_body(client, &url).await?;
        let response: BoardResponse = parse_json_with_context(&body)?;
        Ok(response.jobs.into_iter().map(map_job).collect())
    }
}

fn map_job(job: BoardJob) -> JobPosting {
    JobPosting {
        title: job.title,
        location: job.location,
        description: job.description_html,
        requirements: None,
        application_url: job.application_url.or(job.job_url),
        posted_date: parse_iso_date(job.published_date.as_deref()),
        department: job.department,
        employment_type: job.employment_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ashby_hosts() {
        assert!(Ashby.matches_url("https://jobs.ashbyhq.com/anthropic"));
        assert!(!Ashby.matches_url("https://apply.workable.com/acme"));
    }

    #[test]
    fn extracts_slug() {
        assert_eq!(
            Ashby
                .extract_slug("https://jobs.ashbyhq.com/Anthropic?utm=x")
                .as_deref(),
            Some("anthropic")
        );
    }

    #[test]
    fn maps_board_job() {
        let body = r#"{
            "jobs": [{
                "title": "Research Engineer",
                "location": "San Francisco",
                "descriptionHtml": "<p>Do research.</p>",
                "applicationUrl": "https://jobs.ashbyhq.com/acme/1/application",
                "jobUrl": "https://jobs.ashbyhq.com/acme/1",
                "publishedDate": "2025-04-10T00:00:00Z",
                "department": "Research",
                "employmentType": "FullTime"
            }]
        }"#;
        let response: BoardResponse = parse_json_with_context(body).unwrap();
        let job = map_job(response.jobs.into_iter().next().unwrap());

        assert_eq!(job.title, "Research Engineer");
        assert_eq!(job.location.as_deref(), Some("San Francisco"));
        assert_eq!(job.description.as_deref(), Some("<p>Do research.</p>"));
        assert_eq!(
            job.application_url.as_deref(),
            Some("https://jobs.ashbyhq.com/acme/1/application")
        );
        assert_eq!(job.employment_type.as_deref(), Some("FullTime"));
        assert!(job.posted_date.is_some());
    }
}
