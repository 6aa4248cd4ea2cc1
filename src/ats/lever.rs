//! Lever postings API client.
//!
//! Endpoint: `https://api.lever.co/v0/postings/{slug}` (returns a bare array).

use crate::ats::{Provider, fetch_api_body, json::parse_json_with_context, parse_epoch_ms};
use crate::data::models::JobPosting;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;

const API_BASE: &str = "https://api.lever.co/v0/postings";

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)lever\.co").unwrap());

static SLUG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)jobs\.lever\.co/([^/?#]+)").unwrap(),
        Regex::new(r"(?i)lever\.co/([^/?#]+)").unwrap(),
    ]
});

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Posting {
    #[serde(default)]
    text: String,
    #[serde(default)]
    categories: Categories,
    #[serde(default)]
    workplace_type: Option<String>,
    #[serde(default)]
    description_plain: Option<String>,
    /// Preferred over `hosted_url` when both are present.
    #[serde(default)]
    apply_url: Option<String>,
    #[serde(default)]
    hosted_url: Option<String>,
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Deserialize, Default)]
struct Categories {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    commitment: Option<String>,
}

pub struct Lever;

#[async_trait]
impl Provider for Lever {
    fn name(&self) -> &'static str {
        "lever"
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
        let postings: Vec<Posting> = parse_json_with_context(&body)?;
        Ok(postings.into_iter().map(map_posting).collect())
    }
}

fn map_posting(posting: Posting) -> JobPosting {
    // Lever splits location across the category and the workplace type
    // ("Remote", "Hybrid"); join whichever parts are present.
    let location_parts: Vec<String> = [posting.categories.location.clone(), posting.workplace_type]
        .into_iter()
        .flatten()
        .collect();
    let location = if location_parts.is_empty() {
        None
    } else {
        Some(location_parts.join(" - "))
    };

    JobPosting {
        title: posting.text,
        location,
        description: posting.description_plain,
        requirements: None,
        application_url: posting.apply_url.or(posting.hosted_url),
        posted_date: parse_epoch_ms(posting.created_at),
        department: posting.categories.team,
        employment_type: posting.categories.commitment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_lever_hosts() {
        assert!(Lever.matches_url("https://jobs.lever.co/notion"));
        assert!(!Lever.matches_url("https://boards.greenhouse.io/acme"));
    }

    #[test]
    fn extracts_slug() {
        assert_eq!(
            Lever
                .extract_slug("https://jobs.lever.co/Notion/123-abc")
                .as_deref(),
            Some("notion")
        );
        assert!(Lever.extract_slug("https://acme.example/jobs").is_none());
    }

    #[test]
    fn maps_posting_and_prefers_apply_url() {
        let body = r#"[{
            "text": "Backend Engineer",
            "categories": {"location": "Toronto", "team": "Platform", "commitment": "Full-time"},
            "workplaceType": "Remote",
            "descriptionPlain": "Build services.",
            "applyUrl": "https://jobs.lever.co/acme/1/apply",
            "hostedUrl": "https://jobs.lever.co/acme/1",
            "createdAt": 1717236000000
        }]"#;
        let postings: Vec<Posting> = parse_json_with_context(body).unwrap();
        let job = map_posting(postings.into_iter().next().unwrap());

        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.location.as_deref(), Some("Toronto - Remote"));
        assert_eq!(job.description.as_deref(), Some("Build services."));
        assert_eq!(
            job.application_url.as_deref(),
            Some("https://jobs.lever.co/acme/1/apply")
        );
        assert_eq!(job.department.as_deref(), Some("Platform"));
        assert_eq!(job.employment_type.as_deref(), Some("Full-time"));
        assert_eq!(
            job.posted_date.unwrap().to_rfc3339(),
            "2024-06-01T10:00:00+00:00"
        );
    }

    #[test]
    fn falls_back_to_hosted_url() {
        let body = r#"[{"text": "PM", "hostedUrl": "https://jobs.lever.co/acme/2"}]"#;
        let postings: Vec<Posting> = parse_json_with_context(body).unwrap();
        let job = map_posting(postings.into_iter().next().unwrap());
        assert_eq!(
            job.application_url.as_deref(),
            Some("https://jobs.lever.co/acme/2")
        );
        assert!(job.location.is_none());
    }
}
