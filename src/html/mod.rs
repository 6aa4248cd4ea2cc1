//! HTML fallback parsing for career pages without a usable provider API.
//!
//! The parser discovers posting links on the career page, fetches each one
//! through the shared rate-gated session, and extracts a normalised record.
//! `scraper::Html` is not `Send`, so all document work happens in synchronous
//! helpers that never hold a parsed document across an await point.

pub mod extract;
pub mod filters;

pub use filters::JobFilter;

use crate::data::models::JobPosting;
use crate::net::CrawlSession;
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Generic career-page parser; the fallback for every page that does not use
/// a recognised ATS platform (and currently for recognised ones too).
pub struct GenericParser {
    session: Arc<CrawlSession>,
    filter: Option<JobFilter>,
}

impl GenericParser {
    pub fn new(session: Arc<CrawlSession>, filter: Option<JobFilter>) -> Self {
        Self { session, filter }
    }

    /// Discover job posting URLs on a career page.
    pub async fn get_job_links(&self, career_page_url: &str) -> Vec<String> {
        let Some(html) = self.session.get(career_page_url).await else {
            warn!(url = career_page_url, "failed to fetch career page");
            return Vec::new();
        };
        links_from_html(&html, career_page_url)
    }

    /// Fetch and parse a single job posting.
    pub async fn parse_job_posting(&self, job_url: &str) -> Option<JobPosting> {
        let html = self.session.get(job_url).await?;
        posting_from_html(&html, job_url)
    }

    /// Scrape every posting reachable from a career page, applying the
    /// configured filter. Postings that fail to parse are skipped; siblings
    /// continue.
    pub async fn scrape_company(&self, career_page_url: &str) -> Vec<JobPosting> {
        let job_links = self.get_job_links(career_page_url).await;
        info!(
            url = career_page_url,
            count = job_links.len(),
            "found job postings"
        );

        if job_links.is_empty() {
            warn!(url = career_page_url, "no job links found");
            return Vec::new();
        }

        let mut jobs = Vec::new();
        let mut filtered_count = 0;

        for (i, job_url) in job_links.iter().enumerate() {
            debug!(
                url = job_url,
                progress = format!("{}/{}", i + 1, job_links.len()),
                "parsing job posting"
            );

            match self.parse_job_posting(job_url).await {
                Some(job) => match &self.filter {
                    Some(filter) if !filter.matches(&job) => {
                        filtered_count += 1;
                        debug!(title = %job.title, "job filtered out");
                    }
                    _ => jobs.push(job),
                },
                None => warn!(url = job_url, "failed to parse job posting"),
            }
        }

        if filtered_count > 0 {
            info!(filtered_count, "jobs did not match the filter");
        }
        info!(
            url = career_page_url,
            scraped = jobs.len(),
            "company scrape complete"
        );
        jobs
    }
}

/// Posting links from a page, falling back to the broad text search when the
/// standard patterns find nothing.
fn links_from_html(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let links = extract::extract_job_links(&document, base_url);
    if !links.is_empty() {
        return links;
    }
    debug!(url = base_url, "no links with standard patterns, trying broader search");
    extract::broad_job_links(&document, base_url)
}

/// Extract a job record from a posting page. A posting without a title is
/// considered unparseable.
fn posting_from_html(html: &str, job_url: &str) -> Option<JobPosting> {
    let document = Html::parse_document(html);
    let text_content: String = document.root_element().text().collect();

    let title = extract::extract_title(&document)?;

    Some(JobPosting {
        title,
        location: extract::extract_location(&document, &text_content),
        description: extract::extract_description(&document),
        requirements: extract::extract_requirements(&document),
        application_url: extract::extract_application_url(&document, job_url)
            .or_else(|| Some(job_url.to_string())),
        posted_date: extract::extract_posted_date(&document, &text_content),
        department: None,
        employment_type: None,
    })
}
