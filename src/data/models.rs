//! Row types and the canonical job record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Normalised job record produced by the provider APIs and the HTML parser,
/// persisted into both the `jobs` table and the serialized cache payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub application_url: Option<String>,
    #[serde(default)]
    pub posted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub employment_type: Option<String>,
}

impl JobPosting {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            location: None,
            description: None,
            requirements: None,
            application_url: None,
            posted_date: None,
            department: None,
            employment_type: None,
        }
    }
}

/// A tracked company.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub company_id: i32,
    pub name: String,
    pub career_page_url: String,
    pub ats_provider: Option<String>,
    pub last_crawled: Option<DateTime<Utc>>,
}

/// A persisted job posting row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobRow {
    pub job_id: i32,
    pub company_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub application_url: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<JobRow> for JobPosting {
    fn from(row: JobRow) -> Self {
        Self {
            title: row.title,
            location: row.location,
            description: row.description,
            requirements: row.requirements,
            application_url: row.application_url,
            posted_date: row.posted_date,
            department: None,
            employment_type: None,
        }
    }
}

/// One cache row per company.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CacheEntry {
    pub company_id: i32,
    pub jobs: serde_json::Value,
    pub job_count: i32,
    pub crawled_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ats_provider: Option<String>,
    pub crawl_duration_ms: Option<i32>,
}

/// Append-only crawl log row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CrawlLogEntry {
    pub log_id: i32,
    pub url: String,
    pub status: String,
    pub error_message: Option<String>,
    pub response_time_ms: Option<i32>,
    pub logged_at: DateTime<Utc>,
}
