//! In-memory tracking of ad-hoc crawl jobs.

use crate::crawler::CrawlOutcome;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlJobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Summary counts reported once a crawl job finishes.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub total_companies: usize,
    pub successful_companies: usize,
    pub failed_companies: usize,
    pub total_jobs_found: usize,
    pub cache_hits: usize,
    pub api_hits: usize,
}

impl CrawlSummary {
    pub fn from_outcomes(outcomes: &[CrawlOutcome]) -> Self {
        Self {
            total_companies: outcomes.len(),
            successful_companies: outcomes.iter().filter(|o| o.success).count(),
            failed_companies: outcomes.iter().filter(|o| !o.success).count(),
            total_jobs_found: outcomes.iter().map(|o| o.jobs_found).sum(),
            cache_hits: outcomes.iter().filter(|o| o.cache_hit).count(),
            api_hits: outcomes
                .iter()
                .filter(|o| o.method.starts_with("api:"))
                .count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlJobRecord {
    pub job_id: String,
    pub status: CrawlJobStatus,
    pub companies: usize,
    pub created_at: DateTime<Utc>,
    pub summary: Option<CrawlSummary>,
    pub error: Option<String>,
}

/// Tracks crawl jobs accepted through the HTTP surface.
pub struct CrawlJobTracker {
    jobs: DashMap<String, CrawlJobRecord>,
}

impl CrawlJobTracker {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    /// Register a new job and return its generated id.
    pub fn create(&self, companies: usize) -> String {
        let job_id = generate_job_id();
        self.jobs.insert(
            job_id.clone(),
            CrawlJobRecord {
                job_id: job_id.clone(),
                status: CrawlJobStatus::Queued,
                companies,
                created_at: Utc::now(),
                summary: None,
                error: None,
            },
        );
        job_id
    }

    pub fn set_running(&self, job_id: &str) {
        if let Some(mut record) = self.jobs.get_mut(job_id) {
            record.status = CrawlJobStatus::Running;
        }
    }

    pub fn complete(&self, job_id: &str, summary: CrawlSummary) {
        if let Some(mut record) = self.jobs.get_mut(job_id) {
            record.status = CrawlJobStatus::Completed;
            record.summary = Some(summary);
        }
    }

    pub fn fail(&self, job_id: &str, error: String) {
        if let Some(mut record) = self.jobs.get_mut(job_id) {
            record.status = CrawlJobStatus::Failed;
            record.error = Some(error);
        }
    }

    pub fn get(&self, job_id: &str) -> Option<CrawlJobRecord> {
        self.jobs.get(job_id).map(|record| record.clone())
    }
}

impl Default for CrawlJobTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_job_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..16)
        .map(|_| format!("{:x}", rng.random_range(0..16)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool, method: &str, jobs_found: usize, cache_hit: bool) -> CrawlOutcome {
        CrawlOutcome {
            company_name: "Acme".to_string(),
            success,
            jobs_found,
            jobs_inserted: jobs_found,
            method: method.to_string(),
            cache_hit,
            duration_ms: 5,
            errors: Vec::new(),
        }
    }

    #[test]
    fn lifecycle_moves_through_states() {
        let tracker = CrawlJobTracker::new();
        let job_id = tracker.create(3);

        assert_eq!(tracker.get(&job_id).unwrap().status, CrawlJobStatus::Queued);

        tracker.set_running(&job_id);
        assert_eq!(
            tracker.get(&job_id).unwrap().status,
            CrawlJobStatus::Running
        );

        let summary = CrawlSummary::from_outcomes(&[
            outcome(true, "cache", 12, true),
            outcome(true, "api:greenhouse", 3, false),
            outcome(false, "html", 0, false),
        ]);
        tracker.complete(&job_id, summary);

        let record = tracker.get(&job_id).unwrap();
        assert_eq!(record.status, CrawlJobStatus::Completed);
        let summary = record.summary.unwrap();
        assert_eq!(summary.successful_companies, 2);
        assert_eq!(summary.failed_companies, 1);
        assert_eq!(summary.total_jobs_found, 15);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.api_hits, 1);
    }

    #[test]
    fn failed_jobs_keep_the_error() {
        let tracker = CrawlJobTracker::new();
        let job_id = tracker.create(1);
        tracker.fail(&job_id, "database pool unavailable".to_string());

        let record = tracker.get(&job_id).unwrap();
        assert_eq!(record.status, CrawlJobStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("database pool unavailable"));
    }

    #[test]
    fn unknown_job_is_none() {
        let tracker = CrawlJobTracker::new();
        assert!(tracker.get("missing").is_none());
    }

    #[test]
    fn job_ids_are_unique_hex() {
        let tracker = CrawlJobTracker::new();
        let a = tracker.create(1);
        let b = tracker.create(1);
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
