//! Smart crawl of a single company, and the bounded fan-out over many.
//!
//! Routing per company: cache probe → structured-API attempt → HTML fallback.
//! A worker never escalates: every failure is recorded in its outcome and the
//! batch continues.

use crate::ats;
use crate::data::models::JobPosting;
use crate::data::{cache, companies, jobs};
use crate::error::Result;
use crate::html::{GenericParser, JobFilter};
use crate::net::CrawlSession;
use crate::queue::QueueEntry;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// A company handed to the worker pool. The id is present when the target
/// came from the queue builder and absent for ad-hoc crawl requests.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub company_id: Option<i32>,
    pub name: String,
    pub career_url: String,
}

impl From<&QueueEntry> for CrawlTarget {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            company_id: Some(entry.company_id),
            name: entry.name.clone(),
            career_url: entry.career_url.clone(),
        }
    }
}

/// Per-company crawl result. `duration_ms` is populated even on failure.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    pub company_name: String,
    pub success: bool,
    pub jobs_found: usize,
    pub jobs_inserted: usize,
    pub method: String,
    pub cache_hit: bool,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl CrawlOutcome {
    fn started(company_name: &str) -> Self {
        Self {
            company_name: company_name.to_string(),
            success: false,
            jobs_found: 0,
            jobs_inserted: 0,
            method: "unknown".to_string(),
            cache_hit: false,
            duration_ms: 0,
            errors: Vec::new(),
        }
    }
}

/// Executes smart crawls against the shared session and database pool.
#[derive(Clone)]
pub struct Crawler {
    db_pool: PgPool,
    session: Arc<CrawlSession>,
    cache_ttl: Duration,
    max_concurrent: usize,
    filter: Option<JobFilter>,
}

impl Crawler {
    pub fn new(
        db_pool: PgPool,
        session: Arc<CrawlSession>,
        cache_ttl: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            db_pool,
            session,
            cache_ttl,
            max_concurrent,
            filter: None,
        }
    }

    /// Restrict scraped HTML records to those matching the filter.
    pub fn with_filter(mut self, filter: JobFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Crawl one company with smart routing. Never fails; errors accumulate
    /// into the outcome record.
    pub async fn crawl_company_smart(
        &self,
        target: &CrawlTarget,
        force_refresh: bool,
    ) -> CrawlOutcome {
        let start = Instant::now();
        let mut outcome = CrawlOutcome::started(&target.name);

        if let Err(e) = self
            .smart_crawl(target, force_refresh, start, &mut outcome)
            .await
        {
            let message = format!("error crawling {}: {e:#}", target.name);
            error!(company = %target.name, error = ?e, "smart crawl failed");
            outcome.errors.push(message);
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        outcome
    }

    async fn smart_crawl(
        &self,
        target: &CrawlTarget,
        force_refresh: bool,
        start: Instant,
        outcome: &mut CrawlOutcome,
    ) -> Result<()> {
        let company_id = match target.company_id {
            Some(id) => id,
            None => {
                companies::upsert(
                    &self.db_pool,
                    &target.name,
                    &target.career_url,
                    ats::detect_from_url(&target.career_url),
                )
                .await?
            }
        };

        // Step 1: cache probe
        if !force_refresh {
            if let Some(entry) = cache::get_cached(&self.db_pool, company_id).await? {
                outcome.success = true;
                outcome.jobs_found = entry.job_count as usize;
                outcome.jobs_inserted = entry.job_count as usize;
                outcome.method = "cache".to_string();
                outcome.cache_hit = true;
                info!(
                    company = %target.name,
                    jobs = entry.job_count,
                    "cache hit"
                );
                return Ok(());
            }
        }

        // Step 2: structured-API attempt. A provider answer is authoritative,
        // including an empty posting set.
        if let Some(fetch) =
            ats::fetch_jobs_via_api(self.session.fetcher.client(), &target.career_url).await
        {
            outcome.method = format!("api:{}", fetch.provider);
            outcome.jobs_found = fetch.jobs.len();

            for job in &fetch.jobs {
                match jobs::upsert(&self.db_pool, company_id, job).await {
                    Ok(_) => outcome.jobs_inserted += 1,
                    // Duplicate-key collisions are expected here; anything
                    // else is logged per job without failing the company
                    Err(e) => debug!(title = %job.title, error = %e, "job insert skipped"),
                }
            }

            cache::update(
                &self.db_pool,
                company_id,
                &fetch.jobs,
                fetch.provider,
                fetch.duration.as_millis() as i32,
                self.cache_ttl,
            )
            .await?;
            companies::touch_crawl_time(&self.db_pool, company_id).await?;

            outcome.success = true;
            info!(
                company = %target.name,
                provider = fetch.provider,
                jobs = fetch.jobs.len(),
                duration = format!("{:.2?}", fetch.duration),
                "crawled via provider API"
            );
            return Ok(());
        }

        // Step 3: HTML fallback
        debug!(company = %target.name, "falling back to HTML scraping");
        outcome.method = "html".to_string();
        self.crawl_company_html(company_id, target, start, outcome)
            .await
    }

    async fn crawl_company_html(
        &self,
        company_id: i32,
        target: &CrawlTarget,
        start: Instant,
        outcome: &mut CrawlOutcome,
    ) -> Result<()> {
        let html = self
            .session
            .get(&target.career_url)
            .await
            .ok_or_else(|| anyhow::anyhow!("failed to fetch career page: {}", target.career_url))?;

        let (provider_tag, confidence) = ats::detector::detect(&target.career_url, Some(&html));
        info!(company = %target.name, ats = provider_tag, confidence, "detected ATS");
        companies::set_provider(&self.db_pool, company_id, provider_tag).await?;

        let parser = GenericParser::new(self.session.clone(), self.filter.clone());
        let scraped = parser.scrape_company(&target.career_url).await;
        outcome.jobs_found = scraped.len();

        // A page with no postings is a successful crawl; the cache and crawl
        // time stay untouched and the next cycle retries
        if scraped.is_empty() {
            warn!(company = %target.name, "no jobs found");
            outcome.success = true;
            return Ok(());
        }

        let mut fresh_ids = Vec::new();
        for job in &scraped {
            match jobs::upsert(&self.db_pool, company_id, job).await {
                Ok(job_id) => {
                    fresh_ids.push(job_id);
                    outcome.jobs_inserted += 1;
                }
                Err(e) => {
                    let message = format!("error inserting job {}: {e}", job.title);
                    warn!(company = %target.name, error = %e, title = %job.title, "job insert failed");
                    outcome.errors.push(message);
                }
            }
        }

        // Postings that disappeared from the page go inactive
        if !fresh_ids.is_empty() {
            let pruned =
                jobs::mark_inactive_except(&self.db_pool, company_id, &fresh_ids).await?;
            if pruned > 0 {
                info!(company = %target.name, pruned, "stale jobs deactivated");
            }
        }

        // Cache from the active rows so refreshed fields serialize consistently
        let active = jobs::active_for_company(&self.db_pool, company_id).await?;
        let postings: Vec<JobPosting> = active.into_iter().map(Into::into).collect();
        cache::update(
            &self.db_pool,
            company_id,
            &postings,
            "html",
            start.elapsed().as_millis() as i32,
            self.cache_ttl,
        )
        .await?;
        companies::touch_crawl_time(&self.db_pool, company_id).await?;

        outcome.success = true;
        info!(
            company = %target.name,
            inserted = outcome.jobs_inserted,
            found = outcome.jobs_found,
            "HTML crawl complete"
        );
        Ok(())
    }

    /// Crawl many companies with bounded concurrency. Workers start in input
    /// order and complete in arbitrary order; results keep the input order.
    pub async fn crawl_companies(
        &self,
        targets: &[CrawlTarget],
        force_refresh: bool,
    ) -> Vec<CrawlOutcome> {
        info!(count = targets.len(), "crawling companies");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let futures = targets.iter().map(|target| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("crawler semaphore closed");
                self.crawl_company_smart(target, force_refresh).await
            }
        });

        let results = futures::future::join_all(futures).await;

        let successful = results.iter().filter(|r| r.success).count();
        let total_jobs: usize = results.iter().map(|r| r.jobs_inserted).sum();
        let cache_hits = results.iter().filter(|r| r.cache_hit).count();
        let api_hits = results
            .iter()
            .filter(|r| r.method.starts_with("api:"))
            .count();
        info!(
            successful,
            total = targets.len(),
            total_jobs,
            cache_hits,
            api_hits,
            "crawl batch complete"
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::CrawlPriority;

    #[test]
    fn target_from_queue_entry_keeps_company_id() {
        let entry = QueueEntry {
            company_id: 7,
            name: "Acme".to_string(),
            career_url: "https://acme.example/careers".to_string(),
            ats_provider: None,
            subscriber_count: 3,
            last_crawled: None,
            cache_expires_at: None,
            priority: CrawlPriority::Normal,
        };
        let target = CrawlTarget::from(&entry);
        assert_eq!(target.company_id, Some(7));
        assert_eq!(target.name, "Acme");
    }

    #[test]
    fn outcome_starts_unsuccessful_with_unknown_method() {
        let outcome = CrawlOutcome::started("Acme");
        assert!(!outcome.success);
        assert_eq!(outcome.method, "unknown");
        assert!(outcome.errors.is_empty());
    }
}
