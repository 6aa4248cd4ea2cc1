//! TTL-bounded job cache, one row per company.

use crate::data::models::{CacheEntry, JobPosting};
use crate::error::Result;
use sqlx::PgPool;
use std::time::Duration;
use tracing::debug;

const CACHE_COLUMNS: &str = "company_id, jobs, job_count, crawled_at, expires_at, ats_provider, \
                             crawl_duration_ms";

/// Fetch the cache row for a company iff it has not expired.
pub async fn get_cached(pool: &PgPool, company_id: i32) -> Result<Option<CacheEntry>> {
    let entry = sqlx::query_as::<_, CacheEntry>(&format!(
        "SELECT {CACHE_COLUMNS} FROM job_cache
         WHERE company_id = $1 AND expires_at > NOW()"
    ))
    .bind(company_id)
    .fetch_optional(pool)
    .await?;

    if let Some(ref entry) = entry {
        debug!(company_id, job_count = entry.job_count, "cache hit");
    }
    Ok(entry)
}

/// Idempotent cache write-through: replaces the company's entry and advances
/// `expires_at` to `now + ttl`.
pub async fn update(
    pool: &PgPool,
    company_id: i32,
    jobs: &[JobPosting],
    ats_provider: &str,
    duration_ms: i32,
    ttl: Duration,
) -> Result<()> {
    let jobs_json = serde_json::to_value(jobs)?;

    sqlx::query(
        r#"
        INSERT INTO job_cache (company_id, jobs, job_count, crawled_at, expires_at, ats_provider, crawl_duration_ms)
        VALUES ($1, $2, $3, NOW(), NOW() + make_interval(secs => $4), $5, $6)
        ON CONFLICT (company_id)
        DO UPDATE SET
            jobs = EXCLUDED.jobs,
            job_count = EXCLUDED.job_count,
            crawled_at = EXCLUDED.crawled_at,
            expires_at = EXCLUDED.expires_at,
            ats_provider = EXCLUDED.ats_provider,
            crawl_duration_ms = EXCLUDED.crawl_duration_ms,
            updated_at = NOW()
        "#,
    )
    .bind(company_id)
    .bind(&jobs_json)
    .bind(jobs.len() as i32)
    .bind(ttl.as_secs_f64())
    .bind(ats_provider)
    .bind(duration_ms)
    .execute(pool)
    .await?;

    debug!(
        company_id,
        job_count = jobs.len(),
        ttl = format!("{ttl:.0?}"),
        "cache updated"
    );
    Ok(())
}

/// Decode the serialized job list from a cache entry.
pub fn decode_jobs(entry: &CacheEntry) -> Result<Vec<JobPosting>> {
    Ok(serde_json::from_value(entry.jobs.clone())?)
}
