//! Job table operations.
//!
//! Jobs are unique per `(company_id, title, location)`; an upsert refreshes
//! the mutable fields and re-activates the row. Postings not refreshed in a
//! crawl pass are flipped inactive via [`mark_inactive_except`].

use crate::data::models::{JobPosting, JobRow};
use crate::error::Result;
use sqlx::PgPool;
use tracing::debug;

const JOB_COLUMNS: &str = "job_id, company_id, title, description, requirements, location, \
                           application_url, posted_date, scraped_at, is_active";

/// Idempotent upsert keyed on `(company_id, title, location)`. Returns the
/// job id.
pub async fn upsert(pool: &PgPool, company_id: i32, job: &JobPosting) -> Result<i32> {
    let (job_id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO jobs (
            company_id, title, description, requirements,
            location, application_url, posted_date, scraped_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (company_id, title, location)
        DO UPDATE SET
            description = EXCLUDED.description,
            requirements = EXCLUDED.requirements,
            application_url = EXCLUDED.application_url,
            posted_date = EXCLUDED.posted_date,
            scraped_at = EXCLUDED.scraped_at,
            is_active = TRUE,
            updated_at = NOW()
        RETURNING job_id
        "#,
    )
    .bind(company_id)
    .bind(&job.title)
    .bind(&job.description)
    .bind(&job.requirements)
    .bind(&job.location)
    .bind(&job.application_url)
    .bind(job.posted_date)
    .fetch_one(pool)
    .await?;

    debug!(title = %job.title, job_id, "job upserted");
    Ok(job_id)
}

/// Deactivate every active job of the company whose id is not in `fresh_ids`.
///
/// Called once per successful HTML pass with the ids touched by that pass.
/// Returns the number of rows deactivated.
pub async fn mark_inactive_except(
    pool: &PgPool,
    company_id: i32,
    fresh_ids: &[i32],
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE jobs SET is_active = FALSE, updated_at = NOW()
         WHERE company_id = $1 AND is_active = TRUE AND job_id != ALL($2::int4[])",
    )
    .bind(company_id)
    .bind(fresh_ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// All active jobs for a company, newest scrape first.
pub async fn active_for_company(pool: &PgPool, company_id: i32) -> Result<Vec<JobRow>> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs
         WHERE company_id = $1 AND is_active = TRUE
         ORDER BY scraped_at DESC"
    ))
    .bind(company_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
