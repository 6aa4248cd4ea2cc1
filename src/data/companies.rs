//! Company table operations.

use crate::data::models::Company;
use crate::error::Result;
use sqlx::PgPool;
use tracing::debug;

/// Insert a company, or refresh its name (and provider tag, when known) if the
/// career URL already exists. Returns the company id either way.
pub async fn upsert(
    pool: &PgPool,
    name: &str,
    career_page_url: &str,
    ats_provider: Option<&str>,
) -> Result<i32> {
    let (company_id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO companies (name, career_page_url, ats_provider)
        VALUES ($1, $2, $3)
        ON CONFLICT (career_page_url)
        DO UPDATE SET
            name = EXCLUDED.name,
            ats_provider = COALESCE(EXCLUDED.ats_provider, companies.ats_provider),
            updated_at = NOW()
        RETURNING company_id
        "#,
    )
    .bind(name)
    .bind(career_page_url)
    .bind(ats_provider)
    .fetch_one(pool)
    .await?;

    debug!(company = name, company_id, "company upserted");
    Ok(company_id)
}

pub async fn get_by_url(pool: &PgPool, career_page_url: &str) -> Result<Option<Company>> {
    let company = sqlx::query_as::<_, Company>(
        "SELECT company_id, name, career_page_url, ats_provider, last_crawled
         FROM companies WHERE career_page_url = $1",
    )
    .bind(career_page_url)
    .fetch_optional(pool)
    .await?;
    Ok(company)
}

/// Record a successful crawl.
pub async fn touch_crawl_time(pool: &PgPool, company_id: i32) -> Result<()> {
    sqlx::query("UPDATE companies SET last_crawled = NOW(), updated_at = NOW() WHERE company_id = $1")
        .bind(company_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist a provider tag detected after the company row was created.
pub async fn set_provider(pool: &PgPool, company_id: i32, ats_provider: &str) -> Result<()> {
    sqlx::query("UPDATE companies SET ats_provider = $2, updated_at = NOW() WHERE company_id = $1")
        .bind(company_id)
        .bind(ats_provider)
        .execute(pool)
        .await?;
    Ok(())
}
