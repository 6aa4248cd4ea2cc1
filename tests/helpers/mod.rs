use chrono::{DateTime, Utc};
use jobwatch::data::models::JobPosting;
use sqlx::PgPool;

/// Insert a company row directly, returning its id.
pub async fn insert_company(pool: &PgPool, name: &str, career_url: &str) -> i32 {
    let (company_id,): (i32,) = sqlx::query_as(
        "INSERT INTO companies (name, career_page_url) VALUES ($1, $2) RETURNING company_id",
    )
    .bind(name)
    .bind(career_url)
    .fetch_one(pool)
    .await
    .expect("insert_company failed");
    company_id
}

/// Give a company `count` distinct subscribers.
pub async fn subscribe_users(pool: &PgPool, company_id: i32, count: usize) {
    for _ in 0..count {
        sqlx::query(
            "INSERT INTO company_subscriptions (user_id, company_id) VALUES (gen_random_uuid(), $1)",
        )
        .bind(company_id)
        .execute(pool)
        .await
        .expect("subscribe_users failed");
    }
}

/// Insert a cache row expiring `expires_in_secs` seconds from now (negative
/// values produce an already-expired entry).
pub async fn insert_cache_entry(
    pool: &PgPool,
    company_id: i32,
    job_count: i32,
    expires_in_secs: f64,
) {
    sqlx::query(
        "INSERT INTO job_cache (company_id, jobs, job_count, crawled_at, expires_at)
         VALUES ($1, '[]'::jsonb, $2, NOW(), NOW() + make_interval(secs => $3))",
    )
    .bind(company_id)
    .bind(job_count)
    .bind(expires_in_secs)
    .execute(pool)
    .await
    .expect("insert_cache_entry failed");
}

/// Mark a company as crawled at the given timestamp.
pub async fn set_last_crawled(pool: &PgPool, company_id: i32, at: DateTime<Utc>) {
    sqlx::query("UPDATE companies SET last_crawled = $2 WHERE company_id = $1")
        .bind(company_id)
        .bind(at)
        .execute(pool)
        .await
        .expect("set_last_crawled failed");
}

/// Build a test posting with title and location set; callers mutate the rest.
pub fn make_posting(title: &str, location: &str) -> JobPosting {
    let mut posting = JobPosting::new(title);
    posting.location = Some(location.to_string());
    posting.description = Some(format!("{title} description"));
    posting.application_url = Some(format!("https://acme.example/apply/{title}"));
    posting
}
