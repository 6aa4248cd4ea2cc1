#[allow(dead_code)]
mod helpers;

use jobwatch::data::{companies, jobs};
use sqlx::PgPool;

// ── company upsert ──────────────────────────────────────────────────

#[sqlx::test]
async fn company_upsert_is_idempotent_on_career_url(pool: PgPool) {
    let first = companies::upsert(&pool, "Acme", "https://acme.example/careers", None)
        .await
        .unwrap();
    let second = companies::upsert(&pool, "Acme Inc", "https://acme.example/careers", None)
        .await
        .unwrap();

    assert_eq!(first, second);

    let company = companies::get_by_url(&pool, "https://acme.example/careers")
        .await
        .unwrap()
        .expect("company should exist");
    assert_eq!(company.name, "Acme Inc");
}

#[sqlx::test]
async fn company_upsert_keeps_known_provider_tag(pool: PgPool) {
    let id = companies::upsert(
        &pool,
        "Acme",
        "https://boards.greenhouse.io/acme",
        Some("greenhouse"),
    )
    .await
    .unwrap();

    // A later upsert without a tag must not erase the detected one
    companies::upsert(&pool, "Acme", "https://boards.greenhouse.io/acme", None)
        .await
        .unwrap();

    let company = companies::get_by_url(&pool, "https://boards.greenhouse.io/acme")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(company.company_id, id);
    assert_eq!(company.ats_provider.as_deref(), Some("greenhouse"));
}

#[sqlx::test]
async fn touch_crawl_time_sets_last_crawled(pool: PgPool) {
    let id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;
    companies::touch_crawl_time(&pool, id).await.unwrap();

    let company = companies::get_by_url(&pool, "https://acme.example/careers")
        .await
        .unwrap()
        .unwrap();
    assert!(company.last_crawled.is_some());
}

// ── job upsert ──────────────────────────────────────────────────────

#[sqlx::test]
async fn job_upsert_twice_yields_one_row_with_refreshed_fields(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;

    let mut posting = helpers::make_posting("Platform Engineer", "Berlin");
    let first_id = jobs::upsert(&pool, company_id, &posting).await.unwrap();

    posting.description = Some("Updated description".to_string());
    let second_id = jobs::upsert(&pool, company_id, &posting).await.unwrap();
    assert_eq!(first_id, second_id);

    let rows = jobs::active_for_company(&pool, company_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].description.as_deref(), Some("Updated description"));
    assert!(rows[0].is_active);
}

#[sqlx::test]
async fn job_upsert_reactivates_inactive_rows(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;
    let posting = helpers::make_posting("Platform Engineer", "Berlin");

    let job_id = jobs::upsert(&pool, company_id, &posting).await.unwrap();

    sqlx::query("UPDATE jobs SET is_active = FALSE WHERE job_id = $1")
        .bind(job_id)
        .execute(&pool)
        .await
        .unwrap();

    jobs::upsert(&pool, company_id, &posting).await.unwrap();
    let rows = jobs::active_for_company(&pool, company_id).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[sqlx::test]
async fn distinct_locations_are_distinct_jobs(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;

    jobs::upsert(&pool, company_id, &helpers::make_posting("Engineer", "Berlin"))
        .await
        .unwrap();
    jobs::upsert(&pool, company_id, &helpers::make_posting("Engineer", "Lisbon"))
        .await
        .unwrap();

    let rows = jobs::active_for_company(&pool, company_id).await.unwrap();
    assert_eq!(rows.len(), 2);
}

// ── mark_inactive_except ────────────────────────────────────────────

#[sqlx::test]
async fn jobs_not_in_fresh_set_go_inactive(pool: PgPool) {
    let company_id = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;

    let kept = jobs::upsert(&pool, company_id, &helpers::make_posting("Engineer", "Berlin"))
        .await
        .unwrap();
    let dropped = jobs::upsert(&pool, company_id, &helpers::make_posting("Designer", "Lisbon"))
        .await
        .unwrap();

    let pruned = jobs::mark_inactive_except(&pool, company_id, &[kept])
        .await
        .unwrap();
    assert_eq!(pruned, 1);

    let active = jobs::active_for_company(&pool, company_id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].job_id, kept);

    let (is_active,): (bool,) = sqlx::query_as("SELECT is_active FROM jobs WHERE job_id = $1")
        .bind(dropped)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!is_active);
}

#[sqlx::test]
async fn pruning_is_scoped_to_one_company(pool: PgPool) {
    let acme = helpers::insert_company(&pool, "Acme", "https://acme.example/careers").await;
    let other = helpers::insert_company(&pool, "Other", "https://other.example/careers").await;

    jobs::upsert(&pool, acme, &helpers::make_posting("Engineer", "Berlin"))
        .await
        .unwrap();
    let other_job = jobs::upsert(&pool, other, &helpers::make_posting("Engineer", "Berlin"))
        .await
        .unwrap();

    jobs::mark_inactive_except(&pool, acme, &[]).await.unwrap();

    let other_active = jobs::active_for_company(&pool, other).await.unwrap();
    assert_eq!(other_active.len(), 1);
    assert_eq!(other_active[0].job_id, other_job);
}
