//! Live integration tests using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness from the crate's `migrations/` directory.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use fanscope::data::models::JobStatus;
use fanscope::data::unsigned::Count;
use fanscope::data::{profiles, scrape_jobs};
use fanscope::fans::{FansApiError, MockFansClient, ProfileData, ProfileFetcher, ProfileSource};
use fanscope::scraper::ScrapeOrchestrator;
use fanscope::scraper::scheduler::run_high_engagement_sweep;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sample_profile(username: &str) -> ProfileData {
    ProfileData {
        username: username.to_owned(),
        name: Some("Alice Example".to_owned()),
        bio: Some("Fitness and travel content".to_owned()),
        avatar_url: Some(format!("https://cdn.example.com/{username}.jpg")),
        cover_url: None,
        posts_count: Count::new(120),
        photos_count: Count::new(200),
        videos_count: Count::new(40),
        likes_count: Count::new(5_000),
        followers_count: Count::new(1_200),
        social_links: Some(
            [(
                "instagram".to_owned(),
                format!("https://instagram.com/{username}"),
            )]
            .into_iter()
            .collect(),
        ),
        last_post_at: None,
        tags: vec!["fitness".to_owned(), "travel".to_owned()],
        is_verified: true,
    }
}

/// Always returns a fixed snapshot.
struct FixedSource(ProfileData);

#[async_trait]
impl ProfileSource for FixedSource {
    async fn fetch_profile(&self, _username: &str) -> Result<ProfileData, FansApiError> {
        Ok(self.0.clone())
    }
}

/// Always reports the profile as nonexistent.
struct NotFoundSource;

#[async_trait]
impl ProfileSource for NotFoundSource {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, FansApiError> {
        Err(FansApiError::NotFound {
            username: username.to_owned(),
        })
    }
}

/// Never completes within a test's lifetime; keeps jobs in flight.
struct StallSource;

#[async_trait]
impl ProfileSource for StallSource {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, FansApiError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(FansApiError::NotFound {
            username: username.to_owned(),
        })
    }
}

/// Fails with a server error a fixed number of times, then succeeds.
struct FlakySource {
    failures_left: AtomicU32,
    data: ProfileData,
}

#[async_trait]
impl ProfileSource for FlakySource {
    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, FansApiError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(FansApiError::BadStatus {
                status: 502,
                username: username.to_owned(),
            });
        }
        Ok(self.data.clone())
    }
}

fn orchestrator_with(pool: &PgPool, source: Arc<dyn ProfileSource>) -> ScrapeOrchestrator {
    ScrapeOrchestrator::new(pool.clone(), Arc::new(ProfileFetcher::new(source)))
}

/// Poll the ledger until the entry reaches `expected`, or panic after ~5s.
async fn wait_for_status(pool: &PgPool, job_id: i32, expected: JobStatus) {
    for _ in 0..100 {
        let job = scrape_jobs::get(pool, job_id)
            .await
            .expect("status query failed")
            .expect("job should exist");
        if job.status == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {job_id} never reached {expected}");
}

async fn job_count_for(pool: &PgPool, username: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM scrape_jobs WHERE username = $1")
        .bind(username)
        .fetch_one(pool)
        .await
        .expect("count query failed")
}

// ---------------------------------------------------------------------------
// Snapshot store
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn commit_is_idempotent_on_field_values(pool: PgPool) {
    let data = sample_profile("alice");

    let first = profiles::commit_snapshot(&pool, &data).await.unwrap();
    let second = profiles::commit_snapshot(&pool, &data).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.username, second.username);
    assert_eq!(first.name, second.name);
    assert_eq!(first.bio, second.bio);
    assert_eq!(first.likes_count, second.likes_count);
    assert_eq!(first.followers_count, second.followers_count);
    assert_eq!(first.is_verified, second.is_verified);
    assert!(second.last_scraped_at.unwrap() >= first.last_scraped_at.unwrap());

    let (_, tags) = profiles::get_with_tags(&pool, "alice").await.unwrap().unwrap();
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["fitness", "travel"]);
}

#[sqlx::test]
async fn tag_sync_is_a_full_replacement(pool: PgPool) {
    let mut data = sample_profile("alice");
    data.tags = vec!["a".to_owned(), "b".to_owned()];
    profiles::commit_snapshot(&pool, &data).await.unwrap();

    data.tags = vec!["b".to_owned(), "c".to_owned()];
    profiles::commit_snapshot(&pool, &data).await.unwrap();

    let (_, tags) = profiles::get_with_tags(&pool, "alice").await.unwrap().unwrap();
    let mut names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["b", "c"]);

    // Detached tags survive as rows; only the association is gone.
    let tag_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tag_count, 3);
}

#[sqlx::test]
async fn empty_tag_list_detaches_everything(pool: PgPool) {
    let mut data = sample_profile("alice");
    profiles::commit_snapshot(&pool, &data).await.unwrap();

    data.tags = vec![];
    profiles::commit_snapshot(&pool, &data).await.unwrap();

    let (_, tags) = profiles::get_with_tags(&pool, "alice").await.unwrap().unwrap();
    assert!(tags.is_empty());
}

#[sqlx::test]
async fn search_matches_username_name_and_bio(pool: PgPool) {
    profiles::commit_snapshot(&pool, &sample_profile("alice")).await.unwrap();

    let mut other = sample_profile("bob_smith");
    other.name = Some("Bob Smith".to_owned());
    other.bio = Some("Photography and gym life".to_owned());
    profiles::commit_snapshot(&pool, &other).await.unwrap();

    let by_username = profiles::search(&pool, "bob", 50).await.unwrap();
    assert_eq!(by_username.len(), 1);
    assert_eq!(by_username[0].username, "bob_smith");

    let by_bio = profiles::search(&pool, "photography", 50).await.unwrap();
    assert_eq!(by_bio.len(), 1);

    let by_name = profiles::search(&pool, "Alice Ex", 50).await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].username, "alice");

    // LIKE metacharacters match literally, not as wildcards
    assert!(profiles::search(&pool, "b_b", 50).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn requests_coalesce_while_a_job_is_in_flight(pool: PgPool) {
    let orchestrator = orchestrator_with(&pool, Arc::new(StallSource));

    let first = orchestrator.request_scrape("alice").await.unwrap();
    assert!(!first.coalesced);

    let second = orchestrator.request_scrape("alice").await.unwrap();
    assert!(second.coalesced);
    assert_eq!(first.job_id, second.job_id);

    assert_eq!(job_count_for(&pool, "alice").await, 1);
}

#[sqlx::test]
async fn completed_jobs_do_not_absorb_new_requests(pool: PgPool) {
    let orchestrator = orchestrator_with(&pool, Arc::new(FixedSource(sample_profile("alice"))));

    let first = orchestrator.request_scrape("alice").await.unwrap();
    wait_for_status(&pool, first.job_id, JobStatus::Completed).await;

    let second = orchestrator.request_scrape("alice").await.unwrap();
    assert!(!second.coalesced);
    assert_ne!(first.job_id, second.job_id);
    assert_eq!(job_count_for(&pool, "alice").await, 2);
}

#[sqlx::test]
async fn failed_fetch_records_error_without_a_profile_row(pool: PgPool) {
    let orchestrator = orchestrator_with(&pool, Arc::new(NotFoundSource));

    let outcome = orchestrator.request_scrape("ghost").await.unwrap();
    wait_for_status(&pool, outcome.job_id, JobStatus::Failed).await;

    let job = scrape_jobs::get(&pool, outcome.job_id).await.unwrap().unwrap();
    assert!(!job.error_message.unwrap().is_empty());

    let profile_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(profile_count, 0);

    // An absence is terminal: exactly one attempt, no retries.
    assert_eq!(job_count_for(&pool, "ghost").await, 1);
}

#[sqlx::test]
async fn scrape_completes_and_stamps_last_scraped_at(pool: PgPool) {
    let orchestrator = orchestrator_with(&pool, Arc::new(FixedSource(sample_profile("alice"))));

    let outcome = orchestrator.request_scrape("alice").await.unwrap();
    wait_for_status(&pool, outcome.job_id, JobStatus::Completed).await;

    let (profile, tags) = profiles::get_with_tags(&pool, "alice").await.unwrap().unwrap();
    assert!(profile.last_scraped_at.is_some());
    assert_eq!(profile.likes_count.get(), 5_000);
    assert_eq!(profile.followers_count.get(), 1_200);
    assert_eq!(tags.len(), 2);
}

#[sqlx::test]
async fn transient_failures_are_retried_to_success(pool: PgPool) {
    let source = Arc::new(FlakySource {
        failures_left: AtomicU32::new(2),
        data: sample_profile("alice"),
    });
    let orchestrator = orchestrator_with(&pool, source);

    let outcome = orchestrator.request_scrape("alice").await.unwrap();
    wait_for_status(&pool, outcome.job_id, JobStatus::Completed).await;

    let profile = profiles::get_with_tags(&pool, "alice").await.unwrap();
    assert!(profile.is_some());
}

#[sqlx::test]
async fn exhausted_retries_leave_a_terminal_failure(pool: PgPool) {
    // More failures than the attempt budget: the job must end failed with
    // the last error message recorded.
    let source = Arc::new(FlakySource {
        failures_left: AtomicU32::new(10),
        data: sample_profile("alice"),
    });
    let orchestrator = orchestrator_with(&pool, source);

    let outcome = orchestrator.request_scrape("alice").await.unwrap();
    wait_for_status(&pool, outcome.job_id, JobStatus::Failed).await;

    // Give the executor a moment to prove it stays failed (no further flips
    // back to processing).
    tokio::time::sleep(Duration::from_millis(200)).await;
    let job = scrape_jobs::get(&pool, outcome.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().contains("502"));
}

#[sqlx::test]
async fn invalid_usernames_are_rejected_before_any_ledger_write(pool: PgPool) {
    let orchestrator = orchestrator_with(&pool, Arc::new(NotFoundSource));

    assert!(orchestrator.request_scrape("").await.is_err());
    assert!(orchestrator.request_scrape(&"x".repeat(101)).await.is_err());

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scrape_jobs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn unknown_job_ids_read_as_not_found(pool: PgPool) {
    assert!(scrape_jobs::get(&pool, 999_999).await.unwrap().is_none());
}

#[sqlx::test]
async fn stale_in_flight_entries_stop_blocking_new_requests(pool: PgPool) {
    let stuck = scrape_jobs::create_pending(&pool, "alice").await.unwrap();
    sqlx::query("UPDATE scrape_jobs SET updated_at = now() - interval '20 minutes' WHERE id = $1")
        .bind(stuck.id)
        .execute(&pool)
        .await
        .unwrap();

    let found = scrape_jobs::find_in_flight(&pool, "alice", Duration::from_secs(15 * 60))
        .await
        .unwrap();
    assert!(found.is_none());

    let orchestrator = orchestrator_with(&pool, Arc::new(StallSource));
    let outcome = orchestrator.request_scrape("alice").await.unwrap();
    assert!(!outcome.coalesced);
    assert_ne!(outcome.job_id, stuck.id);
}

// ---------------------------------------------------------------------------
// Sweeps
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn repeated_sweeps_are_harmless_under_dedup(pool: PgPool) {
    // A high-engagement profile that has never been scraped.
    sqlx::query("INSERT INTO profiles (username, likes_count) VALUES ($1, $2)")
        .bind("famous")
        .bind(250_000)
        .execute(&pool)
        .await
        .unwrap();

    let orchestrator = orchestrator_with(&pool, Arc::new(StallSource));

    run_high_engagement_sweep(&pool, &orchestrator).await;
    run_high_engagement_sweep(&pool, &orchestrator).await;

    // The second sweep coalesced into the still-in-flight job.
    assert_eq!(job_count_for(&pool, "famous").await, 1);
}

#[sqlx::test]
async fn sweeps_ignore_fresh_and_other_tier_profiles(pool: PgPool) {
    // Fresh high-engagement profile: scraped just now.
    sqlx::query(
        "INSERT INTO profiles (username, likes_count, last_scraped_at) VALUES ($1, $2, now())",
    )
    .bind("fresh_famous")
    .bind(250_000)
    .execute(&pool)
    .await
    .unwrap();

    // Stale but regular-tier profile: not the high sweep's business.
    sqlx::query("INSERT INTO profiles (username, likes_count) VALUES ($1, $2)")
        .bind("smalltimer")
        .bind(500)
        .execute(&pool)
        .await
        .unwrap();

    let orchestrator = orchestrator_with(&pool, Arc::new(StallSource));
    run_high_engagement_sweep(&pool, &orchestrator).await;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scrape_jobs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

// ---------------------------------------------------------------------------
// Fetch pipeline against the mock source
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn mock_source_drives_the_full_pipeline(pool: PgPool) {
    let orchestrator = orchestrator_with(&pool, Arc::new(MockFansClient::new()));

    let outcome = orchestrator.request_scrape("emma_rose").await.unwrap();
    wait_for_status(&pool, outcome.job_id, JobStatus::Completed).await;

    let (profile, tags) = profiles::get_with_tags(&pool, "emma_rose")
        .await
        .unwrap()
        .unwrap();
    assert!(profile.followers_count.get() >= 1_000);
    assert!(!tags.is_empty());
    assert!(profile.last_scraped_at.is_some());
}
