use chrono::{TimeZone, Utc};
use jobscout_core::models::{JobRecord, JobSource};
use jobscout_core::traits::JobSink;

use crate::integration::common::setup_test_db;

fn linkedin_job(url: &str) -> JobRecord {
    let mut job = JobRecord::new("Backend Intern", "Acme", url, JobSource::LinkedIn)
        .with_location("Austin, TX")
        .with_posted_at(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        .with_follower_count(1_200_000);
    job.actively_hiring = true;
    job
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn insert_and_read_back() {
    let (db, _container) = setup_test_db().await;
    let repo = db.job_repo();

    assert!(repo.insert(&linkedin_job("https://x.test/jobs/1")).await.unwrap());

    let stored = repo.recent(10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].id.is_nil());
    assert_eq!(stored[0].job, linkedin_job("https://x.test/jobs/1"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn duplicate_url_is_skipped_not_overwritten() {
    let (db, _container) = setup_test_db().await;
    let repo = db.job_repo();

    let first = linkedin_job("https://x.test/jobs/dup");
    let mut second = first.clone();
    second.title = "Renamed".into();

    assert!(repo.upsert(&first).await.unwrap());
    assert!(!repo.upsert(&second).await.unwrap());

    assert_eq!(repo.count().await.unwrap(), 1);
    let stored = repo.recent(10).await.unwrap();
    assert_eq!(stored[0].job.title, "Backend Intern");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn recent_respects_limit_and_order() {
    let (db, _container) = setup_test_db().await;
    let repo = db.job_repo();

    for i in 0..5 {
        let job = JobRecord::new("Intern", "Globex", format!("https://x.test/jobs/{i}"), JobSource::GitHub);
        repo.insert(&job).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let stored = repo.recent(3).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].job.url, "https://x.test/jobs/4");
    assert_eq!(stored[0].job.follower_count, None);
    assert!(repo.exists("https://x.test/jobs/0").await.unwrap());
    assert!(!repo.exists("https://x.test/jobs/99").await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn health_check_succeeds() {
    let (db, _container) = setup_test_db().await;
    db.health_check().await.unwrap();
}
