use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::AppError;
use crate::manager::ScrapeContext;
use crate::models::JobRecord;

/// Status code and body text of a successful GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// Throttled, retrying GET primitive used by scrapers.
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` with the extra request headers.
    ///
    /// Any status >= 400 surfaces as [`AppError::HttpStatus`] once retries
    /// are exhausted.
    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<PageResponse, AppError>> + Send;

    /// Release the underlying connection pool.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// One job-listing source.
///
/// Implementations only produce records; status bookkeeping, error
/// containment and persistence belong to the manager.
#[async_trait]
pub trait Scraper: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch and parse listings. Cancellation and progress go through `ctx`.
    async fn scrape(&self, ctx: &ScrapeContext) -> Result<Vec<JobRecord>, AppError>;

    /// Release network resources. Called after every run, whatever its outcome.
    async fn close(&self) {}
}

/// Persistence collaborator for discovered jobs.
pub trait JobSink: Send + Sync + Clone + 'static {
    /// Store a job keyed by its URL.
    ///
    /// Returns `false` when the URL was already known (the job is skipped,
    /// never overwritten).
    fn upsert(&self, job: &JobRecord) -> impl Future<Output = Result<bool, AppError>> + Send;
}

/// URL → follower-count cache used by the LinkedIn company gate.
pub trait FollowerStore: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<Option<u64>, AppError>> + Send;

    fn set(&self, url: &str, count: u64) -> impl Future<Output = Result<(), AppError>> + Send;

    fn contains(&self, url: &str) -> impl Future<Output = Result<bool, AppError>> + Send {
        async move { Ok(self.get(url).await?.is_some()) }
    }
}

/// A no-op JobSink for use when persistence is not needed.
#[derive(Debug, Clone)]
pub struct NullSink;

impl JobSink for NullSink {
    async fn upsert(&self, _job: &JobRecord) -> Result<bool, AppError> {
        Ok(true)
    }
}

/// In-memory JobSink that keeps the first record seen for each URL.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

#[derive(Debug, Default)]
struct MemorySinkInner {
    seen: HashSet<String>,
    jobs: Vec<JobRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored jobs in insertion order.
    pub fn jobs(&self) -> Vec<JobRecord> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .jobs
            .clone()
    }
}

impl JobSink for MemorySink {
    async fn upsert(&self, job: &JobRecord) -> Result<bool, AppError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !inner.seen.insert(job.url.clone()) {
            return Ok(false);
        }
        inner.jobs.push(job.clone());
        Ok(true)
    }
}
