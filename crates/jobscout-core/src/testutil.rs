//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! Shared state sits behind `Arc<Mutex<_>>` or atomics so tests can assert
//! on recorded calls after handing a clone to the code under test.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;
use crate::manager::ScrapeContext;
use crate::models::JobRecord;
use crate::traits::{JobSink, PageFetcher, PageResponse, Scraper};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MockReply {
    Page(u16, String),
    Status(u16),
    Network(String),
}

#[derive(Debug)]
struct MockRoute {
    pattern: String,
    reply: MockReply,
    /// `None` means the route answers forever.
    remaining: Option<usize>,
}

/// Mock page fetcher routing requests by URL substring.
///
/// Routes are matched in registration order; a request matching no live
/// route gets `HttpStatus { status: 404 }`.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<Vec<MockRoute>>>,
    requests: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, pattern: &str, reply: MockReply, remaining: Option<usize>) -> Self {
        self.routes.lock().unwrap().push(MockRoute {
            pattern: pattern.to_string(),
            reply,
            remaining,
        });
        self
    }

    /// Answer every URL containing `pattern` with a 200 and `body`.
    pub fn route(self, pattern: &str, body: &str) -> Self {
        self.push(pattern, MockReply::Page(200, body.to_string()), None)
    }

    /// Answer the next matching request only.
    pub fn route_once(self, pattern: &str, body: &str) -> Self {
        self.push(pattern, MockReply::Page(200, body.to_string()), Some(1))
    }

    /// Fail every matching request with `HttpStatus { status }`.
    pub fn route_status(self, pattern: &str, status: u16) -> Self {
        self.push(pattern, MockReply::Status(status), None)
    }

    /// Fail every matching request with a network error.
    pub fn route_error(self, pattern: &str, message: &str) -> Self {
        self.push(pattern, MockReply::Network(message.to_string()), None)
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, pattern: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl PageFetcher for MockFetcher {
    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<PageResponse, AppError> {
        self.requests.lock().unwrap().push(url.to_string());

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            routes
                .iter_mut()
                .find(|r| url.contains(&r.pattern) && r.remaining != Some(0))
                .map(|r| {
                    if let Some(n) = r.remaining.as_mut() {
                        *n -= 1;
                    }
                    r.reply.clone()
                })
        };

        match reply {
            Some(MockReply::Page(status, body)) => Ok(PageResponse { status, body }),
            Some(MockReply::Status(status)) => Err(AppError::HttpStatus {
                status,
                url: url.to_string(),
            }),
            Some(MockReply::Network(message)) => Err(AppError::NetworkError(message)),
            None => Err(AppError::HttpStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MockOutcome {
    Jobs(Vec<JobRecord>),
    Error(String),
    Panic,
}

/// Mock scraper with a fixed outcome and optional simulated work.
#[derive(Debug, Clone)]
pub struct MockScraper {
    name: String,
    outcome: MockOutcome,
    steps: usize,
    step_delay: Duration,
    calls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MockScraper {
    /// Creates a scraper that succeeds with no jobs.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: MockOutcome::Jobs(Vec::new()),
            steps: 0,
            step_delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_jobs(mut self, jobs: Vec<JobRecord>) -> Self {
        self.outcome = MockOutcome::Jobs(jobs);
        self
    }

    /// Fail with `AppError::Generic(message)`.
    pub fn failing(mut self, message: &str) -> Self {
        self.outcome = MockOutcome::Error(message.to_string());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.outcome = MockOutcome::Panic;
        self
    }

    /// Take `steps` progress steps, sleeping `delay` before each one.
    /// Stops early when the run is cancelled.
    pub fn with_steps(mut self, steps: usize, delay: Duration) -> Self {
        self.steps = steps;
        self.step_delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scraper for MockScraper {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self, ctx: &ScrapeContext) -> Result<Vec<JobRecord>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.set_total(self.steps);
        for _ in 0..self.steps {
            if ctx.is_cancelled() {
                break;
            }
            ctx.sleep(self.step_delay).await;
            ctx.advance();
        }

        match &self.outcome {
            MockOutcome::Jobs(jobs) => Ok(jobs.clone()),
            MockOutcome::Error(message) => Err(AppError::Generic(message.clone())),
            MockOutcome::Panic => panic!("mock scraper {} panicked", self.name),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// FailingSink
// ---------------------------------------------------------------------------

/// JobSink whose every upsert fails, counting attempts.
#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl JobSink for FailingSink {
    async fn upsert(&self, _job: &JobRecord) -> Result<bool, AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::DatabaseError("connection refused".into()))
    }
}
