use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{JobRecord, ManagerStatus, ScraperState, ScraperStatus};
use crate::traits::{JobSink, Scraper};

/// How the registered scrapers are driven within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One scraper after another, checking for cancellation in between.
    #[default]
    Sequential,
    /// All scrapers at once; results gathered in completion order.
    Concurrent,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "concurrent" => Ok(ExecutionMode::Concurrent),
            _ => Err(format!("Unknown execution mode: {}", s)),
        }
    }
}

#[derive(Debug)]
struct ManagerState {
    running: bool,
    run_id: Option<Uuid>,
    started_at: Option<chrono::DateTime<Utc>>,
    started: Option<Instant>,
    cancel: CancellationToken,
    scrapers: BTreeMap<String, ScraperState>,
    handle: Option<JoinHandle<Vec<JobRecord>>>,
}

impl ManagerState {
    fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            running: false,
            run_id: None,
            started_at: None,
            started: None,
            cancel: CancellationToken::new(),
            scrapers: names
                .into_iter()
                .map(|name| (name.to_string(), ScraperState::default()))
                .collect(),
            handle: None,
        }
    }
}

fn lock_state(state: &Mutex<ManagerState>) -> MutexGuard<'_, ManagerState> {
    state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the running flag when a background run ends, including by panic.
struct RunningGuard(Arc<Mutex<ManagerState>>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        lock_state(&self.0).running = false;
    }
}

/// Handle a scraper uses to report progress and observe cancellation.
#[derive(Debug, Clone)]
pub struct ScrapeContext {
    name: String,
    cancel: CancellationToken,
    state: Arc<Mutex<ManagerState>>,
}

impl ScrapeContext {
    /// Context not attached to any manager, for driving a scraper directly.
    pub fn detached(name: impl Into<String>) -> Self {
        let name = name.into();
        let state = ManagerState::new([name.as_str()]);
        Self {
            name,
            cancel: CancellationToken::new(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Sleep for `duration`, waking early if the run is cancelled.
    pub async fn sleep(&self, duration: Duration) {
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = self.cancel.cancelled() => {}
        }
    }

    /// Declare how many progress steps this scraper expects to take.
    pub fn set_total(&self, total: usize) {
        self.update(|s| s.total_steps = total);
    }

    /// Mark one progress step done.
    pub fn advance(&self) {
        self.update(|s| s.completed_steps += 1);
    }

    /// Current bookkeeping for this scraper.
    pub fn snapshot(&self) -> ScraperState {
        lock_state(&self.state)
            .scrapers
            .get(&self.name)
            .cloned()
            .unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut ScraperState)) {
        let mut state = lock_state(&self.state);
        f(state.scrapers.entry(self.name.clone()).or_default());
    }
}

/// Owns the registered scrapers and drives scrape runs in the background.
///
/// Cloning yields another handle to the same manager. At most one run is
/// active at a time.
pub struct ScraperManager<S: JobSink> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    scrapers: Vec<Arc<dyn Scraper>>,
    sink: S,
    mode: ExecutionMode,
    state: Arc<Mutex<ManagerState>>,
}

impl<S: JobSink> Clone for ScraperManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: JobSink> ScraperManager<S> {
    pub fn new(scrapers: Vec<Arc<dyn Scraper>>, sink: S, mode: ExecutionMode) -> Self {
        let state = ManagerState::new(scrapers.iter().map(|s| s.name()));
        Self {
            inner: Arc::new(Inner {
                scrapers,
                sink,
                mode,
                state: Arc::new(Mutex::new(state)),
            }),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.inner.mode
    }

    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    pub fn scraper_names(&self) -> Vec<&str> {
        self.inner.scrapers.iter().map(|s| s.name()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        lock_state(&self.inner.state)
    }

    /// Claim the manager for a new run: fresh id and cancellation token,
    /// per-scraper progress cleared. `None` if a run is already active.
    fn begin_run(&self, state: &mut ManagerState) -> Option<(Uuid, CancellationToken)> {
        if state.running {
            tracing::warn!(run_id = ?state.run_id, "Scrape already running, ignoring start");
            return None;
        }

        let run_id = Uuid::new_v4();
        state.running = true;
        state.run_id = Some(run_id);
        state.started_at = Some(Utc::now());
        state.started = Some(Instant::now());
        state.cancel = CancellationToken::new();
        for scraper in state.scrapers.values_mut() {
            *scraper = ScraperState {
                last_run_at: scraper.last_run_at,
                ..ScraperState::default()
            };
        }

        tracing::info!(
            %run_id,
            mode = %self.inner.mode,
            scrapers = self.inner.scrapers.len(),
            "Scrape run started"
        );
        Some((run_id, state.cancel.clone()))
    }

    /// Kick off a background run. Returns `false` if one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut state = self.lock();
        let Some((run_id, cancel)) = self.begin_run(&mut state) else {
            return false;
        };

        let guard = RunningGuard(Arc::clone(&self.inner.state));
        let manager = self.clone();
        state.handle = Some(tokio::spawn(async move {
            let _guard = guard;
            let jobs = manager.execute(&cancel).await;
            tracing::info!(%run_id, jobs = jobs.len(), "Scrape run finished");
            jobs
        }));
        true
    }

    /// Request cooperative cancellation. Returns `false` if nothing is running.
    pub fn cancel(&self) -> bool {
        let state = self.lock();
        if !state.running {
            return false;
        }
        state.cancel.cancel();
        tracing::info!(run_id = ?state.run_id, "Scrape cancellation requested");
        true
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Snapshot of run state and per-scraper progress.
    pub fn status(&self) -> ManagerStatus {
        let state = self.lock();

        let fraction = if state.scrapers.is_empty() {
            0.0
        } else {
            state.scrapers.values().map(ScraperState::fraction).sum::<f64>()
                / state.scrapers.len() as f64
        };

        let estimated_seconds_remaining = match state.started {
            Some(started) if state.running && fraction > 0.0 && fraction < 1.0 => {
                let elapsed = started.elapsed().as_secs_f64();
                (elapsed / fraction * (1.0 - fraction)).round() as u64
            }
            _ => 0,
        };

        ManagerStatus {
            run_id: state.run_id,
            running: state.running,
            progress_percent: fraction * 100.0,
            started_at: state.started_at,
            estimated_seconds_remaining,
            scrapers: state.scrapers.clone(),
        }
    }

    /// Wait for the background run started by [`start`](Self::start) and
    /// return its records. `None` if no run was started or it panicked.
    pub async fn wait(&self) -> Option<Vec<JobRecord>> {
        let handle = self.lock().handle.take()?;
        match handle.await {
            Ok(jobs) => Some(jobs),
            Err(e) => {
                tracing::error!(error = %e, "Scrape run task failed");
                None
            }
        }
    }

    /// Run every registered scraper once in the foreground and return the
    /// records.
    ///
    /// This is a full run like [`start`](Self::start): `cancel` and `status`
    /// apply to it and a concurrent `start` is refused. Returns an empty list
    /// if another run is already active.
    pub async fn run_all(&self) -> Vec<JobRecord> {
        let claimed = self.begin_run(&mut self.lock());
        let Some((run_id, cancel)) = claimed else {
            return Vec::new();
        };

        let _guard = RunningGuard(Arc::clone(&self.inner.state));
        let jobs = self.execute(&cancel).await;
        tracing::info!(%run_id, jobs = jobs.len(), "Scrape run finished");
        jobs
    }

    /// Drive the scrapers in the configured mode. Each scraper runs on its
    /// own task so a panic only takes that scraper down.
    async fn execute(&self, cancel: &CancellationToken) -> Vec<JobRecord> {
        let mut all = Vec::new();

        match self.inner.mode {
            ExecutionMode::Sequential => {
                for scraper in &self.inner.scrapers {
                    if cancel.is_cancelled() {
                        tracing::info!(next = scraper.name(), "Run cancelled, skipping remaining scrapers");
                        break;
                    }
                    let task = self.clone().run_task(Arc::clone(scraper), cancel.clone());
                    match tokio::spawn(task).await {
                        Ok(jobs) => all.extend(jobs),
                        Err(e) => self.record_crash(scraper.as_ref(), &e).await,
                    }
                }
            }
            ExecutionMode::Concurrent => {
                let mut tasks = JoinSet::new();
                let mut by_task = HashMap::new();
                for scraper in &self.inner.scrapers {
                    let task = self.clone().run_task(Arc::clone(scraper), cancel.clone());
                    let handle = tasks.spawn(task);
                    by_task.insert(handle.id(), Arc::clone(scraper));
                }
                while let Some(result) = tasks.join_next().await {
                    match result {
                        Ok(jobs) => all.extend(jobs),
                        Err(e) => match by_task.get(&e.id()) {
                            Some(scraper) => self.record_crash(scraper.as_ref(), &e).await,
                            None => tracing::error!(error = %e, "Scraper task failed"),
                        },
                    }
                }
            }
        }

        all
    }

    async fn run_task(self, scraper: Arc<dyn Scraper>, cancel: CancellationToken) -> Vec<JobRecord> {
        let jobs = self.run_scraper(scraper.as_ref(), &cancel).await;
        self.persist(scraper.name(), &jobs).await;
        jobs
    }

    /// Mark a scraper whose task panicked or was aborted as failed, then
    /// close it.
    async fn record_crash(&self, scraper: &dyn Scraper, err: &JoinError) {
        tracing::error!(scraper = scraper.name(), error = %err, "Scraper task crashed");
        {
            let mut state = self.lock();
            let entry = state.scrapers.entry(scraper.name().to_string()).or_default();
            entry.status = ScraperStatus::Error;
            entry.last_error = Some(format!("scraper task crashed: {err}"));
        }
        scraper.close().await;
    }

    /// Run one scraper with status bookkeeping.
    ///
    /// Errors are logged and recorded on the scraper's state, never
    /// propagated; a failed scraper yields no records. `close` is called on
    /// every path.
    pub async fn run_scraper(
        &self,
        scraper: &dyn Scraper,
        cancel: &CancellationToken,
    ) -> Vec<JobRecord> {
        let ctx = ScrapeContext {
            name: scraper.name().to_string(),
            cancel: cancel.clone(),
            state: Arc::clone(&self.inner.state),
        };
        ctx.update(|s| {
            s.status = ScraperStatus::Running;
            s.last_error = None;
            s.jobs_found = 0;
            s.completed_steps = 0;
            s.total_steps = 0;
        });
        tracing::info!(scraper = ctx.name(), "Scraper started");

        let started = Instant::now();
        let outcome = scraper.scrape(&ctx).await;
        scraper.close().await;

        match outcome {
            Ok(jobs) => {
                ctx.update(|s| {
                    s.status = ScraperStatus::Success;
                    s.last_run_at = Some(Utc::now());
                    s.jobs_found = jobs.len();
                });
                tracing::info!(
                    scraper = ctx.name(),
                    jobs = jobs.len(),
                    elapsed_ms = %started.elapsed().as_millis(),
                    "Scraper finished"
                );
                jobs
            }
            Err(e) => {
                tracing::error!(scraper = ctx.name(), error = %e, "Scraper failed");
                ctx.update(|s| {
                    s.status = ScraperStatus::Error;
                    s.last_error = Some(e.to_string());
                });
                Vec::new()
            }
        }
    }

    async fn persist(&self, scraper: &str, jobs: &[JobRecord]) {
        let mut inserted = 0usize;
        let mut duplicates = 0usize;
        let mut failed = 0usize;

        for job in jobs {
            match self.inner.sink.upsert(job).await {
                Ok(true) => inserted += 1,
                Ok(false) => duplicates += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(%scraper, url = %job.url, error = %e, "Failed to store job");
                }
            }
        }

        if !jobs.is_empty() {
            tracing::info!(%scraper, inserted, duplicates, failed, "Stored scraped jobs");
        }
    }
}
