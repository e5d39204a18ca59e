//! Company follower-count cache and the plain-text URL lists that gate it.
//!
//! On disk everything is line oriented so the files stay hand-editable:
//!
//! - follower cache: `url,count` CSV rows, append-only, later rows win
//! - blacklist / whitelist: one company URL per line, read-only
//! - review list: one URL per line, appended when a count had to be guessed

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::traits::FollowerStore;

// ---------------------------------------------------------------------------
// File-backed follower cache
// ---------------------------------------------------------------------------

/// Follower cache persisted as an append-only CSV file.
///
/// The file is read once, on first use, and kept in memory afterwards.
/// Reads and appends are serialised through one async mutex, so concurrent
/// scrapers sharing a store never interleave partial rows.
#[derive(Debug, Clone)]
pub struct FileFollowerStore {
    path: PathBuf,
    entries: Arc<Mutex<Option<HashMap<String, u64>>>>,
}

impl FileFollowerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, u64>, AppError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Follower cache not found, starting empty");
                return Ok(HashMap::new());
            }
            Err(e) => {
                return Err(AppError::CacheError(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let entries = parse_follower_rows(&bytes);
        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "Loaded follower cache"
        );
        Ok(entries)
    }

    async fn append_row(&self, url: &str, count: u64) -> Result<(), AppError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record([url, count.to_string().as_str()])
            .map_err(|e| AppError::CacheError(e.to_string()))?;
        let row = writer
            .into_inner()
            .map_err(|e| AppError::CacheError(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::CacheError(e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                AppError::CacheError(format!("Failed to open {}: {e}", self.path.display()))
            })?;
        file.write_all(&row)
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| AppError::CacheError(e.to_string()))
    }
}

impl FollowerStore for FileFollowerStore {
    async fn get(&self, url: &str) -> Result<Option<u64>, AppError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(url).copied()))
    }

    async fn set(&self, url: &str, count: u64) -> Result<(), AppError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        self.append_row(url, count).await?;
        if let Some(entries) = guard.as_mut() {
            entries.insert(url.to_string(), count);
        }
        Ok(())
    }
}

/// Parse `url,count` rows, skipping anything malformed.
fn parse_follower_rows(bytes: &[u8]) -> HashMap<String, u64> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut entries = HashMap::new();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(line = line + 1, error = %e, "Skipping unreadable follower row");
                continue;
            }
        };
        if record.len() != 2 || record[0].is_empty() {
            tracing::debug!(line = line + 1, "Skipping malformed follower row");
            continue;
        }
        match record[1].parse::<u64>() {
            Ok(count) => {
                entries.insert(record[0].to_string(), count);
            }
            Err(_) => {
                tracing::debug!(line = line + 1, value = &record[1], "Skipping non-numeric follower count");
            }
        }
    }
    entries
}

// ---------------------------------------------------------------------------
// In-memory follower cache
// ---------------------------------------------------------------------------

/// Follower cache that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryFollowerStore {
    entries: Arc<StdMutex<HashMap<String, u64>>>,
}

impl MemoryFollowerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            entries: Arc::new(StdMutex::new(map)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FollowerStore for MemoryFollowerStore {
    async fn get(&self, url: &str) -> Result<Option<u64>, AppError> {
        Ok(self.lock().get(url).copied())
    }

    async fn set(&self, url: &str, count: u64) -> Result<(), AppError> {
        self.lock().insert(url.to_string(), count);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// URL lists
// ---------------------------------------------------------------------------

/// Read-only set of company URLs (blacklist or whitelist).
#[derive(Debug, Clone, Default)]
pub struct UrlList {
    urls: HashSet<String>,
}

impl UrlList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a newline-delimited list. A missing file is an empty list.
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "URL list not found, using empty list");
                return Ok(Self::empty());
            }
            Err(e) => {
                return Err(AppError::CacheError(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(Self::from_urls(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        ))
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Append-only list of company URLs that need a human to check them.
///
/// Each URL is recorded at most once per process.
#[derive(Debug, Clone, Default)]
pub struct ReviewList {
    path: Option<PathBuf>,
    recorded: Arc<Mutex<Vec<String>>>,
}

impl ReviewList {
    /// Review list that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn append(&self, url: &str) -> Result<(), AppError> {
        let mut recorded = self.recorded.lock().await;
        if recorded.iter().any(|u| u == url) {
            return Ok(());
        }

        if let Some(path) = &self.path {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .map_err(|e| {
                    AppError::CacheError(format!("Failed to open {}: {e}", path.display()))
                })?;
            file.write_all(format!("{url}\n").as_bytes())
                .await
                .map_err(|e| AppError::CacheError(e.to_string()))?;
        }

        recorded.push(url.to_string());
        Ok(())
    }

    /// URLs appended during this process, oldest first.
    pub async fn urls(&self) -> Vec<String> {
        self.recorded.lock().await.clone()
    }
}
