use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a job record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    LinkedIn,
    GitHub,
    Google,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::LinkedIn => "linkedin",
            JobSource::GitHub => "github",
            JobSource::Google => "google",
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linkedin" => Ok(JobSource::LinkedIn),
            "github" => Ok(JobSource::GitHub),
            "google" => Ok(JobSource::Google),
            _ => Err(format!("Unknown job source: {}", s)),
        }
    }
}

/// A normalized job posting produced by a scraper.
///
/// Deduplicated downstream by `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub posted_at: DateTime<Utc>,
    pub source: JobSource,
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub actively_hiring: bool,
}

impl JobRecord {
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
        source: JobSource,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            location: String::new(),
            url: url.into(),
            posted_at: Utc::now(),
            source,
            follower_count: None,
            actively_hiring: false,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = posted_at;
        self
    }

    pub fn with_follower_count(mut self, count: u64) -> Self {
        self.follower_count = Some(count);
        self
    }
}

/// Lifecycle of one registered scraper, as seen by the manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScraperStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl ScraperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScraperStatus::Idle => "idle",
            ScraperStatus::Running => "running",
            ScraperStatus::Success => "success",
            ScraperStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScraperStatus::Success | ScraperStatus::Error)
    }
}

impl fmt::Display for ScraperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-scraper bookkeeping kept by the manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperState {
    pub status: ScraperStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub jobs_found: usize,
    pub completed_steps: usize,
    pub total_steps: usize,
}

impl ScraperState {
    /// Fraction of this scraper's work that is done, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.status.is_terminal() {
            return 1.0;
        }
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.completed_steps as f64 / self.total_steps as f64).min(1.0)
    }
}

/// Point-in-time snapshot returned by `ScraperManager::status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStatus {
    pub run_id: Option<Uuid>,
    pub running: bool,
    pub progress_percent: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub estimated_seconds_remaining: u64,
    pub scrapers: BTreeMap<String, ScraperState>,
}
