use std::path::{Path, PathBuf};
use std::time::Duration;

use jobscout_core::RetryPolicy;
use rand::Rng;

use crate::github::GitHubConfig;
use crate::google::GoogleConfig;
use crate::linkedin::LinkedInConfig;

/// Uniformly random pause between `min` and `max`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const ZERO: Self = Self::fixed(Duration::ZERO);

    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub const fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    pub const fn secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }
}

/// Throttling and retry settings for one scraper's request handler.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSettings {
    /// Requests per second.
    pub rate: f64,
    pub burst: u32,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            burst: 1,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RequestSettings {
    /// Conservative profile for LinkedIn's guest endpoints:
    /// one request every ten seconds, five retries from 5s up to 5 minutes.
    pub fn linkedin() -> Self {
        Self {
            rate: 0.1,
            retry: RetryPolicy::new(5)
                .with_base_delay(Duration::from_secs(5))
                .with_max_delay(Duration::from_secs(300)),
            ..Self::default()
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Everything needed to build the scraper registry.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// Directory holding the follower cache and the URL lists.
    pub data_dir: PathBuf,
    pub linkedin_requests: RequestSettings,
    pub github_requests: RequestSettings,
    pub linkedin: LinkedInConfig,
    pub github: GitHubConfig,
    pub google: GoogleConfig,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            linkedin_requests: RequestSettings::linkedin(),
            github_requests: RequestSettings::default(),
            linkedin: LinkedInConfig::default(),
            github: GitHubConfig::default(),
            google: GoogleConfig::default(),
        }
    }
}

impl ScoutConfig {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `url,count` rows cached from company pages.
    pub fn followers_path(&self) -> PathBuf {
        self.data_dir.join("followers.txt")
    }

    pub fn blacklist_path(&self) -> PathBuf {
        self.data_dir.join("blacklist.txt")
    }

    pub fn whitelist_path(&self) -> PathBuf {
        self.data_dir.join("whitelist.txt")
    }

    /// Companies whose follower count could not be read.
    pub fn review_path(&self) -> PathBuf {
        self.data_dir.join("templist.txt")
    }
}
