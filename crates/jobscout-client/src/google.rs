//! Synthetic job generator for demos and load testing. Makes no requests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jobscout_core::error::AppError;
use jobscout_core::manager::ScrapeContext;
use jobscout_core::models::{JobRecord, JobSource};
use jobscout_core::traits::Scraper;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::DelayRange;

const COMPANY_NAMES: &[&str] = &[
    "Google", "Amazon", "Microsoft", "Apple", "Meta", "Netflix", "Uber", "Lyft", "Airbnb",
    "Twitter", "LinkedIn", "Adobe", "Salesforce", "Dropbox", "Slack", "Spotify", "Stripe",
    "Square", "DoorDash", "Instacart", "Robinhood", "Coinbase", "Zoom", "Palantir", "Snowflake",
];

const JOB_TITLES: &[&str] = &[
    "Software Engineer", "Frontend Engineer", "Backend Engineer", "Full Stack Engineer",
    "Mobile Engineer", "Machine Learning Engineer", "Data Scientist", "Product Manager",
    "UI/UX Designer", "DevOps Engineer", "Security Engineer", "QA Engineer",
    "Site Reliability Engineer", "Data Engineer", "Cloud Engineer", "Infrastructure Engineer",
];

const ROLE_TYPES: &[&str] = &["Intern", "New Grad"];

const LOCATIONS: &[&str] = &["Remote", "New York, NY", "San Francisco, CA", "Seattle, WA", "Austin, TX"];

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Postings generated per run.
    pub count: usize,
    /// Pause before each posting, simulating fetch latency.
    pub delay: DelayRange,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            count: 20,
            delay: DelayRange::fixed(Duration::from_secs(1)),
        }
    }
}

pub struct GoogleJobsScraper {
    config: GoogleConfig,
}

impl GoogleJobsScraper {
    pub fn new(config: GoogleConfig) -> Self {
        Self { config }
    }
}

fn pick(items: &'static [&'static str]) -> &'static str {
    items.choose(&mut rand::rng()).copied().unwrap_or_default()
}

/// One fabricated posting dated within the last 30 days.
fn synthetic_job() -> JobRecord {
    let mut rng = rand::rng();
    let days_ago = rng.random_range(0..=30);
    let posting_id: u32 = rng.random_range(1000..=9999);

    JobRecord::new(
        format!("{} - {}", pick(JOB_TITLES), pick(ROLE_TYPES)),
        pick(COMPANY_NAMES),
        format!("https://example.com/jobs/{posting_id}"),
        JobSource::Google,
    )
    .with_location(pick(LOCATIONS))
    .with_posted_at(Utc::now() - chrono::Duration::days(days_ago))
}

#[async_trait]
impl Scraper for GoogleJobsScraper {
    fn name(&self) -> &str {
        "google"
    }

    async fn scrape(&self, ctx: &ScrapeContext) -> Result<Vec<JobRecord>, AppError> {
        let mut jobs = Vec::with_capacity(self.config.count);

        ctx.set_total(self.config.count);
        for _ in 0..self.config.count {
            ctx.sleep(self.config.delay.sample()).await;
            if ctx.is_cancelled() {
                tracing::info!(generated = jobs.len(), "Synthetic scrape cancelled");
                break;
            }
            jobs.push(synthetic_job());
            ctx.advance();
        }

        tracing::info!(jobs = jobs.len(), "Generated synthetic jobs");
        Ok(jobs)
    }
}
