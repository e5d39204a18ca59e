//! Job links harvested from curated GitHub README job boards.

use std::sync::LazyLock;

use async_trait::async_trait;
use jobscout_core::error::AppError;
use jobscout_core::manager::ScrapeContext;
use jobscout_core::models::{JobRecord, JobSource};
use jobscout_core::traits::{PageFetcher, Scraper};
use regex::Regex;

use crate::config::DelayRange;

pub const DEFAULT_REPOSITORIES: &[&str] = &[
    "simplify/jobs",
    "cvrve/jobboard",
    "pittcsc/Summer2023-Internships",
    "remoteintech/remote-jobs",
    "poteto/hiring-without-whiteboards",
];

pub const DEFAULT_KEYWORDS: &[&str] = &["software", "engineer", "developer", "python", "javascript"];

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap_or_else(|e| panic!("invalid link regex: {e}"))
});

static COMPANY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^-|:]+)").unwrap_or_else(|e| panic!("invalid company regex: {e}"))
});

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Raw-content host serving `{owner}/{repo}/{branch}/README.md`.
    pub raw_base_url: String,
    /// `owner/repo` paths.
    pub repositories: Vec<String>,
    /// Matched case-insensitively against link text and URL.
    pub keywords: Vec<String>,
    pub repo_delay: DelayRange,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
            repositories: DEFAULT_REPOSITORIES.iter().map(|r| r.to_string()).collect(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            repo_delay: DelayRange::secs(1, 3),
        }
    }
}

pub struct GitHubJobsScraper<F> {
    fetcher: F,
    config: GitHubConfig,
}

impl<F: PageFetcher> GitHubJobsScraper<F> {
    pub fn new(fetcher: F, config: GitHubConfig) -> Self {
        Self { fetcher, config }
    }

    fn readme_url(&self, repo: &str, branch: &str) -> String {
        format!(
            "{}/{repo}/{branch}/README.md",
            self.config.raw_base_url.trim_end_matches('/')
        )
    }

    /// README contents from `main`, falling back to `master`.
    async fn fetch_readme(&self, repo: &str) -> Result<String, AppError> {
        match self.fetcher.get(&self.readme_url(repo, "main"), &[]).await {
            Ok(page) => Ok(page.body),
            Err(e) => {
                tracing::debug!(%repo, error = %e, "No README on main, trying master");
                let page = self.fetcher.get(&self.readme_url(repo, "master"), &[]).await?;
                Ok(page.body)
            }
        }
    }
}

#[async_trait]
impl<F: PageFetcher> Scraper for GitHubJobsScraper<F> {
    fn name(&self) -> &str {
        "github"
    }

    async fn scrape(&self, ctx: &ScrapeContext) -> Result<Vec<JobRecord>, AppError> {
        let mut jobs = Vec::new();

        ctx.set_total(self.config.repositories.len());
        for (i, repo) in self.config.repositories.iter().enumerate() {
            if i > 0 {
                ctx.sleep(self.config.repo_delay.sample()).await;
            }
            if ctx.is_cancelled() {
                tracing::info!(%repo, "GitHub scrape cancelled");
                break;
            }

            match self.fetch_readme(repo).await {
                Ok(readme) => {
                    let found = extract_job_links(&readme, &self.config.keywords);
                    tracing::info!(%repo, jobs = found.len(), "Scanned repository README");
                    jobs.extend(found);
                }
                Err(e) => {
                    tracing::warn!(%repo, error = %e, "Could not fetch README");
                }
            }
            ctx.advance();
        }

        Ok(jobs)
    }

    async fn close(&self) {
        self.fetcher.close().await;
    }
}

/// Markdown links whose text or target mentions one of `keywords`.
pub fn extract_job_links(markdown: &str, keywords: &[String]) -> Vec<JobRecord> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    MARKDOWN_LINK
        .captures_iter(markdown)
        .filter_map(|caps| {
            let title = caps[1].trim();
            let url = caps[2].trim();
            let haystack = format!("{} {}", title.to_lowercase(), url.to_lowercase());
            if !keywords.iter().any(|k| haystack.contains(k.as_str())) {
                return None;
            }
            Some(
                JobRecord::new(title, company_from_title(title), url, JobSource::GitHub)
                    .with_location("Remote"),
            )
        })
        .collect()
}

/// Text before the first `-`, `|` or `:`, trimmed.
fn company_from_title(title: &str) -> String {
    COMPANY_PREFIX
        .captures(title)
        .map(|caps| caps[1].trim().to_string())
        .filter(|company| !company.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}
