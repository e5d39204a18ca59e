use std::sync::Arc;

use jobscout_core::error::AppError;
use jobscout_core::followers::{FileFollowerStore, ReviewList, UrlList};
use jobscout_core::models::JobSource;
use jobscout_core::traits::Scraper;

use crate::config::ScoutConfig;
use crate::github::GitHubJobsScraper;
use crate::google::GoogleJobsScraper;
use crate::handler::RequestHandler;
use crate::linkedin::LinkedInScraper;

/// Every source the registry knows how to build, in default run order.
pub const ALL_SOURCES: &[JobSource] = &[JobSource::LinkedIn, JobSource::GitHub, JobSource::Google];

/// Build one scraper per requested source, each with its own request
/// handler. Duplicate sources are ignored.
///
/// LinkedIn's data files live under `config.data_dir`, which is created if
/// missing.
pub async fn build_registry(
    config: &ScoutConfig,
    sources: &[JobSource],
) -> Result<Vec<Arc<dyn Scraper>>, AppError> {
    let mut scrapers: Vec<Arc<dyn Scraper>> = Vec::new();
    let mut seen = Vec::new();

    for source in sources {
        if seen.contains(source) {
            continue;
        }
        seen.push(*source);

        let scraper: Arc<dyn Scraper> = match source {
            JobSource::LinkedIn => Arc::new(build_linkedin(config).await?),
            JobSource::GitHub => Arc::new(GitHubJobsScraper::new(
                RequestHandler::new(config.github_requests.clone())?,
                config.github.clone(),
            )),
            JobSource::Google => Arc::new(GoogleJobsScraper::new(config.google.clone())),
        };
        scrapers.push(scraper);
    }

    tracing::info!(
        scrapers = ?scrapers.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "Scraper registry built"
    );
    Ok(scrapers)
}

async fn build_linkedin(
    config: &ScoutConfig,
) -> Result<LinkedInScraper<RequestHandler, FileFollowerStore>, AppError> {
    tokio::fs::create_dir_all(config.data_dir())
        .await
        .map_err(|e| {
            AppError::ConfigError(format!(
                "Cannot create data directory {}: {e}",
                config.data_dir().display()
            ))
        })?;

    let blacklist = UrlList::load(&config.blacklist_path()).await?;
    let whitelist = UrlList::load(&config.whitelist_path()).await?;
    tracing::debug!(
        blacklisted = blacklist.len(),
        whitelisted = whitelist.len(),
        "Loaded company lists"
    );

    Ok(LinkedInScraper::new(
        RequestHandler::new(config.linkedin_requests.clone())?,
        FileFollowerStore::new(config.followers_path()),
        config.linkedin.clone(),
    )
    .with_blacklist(blacklist)
    .with_whitelist(whitelist)
    .with_review_list(ReviewList::file(config.review_path())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builds_requested_sources_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScoutConfig::default().with_data_dir(dir.path().join("data"));

        let scrapers = build_registry(
            &config,
            &[JobSource::Google, JobSource::LinkedIn, JobSource::Google],
        )
        .await
        .unwrap();

        let names: Vec<_> = scrapers.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["google", "linkedin"]);
        assert!(config.data_dir().is_dir());
    }

    #[tokio::test]
    async fn test_all_sources() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScoutConfig::default().with_data_dir(dir.path());

        let scrapers = build_registry(&config, ALL_SOURCES).await.unwrap();
        assert_eq!(scrapers.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_rate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ScoutConfig::default().with_data_dir(dir.path());
        config.github_requests.rate = -1.0;

        let result = build_registry(&config, &[JobSource::GitHub]).await;
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
