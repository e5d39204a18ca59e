//! LinkedIn guest job-search scraper with a company follower-count gate.
//!
//! Search results come from the public `seeMoreJobPostings` endpoint, 25
//! cards per page. Every card's company is looked up once per run and the
//! card is kept only if the company is large enough (see the threshold
//! constants). Lookups consult, in order: blacklist, whitelist, follower
//! cache, then the company page itself.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use jobscout_core::error::AppError;
use jobscout_core::followers::{ReviewList, UrlList};
use jobscout_core::manager::ScrapeContext;
use jobscout_core::models::{JobRecord, JobSource};
use jobscout_core::traits::{FollowerStore, PageFetcher, Scraper};
use jobscout_core::util::strip_query;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::DelayRange;
use crate::location::is_us_location;

/// Minimum followers for a company hiring outside the United States.
pub const NON_US_MIN_FOLLOWERS: u64 = 850_000;
/// Minimum followers for a company hiring in the United States.
pub const US_MIN_FOLLOWERS: u64 = 750_000;
/// Assumed follower count when the company page cannot be read.
pub const FAIL_OPEN_FOLLOWERS: u64 = 1_000_000;
/// Follower count assigned to whitelisted companies.
pub const WHITELIST_FOLLOWERS: u64 = 1_000_000;

/// Cards per search page; the `start` offset advances by this much.
pub const PAGE_SIZE: usize = 25;

/// Two weeks.
pub const DEFAULT_POSTED_WITHIN: Duration = Duration::from_secs(14 * 24 * 60 * 60);

const NO_RESULTS_MARKER: &str = "No matching jobs found";
const SEARCH_PATH: &str = "/jobs-guest/jobs/api/seeMoreJobPostings/search";

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "software intern",
    "software engineer intern",
    "software developer intern",
    "backend intern",
    "full stack intern",
    "computer science intern",
];

const SEARCH_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
    ("referer", "https://www.linkedin.com/jobs/"),
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector {css:?}: {e}"))
}

static CARD: LazyLock<Selector> = LazyLock::new(|| selector("li div.base-card--link.job-search-card"));
static JOB_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".base-card__full-link"));
static COMPANY_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".hidden-nested-link"));
static LIST_DATE: LazyLock<Selector> = LazyLock::new(|| selector(".job-search-card__listdate"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".base-search-card__title"));
static LOCATION: LazyLock<Selector> = LazyLock::new(|| selector(".job-search-card__location"));
static BENEFITS: LazyLock<Selector> = LazyLock::new(|| selector(".job-posting-benefits__text"));
static FOLLOWER_SUBLINE: LazyLock<Selector> =
    LazyLock::new(|| selector("h3.top-card-layout__first-subline"));

static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d,]+)\s+followers").unwrap_or_else(|e| panic!("invalid followers regex: {e}"))
});

#[derive(Debug, Clone)]
pub struct LinkedInConfig {
    /// Scheme and host of the LinkedIn site.
    pub base_url: String,
    pub keywords: Vec<String>,
    /// Upper bound on result pages fetched per keyword.
    pub max_pages: usize,
    pub page_delay: DelayRange,
    pub keyword_delay: DelayRange,
    /// Only list postings from this far back (the `f_TPR` search filter).
    /// `None` searches every date.
    pub posted_within: Option<Duration>,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com".to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            max_pages: 40,
            page_delay: DelayRange::secs(3, 7),
            keyword_delay: DelayRange::secs(5, 10),
            posted_within: Some(DEFAULT_POSTED_WITHIN),
        }
    }
}

/// One search-result card as parsed from the page.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCard {
    pub title: String,
    pub company: String,
    pub company_url: String,
    pub url: String,
    pub location: String,
    pub posted_at: DateTime<Utc>,
    pub actively_hiring: bool,
}

pub struct LinkedInScraper<F, C> {
    fetcher: F,
    followers: C,
    blacklist: UrlList,
    whitelist: UrlList,
    review: ReviewList,
    config: LinkedInConfig,
}

impl<F: PageFetcher, C: FollowerStore> LinkedInScraper<F, C> {
    pub fn new(fetcher: F, followers: C, config: LinkedInConfig) -> Self {
        Self {
            fetcher,
            followers,
            blacklist: UrlList::empty(),
            whitelist: UrlList::empty(),
            review: ReviewList::in_memory(),
            config,
        }
    }

    pub fn with_blacklist(mut self, blacklist: UrlList) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_whitelist(mut self, whitelist: UrlList) -> Self {
        self.whitelist = whitelist;
        self
    }

    pub fn with_review_list(mut self, review: ReviewList) -> Self {
        self.review = review;
        self
    }

    pub fn review_list(&self) -> &ReviewList {
        &self.review
    }

    fn search_endpoint(&self) -> Result<Url, AppError> {
        let base = self.config.base_url.trim_end_matches('/');
        Url::parse(&format!("{base}{SEARCH_PATH}")).map_err(|e| {
            AppError::ConfigError(format!("Invalid LinkedIn base URL '{base}': {e}"))
        })
    }

    /// Minimum follower count a company needs for a job at `location`.
    pub fn threshold_for(location: &str) -> u64 {
        if is_us_location(location) {
            US_MIN_FOLLOWERS
        } else {
            NON_US_MIN_FOLLOWERS
        }
    }

    async fn scrape_keyword(
        &self,
        ctx: &ScrapeContext,
        endpoint: &Url,
        keyword: &str,
        memo: &mut HashMap<String, u64>,
    ) -> Vec<JobRecord> {
        let mut jobs = Vec::new();

        for page in 0..self.config.max_pages {
            if page > 0 {
                ctx.sleep(self.config.page_delay.sample()).await;
            }
            if ctx.is_cancelled() {
                break;
            }

            let start = page * PAGE_SIZE;
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("keywords", keyword)
                .append_pair("start", &start.to_string());
            if let Some(window) = self.config.posted_within {
                url.query_pairs_mut()
                    .append_pair("f_TPR", &format!("r{}", window.as_secs()));
            }

            tracing::info!(%keyword, start, "Fetching LinkedIn search page");
            let html = match self.fetcher.get(url.as_str(), SEARCH_HEADERS).await {
                Ok(page) => page.body,
                Err(e) if matches!(e.status_code(), Some(400 | 404)) => {
                    tracing::info!(%keyword, start, "Reached end of results");
                    break;
                }
                Err(e) => {
                    tracing::warn!(%keyword, start, error = %e, "Search page failed, moving to next keyword");
                    break;
                }
            };

            if html.contains(NO_RESULTS_MARKER) {
                tracing::info!(%keyword, start, "Reached end of results");
                break;
            }

            let cards = parse_job_cards(&html);
            tracing::debug!(%keyword, start, cards = cards.len(), "Parsed search page");
            if cards.is_empty() {
                break;
            }

            for card in cards {
                if card.company_url.is_empty() {
                    continue;
                }
                let followers = self.follower_count(&card.company_url, memo).await;
                let threshold = Self::threshold_for(&card.location);
                if followers < threshold {
                    tracing::debug!(
                        company = %card.company,
                        followers,
                        threshold,
                        "Skipping job from small company"
                    );
                    continue;
                }

                tracing::info!(company = %card.company, title = %card.title, followers, "Adding job");
                let mut job = JobRecord::new(card.title, card.company, card.url, JobSource::LinkedIn)
                    .with_location(card.location)
                    .with_posted_at(card.posted_at)
                    .with_follower_count(followers);
                job.actively_hiring = card.actively_hiring;
                jobs.push(job);
            }
        }

        jobs
    }

    /// Follower count for a company, memoised for the current run.
    async fn follower_count(&self, company_url: &str, memo: &mut HashMap<String, u64>) -> u64 {
        if let Some(count) = memo.get(company_url) {
            return *count;
        }
        let count = self.lookup_followers(company_url).await;
        memo.insert(company_url.to_string(), count);
        count
    }

    async fn lookup_followers(&self, company_url: &str) -> u64 {
        if self.blacklist.contains(company_url) {
            return 0;
        }
        if self.whitelist.contains(company_url) {
            return WHITELIST_FOLLOWERS;
        }

        match self.followers.get(company_url).await {
            Ok(Some(count)) => return count,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(company = %company_url, error = %e, "Follower cache read failed");
            }
        }

        tracing::info!(company = %company_url, "Fetching follower count");
        match self.fetch_followers(company_url).await {
            Ok(count) => {
                if let Err(e) = self.followers.set(company_url, count).await {
                    tracing::warn!(company = %company_url, error = %e, "Follower cache write failed");
                }
                count
            }
            Err(e) => {
                tracing::warn!(
                    company = %company_url,
                    error = %e,
                    "Follower count unavailable, assuming {}",
                    FAIL_OPEN_FOLLOWERS
                );
                if let Err(e) = self.review.append(company_url).await {
                    tracing::warn!(company = %company_url, error = %e, "Review list write failed");
                }
                FAIL_OPEN_FOLLOWERS
            }
        }
    }

    async fn fetch_followers(&self, company_url: &str) -> Result<u64, AppError> {
        let page = self.fetcher.get(company_url, &[]).await?;
        parse_follower_count(&page.body).ok_or_else(|| {
            AppError::ParseError(format!("No follower count on {company_url}"))
        })
    }
}

#[async_trait]
impl<F: PageFetcher, C: FollowerStore> Scraper for LinkedInScraper<F, C> {
    fn name(&self) -> &str {
        "linkedin"
    }

    async fn scrape(&self, ctx: &ScrapeContext) -> Result<Vec<JobRecord>, AppError> {
        let endpoint = self.search_endpoint()?;
        let mut memo = HashMap::new();
        let mut jobs = Vec::new();

        ctx.set_total(self.config.keywords.len());
        for (i, keyword) in self.config.keywords.iter().enumerate() {
            if i > 0 {
                ctx.sleep(self.config.keyword_delay.sample()).await;
            }
            if ctx.is_cancelled() {
                tracing::info!(%keyword, "LinkedIn scrape cancelled");
                break;
            }

            let found = self.scrape_keyword(ctx, &endpoint, keyword, &mut memo).await;
            tracing::info!(%keyword, jobs = found.len(), "Finished keyword");
            jobs.extend(found);
            ctx.advance();
        }

        tracing::info!(jobs = jobs.len(), companies = memo.len(), "LinkedIn scrape complete");
        Ok(jobs)
    }

    async fn close(&self) {
        self.fetcher.close().await;
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_posted_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse every job card on a search-results page.
///
/// Cards without a job link or a company element are dropped. Job URLs lose
/// their tracking query string.
pub fn parse_job_cards(html: &str) -> Vec<JobCard> {
    let document = Html::parse_document(html);

    document
        .select(&CARD)
        .filter_map(|card| {
            let url = card
                .select(&JOB_LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .filter(|href| !href.is_empty())?;
            let company_el = card.select(&COMPANY_LINK).next()?;

            let company = Some(text_of(company_el))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "No Company".to_string());
            let company_url = company_el.value().attr("href").unwrap_or_default();
            let title = card
                .select(&TITLE)
                .next()
                .map(text_of)
                .unwrap_or_else(|| "No Title".to_string());
            let location = card
                .select(&LOCATION)
                .next()
                .map(text_of)
                .unwrap_or_else(|| "No Location".to_string());
            let posted_at = card
                .select(&LIST_DATE)
                .next()
                .and_then(|el| el.value().attr("datetime"))
                .and_then(parse_posted_at)
                .unwrap_or_else(Utc::now);
            let actively_hiring = card
                .select(&BENEFITS)
                .next()
                .is_some_and(|el| text_of(el).contains("Actively Hiring"));

            Some(JobCard {
                title,
                company,
                company_url: company_url.to_string(),
                url: strip_query(url),
                location,
                posted_at,
                actively_hiring,
            })
        })
        .collect()
}

/// Follower count from a company page, e.g. `"Software · 1,234,567 followers"`.
pub fn parse_follower_count(html: &str) -> Option<u64> {
    let document = Html::parse_document(html);
    let subline = document.select(&FOLLOWER_SUBLINE).next().map(text_of)?;
    let captures = FOLLOWERS_RE.captures(&subline)?;
    captures[1].replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobscout_core::followers::MemoryFollowerStore;
    use jobscout_core::testutil::MockFetcher;

    fn card(job_id: u32, company_slug: &str, location: &str) -> String {
        format!(
            r#"<li><div class="base-card relative base-card--link job-search-card">
                <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/{job_id}?refId=abc&trackingId=x"></a>
                <h3 class="base-search-card__title"> Software Intern {job_id} </h3>
                <h4 class="base-search-card__subtitle">
                  <a class="hidden-nested-link" href="https://www.linkedin.com/company/{company_slug}"> {company_slug} </a>
                </h4>
                <span class="job-search-card__location"> {location} </span>
                <time class="job-search-card__listdate" datetime="2024-05-01">1 week ago</time>
              </div></li>"#
        )
    }

    fn page(cards: &[String]) -> String {
        format!("<html><body><ul>{}</ul></body></html>", cards.join("\n"))
    }

    fn company_page(followers: &str) -> String {
        format!(
            r#"<html><body><h3 class="top-card-layout__first-subline">Software Development · {followers} followers</h3></body></html>"#
        )
    }

    fn config(keywords: &[&str]) -> LinkedInConfig {
        LinkedInConfig {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            max_pages: 5,
            page_delay: DelayRange::ZERO,
            keyword_delay: DelayRange::ZERO,
            ..LinkedInConfig::default()
        }
    }

    #[test]
    fn test_parse_job_cards() {
        let mut html = page(&[card(1, "acme", "Austin, TX")]);
        html = html.replace(
            "</time>",
            r#"</time><span class="job-posting-benefits__text">Actively Hiring</span>"#,
        );

        let cards = parse_job_cards(&html);
        assert_eq!(cards.len(), 1);
        let c = &cards[0];
        assert_eq!(c.title, "Software Intern 1");
        assert_eq!(c.company, "acme");
        assert_eq!(c.company_url, "https://www.linkedin.com/company/acme");
        assert_eq!(c.url, "https://www.linkedin.com/jobs/view/1");
        assert_eq!(c.location, "Austin, TX");
        assert_eq!(c.posted_at.to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert!(c.actively_hiring);
    }

    #[test]
    fn test_parse_job_cards_skips_cards_without_link() {
        let html = page(&[card(1, "acme", "Austin, TX").replace("base-card__full-link", "other")]);
        assert!(parse_job_cards(&html).is_empty());
    }

    #[test]
    fn test_parse_follower_count() {
        assert_eq!(parse_follower_count(&company_page("1,234,567")), Some(1_234_567));
        assert_eq!(parse_follower_count("<html><body>nothing</body></html>"), None);
        assert_eq!(
            parse_follower_count(
                r#"<h3 class="top-card-layout__first-subline">Software Development</h3>"#
            ),
            None
        );
    }

    #[test]
    fn test_us_threshold_is_lower() {
        type Li = LinkedInScraper<MockFetcher, MemoryFollowerStore>;
        assert_eq!(Li::threshold_for("New York, NY"), US_MIN_FOLLOWERS);
        assert_eq!(Li::threshold_for("Berlin, Germany"), NON_US_MIN_FOLLOWERS);
        assert!(US_MIN_FOLLOWERS < NON_US_MIN_FOLLOWERS);
    }

    #[tokio::test]
    async fn test_follower_gate_by_location() {
        // 800k passes the US threshold but not the non-US one.
        let fetcher = MockFetcher::new()
            .route_once(
                "start=0",
                &page(&[card(1, "midsize", "Austin, TX"), card(2, "midsize", "Berlin, Germany")]),
            )
            .route("start=25", NO_RESULTS_MARKER)
            .route("/company/midsize", &company_page("800,000"));
        let scraper = LinkedInScraper::new(fetcher.clone(), MemoryFollowerStore::new(), config(&["intern"]));

        let jobs = scraper.scrape(&ScrapeContext::detached("linkedin")).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].location, "Austin, TX");
        assert_eq!(jobs[0].follower_count, Some(800_000));
        assert_eq!(jobs[0].source, JobSource::LinkedIn);
        // memoised within the run
        assert_eq!(fetcher.request_count("/company/midsize"), 1);
    }

    #[tokio::test]
    async fn test_blacklist_whitelist_and_cache() {
        let fetcher = MockFetcher::new()
            .route_once(
                "start=0",
                &page(&[
                    card(1, "banned", "Austin, TX"),
                    card(2, "tiny-but-whitelisted", "Berlin, Germany"),
                    card(3, "cached", "Berlin, Germany"),
                ]),
            )
            .route("start=25", NO_RESULTS_MARKER);
        let cache = MemoryFollowerStore::with_entries([(
            "https://www.linkedin.com/company/cached",
            2_000_000u64,
        )]);
        let scraper = LinkedInScraper::new(fetcher.clone(), cache, config(&["intern"]))
            .with_blacklist(UrlList::from_urls(["https://www.linkedin.com/company/banned"]))
            .with_whitelist(UrlList::from_urls([
                "https://www.linkedin.com/company/tiny-but-whitelisted",
            ]));

        let jobs = scraper.scrape(&ScrapeContext::detached("linkedin")).await.unwrap();

        let companies: Vec<_> = jobs.iter().map(|j| j.company.as_str()).collect();
        assert_eq!(companies, ["tiny-but-whitelisted", "cached"]);
        assert_eq!(jobs[0].follower_count, Some(WHITELIST_FOLLOWERS));
        assert_eq!(fetcher.request_count("/company/"), 0);
    }

    #[tokio::test]
    async fn test_fail_open_records_company_for_review() {
        let fetcher = MockFetcher::new()
            .route_once("start=0", &page(&[card(1, "mystery", "Berlin, Germany")]))
            .route("start=25", NO_RESULTS_MARKER)
            .route("/company/mystery", "<html><body>login wall</body></html>");
        let cache = MemoryFollowerStore::new();
        let scraper = LinkedInScraper::new(fetcher, cache.clone(), config(&["intern"]));

        let jobs = scraper.scrape(&ScrapeContext::detached("linkedin")).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].follower_count, Some(FAIL_OPEN_FOLLOWERS));
        assert_eq!(
            scraper.review_list().urls().await,
            ["https://www.linkedin.com/company/mystery"]
        );
        assert!(
            !cache
                .contains("https://www.linkedin.com/company/mystery")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_parsed_count_is_cached() {
        let fetcher = MockFetcher::new()
            .route_once("start=0", &page(&[card(1, "bigco", "Berlin, Germany")]))
            .route("start=25", NO_RESULTS_MARKER)
            .route("/company/bigco", &company_page("5,000,000"));
        let cache = MemoryFollowerStore::new();
        let scraper = LinkedInScraper::new(fetcher, cache.clone(), config(&["intern"]));

        scraper.scrape(&ScrapeContext::detached("linkedin")).await.unwrap();

        assert_eq!(
            cache.get("https://www.linkedin.com/company/bigco").await.unwrap(),
            Some(5_000_000)
        );
    }

    #[tokio::test]
    async fn test_pagination_stops_and_keywords_continue() {
        let fetcher = MockFetcher::new()
            .route_once("keywords=first&start=0", &page(&[card(1, "bigco", "Austin, TX")]))
            .route_once("keywords=first&start=25", &page(&[card(2, "bigco", "Austin, TX")]))
            .route("keywords=first&start=50", NO_RESULTS_MARKER)
            .route_status("keywords=second", 404)
            .route_once("keywords=third&start=0", "<html><body><ul></ul></body></html>")
            .route("/company/bigco", &company_page("2,000,000"));
        let scraper = LinkedInScraper::new(
            fetcher.clone(),
            MemoryFollowerStore::new(),
            config(&["first", "second", "third"]),
        );
        let ctx = ScrapeContext::detached("linkedin");

        let jobs = scraper.scrape(&ctx).await.unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].url, "https://www.linkedin.com/jobs/view/2");
        assert_eq!(fetcher.request_count("keywords=first"), 3);
        assert_eq!(fetcher.request_count("keywords=second"), 1);
        assert_eq!(fetcher.request_count("keywords=third"), 1);

        let state = ctx.snapshot();
        assert_eq!(state.total_steps, 3);
        assert_eq!(state.completed_steps, 3);
    }

    #[tokio::test]
    async fn test_search_is_limited_to_recent_postings() {
        let fetcher = MockFetcher::new().route("keywords=a", NO_RESULTS_MARKER);
        let scraper =
            LinkedInScraper::new(fetcher.clone(), MemoryFollowerStore::new(), config(&["a"]));
        scraper.scrape(&ScrapeContext::detached("linkedin")).await.unwrap();
        assert_eq!(fetcher.request_count("&start=0&f_TPR=r1209600"), 1);

        let fetcher = MockFetcher::new().route("keywords=a", NO_RESULTS_MARKER);
        let scraper = LinkedInScraper::new(
            fetcher.clone(),
            MemoryFollowerStore::new(),
            LinkedInConfig {
                posted_within: None,
                ..config(&["a"])
            },
        );
        scraper.scrape(&ScrapeContext::detached("linkedin")).await.unwrap();
        assert_eq!(fetcher.request_count("keywords=a"), 1);
        assert_eq!(fetcher.request_count("f_TPR"), 0);
    }

    #[tokio::test]
    async fn test_network_failure_abandons_keyword_only() {
        let fetcher = MockFetcher::new()
            .route_error("keywords=flaky", "connection reset")
            .route_once("keywords=steady&start=0", &page(&[card(7, "bigco", "Austin, TX")]))
            .route("keywords=steady&start=25", NO_RESULTS_MARKER)
            .route("/company/bigco", &company_page("2,000,000"));
        let scraper = LinkedInScraper::new(
            fetcher,
            MemoryFollowerStore::new(),
            config(&["flaky", "steady"]),
        );

        let jobs = scraper.scrape(&ScrapeContext::detached("linkedin")).await.unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_keyword() {
        let fetcher = MockFetcher::new();
        let scraper = LinkedInScraper::new(fetcher.clone(), MemoryFollowerStore::new(), config(&["a"]));
        let ctx = ScrapeContext::detached("linkedin");
        ctx.cancellation_token().cancel();

        let jobs = scraper.scrape(&ctx).await.unwrap();

        assert!(jobs.is_empty());
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_config_error() {
        let scraper = LinkedInScraper::new(
            MockFetcher::new(),
            MemoryFollowerStore::new(),
            LinkedInConfig {
                base_url: "not a url".into(),
                ..config(&["a"])
            },
        );
        let err = scraper.scrape(&ScrapeContext::detached("linkedin")).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_close_closes_fetcher() {
        let fetcher = MockFetcher::new();
        let scraper = LinkedInScraper::new(fetcher.clone(), MemoryFollowerStore::new(), config(&[]));
        scraper.close().await;
        assert!(fetcher.was_closed());
    }
}
