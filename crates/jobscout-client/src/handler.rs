use std::sync::Mutex;
use std::time::Duration;

use jobscout_core::error::AppError;
use jobscout_core::rate_limit::RateLimiter;
use jobscout_core::retry::RetryPolicy;
use jobscout_core::traits::{PageFetcher, PageResponse};
use rand::seq::IndexedRandom;
use reqwest::Client;

use crate::config::RequestSettings;

/// Desktop browser User-Agents; one is picked per handler.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// Rate-limited, retrying HTTP GET client.
///
/// Each request takes one rate-limit token, then runs under the retry
/// policy. Any status >= 400 counts as a failed attempt. The reqwest client
/// is created on first use and dropped by [`close`](PageFetcher::close).
pub struct RequestHandler {
    limiter: RateLimiter,
    retry: RetryPolicy,
    timeout: Duration,
    user_agent: &'static str,
    client: Mutex<Option<Client>>,
}

impl RequestHandler {
    pub fn new(settings: RequestSettings) -> Result<Self, AppError> {
        let limiter = RateLimiter::new(settings.rate, settings.burst)?;
        let user_agent = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        Ok(Self {
            limiter,
            retry: settings.retry,
            timeout: settings.timeout,
            user_agent,
            client: Mutex::new(None),
        })
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Whether a client (and its connection pool) is currently open.
    pub fn is_open(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    fn client(&self) -> Result<Client, AppError> {
        let mut slot = self
            .client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        tracing::debug!(user_agent = self.user_agent, "HTTP client created");
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn send_once(&self, url: &str, headers: &[(&str, &str)]) -> Result<PageResponse, AppError> {
        let client = self.client()?;
        let mut request = client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout.as_secs())
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(AppError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        Ok(PageResponse { status, body })
    }
}

impl PageFetcher for RequestHandler {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<PageResponse, AppError> {
        self.limiter.acquire().await;
        tracing::debug!(%url, "GET");
        self.retry
            .execute(url, || self.send_once(url, headers))
            .await
    }

    async fn close(&self) {
        let client = self
            .client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if client.is_some() {
            tracing::debug!("HTTP client closed");
        }
    }
}
