pub mod error;
pub mod followers;
pub mod manager;
pub mod models;
pub mod rate_limit;
pub mod retry;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use error::AppError;
pub use followers::{FileFollowerStore, MemoryFollowerStore, ReviewList, UrlList};
pub use manager::{ExecutionMode, ScrapeContext, ScraperManager};
pub use models::{JobRecord, JobSource, ManagerStatus, ScraperState, ScraperStatus};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use traits::{FollowerStore, JobSink, MemorySink, NullSink, PageFetcher, PageResponse, Scraper};
