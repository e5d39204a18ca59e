pub mod config;
pub mod github;
pub mod google;
pub mod handler;
pub mod linkedin;
pub mod location;
pub mod registry;

pub use config::{DelayRange, RequestSettings, ScoutConfig};
pub use github::{GitHubConfig, GitHubJobsScraper};
pub use google::{GoogleConfig, GoogleJobsScraper};
pub use handler::RequestHandler;
pub use linkedin::{LinkedInConfig, LinkedInScraper};
pub use registry::{ALL_SOURCES, build_registry};
