use std::path::PathBuf;

use crate::places::{ApiCredentials, ProviderKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub google_places_api_key: Option<String>,
    pub outscraper_api_key: Option<String>,
    /// Primary provider chain, tried in order until one answers.
    pub providers: Vec<ProviderKind>,
    /// ISO 3166-1 alpha-2 code used when the location text names no country.
    pub home_region: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub max_concurrent_requests: usize,
    pub sub_region_timeout_secs: u64,
    pub scatter_dense_threshold_miles: f64,
    pub direct_tolerance: f64,
    pub scatter_tolerance: f64,
    pub fallback_tolerance: f64,
    pub fallback_limit: u32,
    pub max_pages: u32,
    pub inter_page_delay_ms: u64,
    pub require_resolved_location: bool,
    pub cache_ttl_secs: u64,
    pub cache_dir: Option<PathBuf>,
}

impl AppConfig {
    /// The provider keys from the environment, as a per-call credential set.
    #[must_use]
    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            google_places: self.google_places_api_key.clone(),
            outscraper: self.outscraper_api_key.clone(),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "google_places_api_key",
                &self.google_places_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "outscraper_api_key",
                &self.outscraper_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("providers", &self.providers)
            .field("home_region", &self.home_region)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("sub_region_timeout_secs", &self.sub_region_timeout_secs)
            .field(
                "scatter_dense_threshold_miles",
                &self.scatter_dense_threshold_miles,
            )
            .field("direct_tolerance", &self.direct_tolerance)
            .field("scatter_tolerance", &self.scatter_tolerance)
            .field("fallback_tolerance", &self.fallback_tolerance)
            .field("fallback_limit", &self.fallback_limit)
            .field("max_pages", &self.max_pages)
            .field("inter_page_delay_ms", &self.inter_page_delay_ms)
            .field("require_resolved_location", &self.require_resolved_location)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}
