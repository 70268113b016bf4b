use scout_core::ProviderKind;
use thiserror::Error;

/// Errors surfaced by the discovery engine and its provider adapters.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {provider} (retry after {retry_after_secs}s)")]
    RateLimited {
        provider: ProviderKind,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {provider} at {url}")]
    UnexpectedStatus {
        provider: ProviderKind,
        status: u16,
        url: String,
    },

    /// The provider understood the request and rejected it (bad key, malformed
    /// query, denied). Never retried.
    #[error("{provider} API error: {message}")]
    ProviderApi {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider} request abandoned after {after_secs}s")]
    Timeout {
        provider: ProviderKind,
        after_secs: u64,
    },

    #[error("could not resolve location \"{location}\" to a coordinate")]
    ResolutionFailure { location: String },

    /// Refused to issue an unanchored query whose cost and extent are unbounded.
    #[error(
        "refusing unbounded search: \"{location}\" did not resolve and {radius_miles} mi exceeds the provider's circle-bias ceiling"
    )]
    BudgetGuard { location: String, radius_miles: f64 },

    #[error("no API credentials configured for any provider")]
    MissingCredentials,

    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("all {attempts} provider attempt(s) failed; last error: {last}")]
    AllProvidersFailed {
        attempts: usize,
        #[source]
        last: Box<DiscoveryError>,
    },

    #[error("cache I/O error: {0}")]
    Cache(#[from] std::io::Error),
}

impl DiscoveryError {
    /// `true` when the failure came from reaching or reading the provider
    /// rather than from the provider rejecting the request. Only these move a
    /// search on to the next provider in the chain.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(_)
            | Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::Deserialize { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
