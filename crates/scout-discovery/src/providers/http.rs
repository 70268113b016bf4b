//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use scout_core::{AppConfig, ProviderKind};
use serde_json::Value;

use crate::error::DiscoveryError;
use crate::retry::RetryPolicy;

const DEFAULT_USER_AGENT: &str = "scout/0.1 (business-discovery)";

/// Fallback when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Connection settings common to every adapter.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base_ms: config.retry_backoff_base_ms,
            },
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: RetryPolicy {
                max_retries: 3,
                backoff_base_ms: 500,
            },
        }
    }
}

pub(crate) fn build_client(settings: &HttpSettings) -> Result<Client, DiscoveryError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(settings.user_agent.as_str())
        .build()?)
}

/// Parses `base_url`, ensuring it ends with exactly one slash so relative
/// endpoint paths join under it instead of replacing its last segment.
pub(crate) fn normalize_base_url(
    provider: ProviderKind,
    base_url: &str,
) -> Result<Url, DiscoveryError> {
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalized).map_err(|e| DiscoveryError::ProviderApi {
        provider,
        message: format!("invalid base URL '{base_url}': {e}"),
    })
}

pub(crate) fn join_endpoint(
    provider: ProviderKind,
    base_url: &Url,
    path: &str,
) -> Result<Url, DiscoveryError> {
    base_url.join(path).map_err(|e| DiscoveryError::ProviderApi {
        provider,
        message: format!("invalid endpoint path '{path}': {e}"),
    })
}

/// Classifies the response status and parses a 2xx body as JSON.
///
/// - 429 → [`DiscoveryError::RateLimited`]
/// - 400/401/403 → [`DiscoveryError::ProviderApi`] with the provider's message
/// - any other non-2xx → [`DiscoveryError::UnexpectedStatus`]
pub(crate) async fn read_json(
    provider: ProviderKind,
    response: Response,
) -> Result<Value, DiscoveryError> {
    let status = response.status();
    let url = response.url().to_string();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(DiscoveryError::RateLimited {
            provider,
            retry_after_secs,
        });
    }

    if matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        return Err(DiscoveryError::ProviderApi { provider, message });
    }

    if !status.is_success() {
        return Err(DiscoveryError::UnexpectedStatus {
            provider,
            status: status.as_u16(),
            url,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| DiscoveryError::Deserialize {
        context: format!("{provider} response from {url}"),
        source: e,
    })
}

/// Extracts a provider error message from the shapes the backends use:
/// `{"error": {"message": ".."}}`, `{"error": ".."}`, `{"errorMessage": ".."}`
/// and `{"error_message": ".."}`.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    let candidates = [
        body.get("error").and_then(|e| e.get("message")),
        body.get("error"),
        body.get("errorMessage"),
        body.get("error_message"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .map(str::to_owned)
}

pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Reads a float that may arrive as a JSON number or a numeric string.
pub(crate) fn f64_field(value: &Value, key: &str) -> Option<f64> {
    let v = value.get(key)?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|f: &f64| f.is_finite())
}
