//! Outscraper Google Maps search (`GET /maps/search-v3`).
//!
//! Results are anchored to a coordinate when one is known; the radius is only
//! sent for strict searches. Paging is offset-based via `skip`.

use async_trait::async_trait;
use reqwest::{Client, Url};
use scout_core::{PageCursor, ProviderKind};
use serde_json::Value;

use super::http::{
    build_client, error_message, f64_field, join_endpoint, normalize_base_url, read_json,
    str_field, HttpSettings,
};
use super::{PlaceProvider, MAX_CIRCLE_RADIUS_METERS};
use crate::error::DiscoveryError;
use crate::geo::miles_to_meters;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{ProviderQuery, RawPage, RawProviderRecord};

pub const DEFAULT_BASE_URL: &str = "https://api.app.outscraper.com/";
const SEARCH_PATH: &str = "maps/search-v3";

pub const MAX_RESULTS_PER_PAGE: u32 = 100;

pub struct OutscraperClient {
    client: Client,
    api_key: String,
    search_url: Url,
    retry: RetryPolicy,
}

impl OutscraperClient {
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(api_key: &str, settings: &HttpSettings) -> Result<Self, DiscoveryError> {
        Self::with_base_url(api_key, settings, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`DiscoveryError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`DiscoveryError::ProviderApi`] if `base_url` is not a
    /// valid URL.
    pub fn with_base_url(
        api_key: &str,
        settings: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, DiscoveryError> {
        let base = normalize_base_url(ProviderKind::Outscraper, base_url)?;
        Ok(Self {
            client: build_client(settings)?,
            api_key: api_key.to_owned(),
            search_url: join_endpoint(ProviderKind::Outscraper, &base, SEARCH_PATH)?,
            retry: settings.retry,
        })
    }

    /// Builds the request URL with percent-encoded query parameters.
    pub(crate) fn build_url(&self, query: &ProviderQuery) -> Url {
        let limit = query.limit.clamp(1, MAX_RESULTS_PER_PAGE);
        let skip = match query.cursor {
            Some(PageCursor::Offset(offset)) => offset,
            _ => 0,
        };

        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &query.text);
            pairs.append_pair("limit", &limit.to_string());
            pairs.append_pair("skip", &skip.to_string());
            pairs.append_pair("language", "en");
            if !query.region_code.is_empty() {
                pairs.append_pair("region", &query.region_code);
            }
            if let Some(center) = query.center {
                pairs.append_pair("coordinates", &center.to_string());
                if let Some(radius) = query.bias_radius_miles {
                    let meters = miles_to_meters(radius).min(MAX_CIRCLE_RADIUS_METERS);
                    pairs.append_pair("radius", &format!("{meters:.0}"));
                }
            }
            pairs.append_pair("async", "false");
        }
        url
    }
}

fn check_api_error(body: &Value) -> Result<(), DiscoveryError> {
    let failed = body
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("error"));
    if failed || body.get("error").is_some() || body.get("errorMessage").is_some() {
        return Err(DiscoveryError::ProviderApi {
            provider: ProviderKind::Outscraper,
            message: error_message(body).unwrap_or_else(|| "unknown error".to_owned()),
        });
    }
    Ok(())
}

/// Flattens `data`, which is a list of per-query result lists
/// (`[[...]]`) or occasionally a flat list.
fn flatten_data(body: &Value) -> Vec<&Value> {
    let Some(data) = body.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };
    data.iter()
        .flat_map(|entry| match entry.as_array() {
            Some(inner) => inner.iter().collect::<Vec<_>>(),
            None => vec![entry],
        })
        .collect()
}

/// Maps a response into a page of raw records.
///
/// A full page (as many records as requested) means more may follow; the
/// next cursor is then the offset past this page.
pub(crate) fn parse_search_response(body: &Value, requested: u32, skip: u32) -> RawPage {
    let entries = flatten_data(body);
    let returned = u32::try_from(entries.len()).unwrap_or(u32::MAX);
    let records: Vec<RawProviderRecord> =
        entries.into_iter().filter_map(parse_place).collect();

    let next = (requested > 0 && returned >= requested)
        .then(|| PageCursor::Offset(skip.saturating_add(returned)));
    RawPage { records, next }
}

fn parse_place(place: &Value) -> Option<RawProviderRecord> {
    if !place.is_object() {
        return None;
    }
    Some(RawProviderRecord {
        external_id: str_field(place, "place_id").or_else(|| str_field(place, "google_id")),
        name: str_field(place, "name"),
        address: str_field(place, "full_address").or_else(|| str_field(place, "address")),
        rating: f64_field(place, "rating"),
        latitude: f64_field(place, "latitude"),
        longitude: f64_field(place, "longitude"),
        category: str_field(place, "type").or_else(|| str_field(place, "category")),
        website: str_field(place, "site"),
        phone: str_field(place, "phone"),
        business_status: str_field(place, "business_status"),
        source: ProviderKind::Outscraper,
        batch_token: None,
        raw_data: place.clone(),
    })
}

#[async_trait]
impl PlaceProvider for OutscraperClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Outscraper
    }

    fn max_page_size(&self) -> u32 {
        MAX_RESULTS_PER_PAGE
    }

    async fn fetch_page(&self, query: &ProviderQuery) -> Result<RawPage, DiscoveryError> {
        let url = self.build_url(query);
        let requested = query.limit.clamp(1, MAX_RESULTS_PER_PAGE);
        let skip = match query.cursor {
            Some(PageCursor::Offset(offset)) => offset,
            _ => 0,
        };
        tracing::debug!(text = %query.text, skip, "outscraper maps search");

        let body = retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url)
                    .header("X-API-KEY", &self.api_key)
                    .send()
                    .await?;
                let body = read_json(ProviderKind::Outscraper, response).await?;
                check_api_error(&body)?;
                Ok(body)
            }
        })
        .await?;

        Ok(parse_search_response(&body, requested, skip))
    }
}
