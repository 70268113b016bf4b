//! Legacy Google Places Nearby Search (`/maps/api/place/nearbysearch/json`).
//!
//! Only used as the last-resort fallback when every primary provider failed.
//! It needs a resolved center and matches on keyword rather than natural
//! language, so it trades recall for availability.

use async_trait::async_trait;
use reqwest::{Client, Url};
use scout_core::{PageCursor, ProviderKind};
use serde_json::Value;

use super::http::{
    build_client, f64_field, join_endpoint, normalize_base_url, read_json, str_field,
    HttpSettings,
};
use super::{PlaceProvider, MAX_CIRCLE_RADIUS_METERS};
use crate::error::DiscoveryError;
use crate::geo::miles_to_meters;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{ProviderQuery, RawPage, RawProviderRecord};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/";
const NEARBY_PATH: &str = "maps/api/place/nearbysearch/json";

pub const MAX_RESULTS_PER_PAGE: u32 = 20;

pub struct GoogleNearbyClient {
    client: Client,
    api_key: String,
    nearby_url: Url,
    retry: RetryPolicy,
}

impl GoogleNearbyClient {
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
        let base = normalize_base_url(ProviderKind::GoogleNearby, base_url)?;
        Ok(Self {
            client: build_client(settings)?,
            api_key: api_key.to_owned(),
            nearby_url: join_endpoint(ProviderKind::GoogleNearby, &base, NEARBY_PATH)?,
            retry: settings.retry,
        })
    }

    pub(crate) fn build_url(&self, query: &ProviderQuery) -> Result<Url, DiscoveryError> {
        let Some(center) = query.center else {
            return Err(DiscoveryError::InvalidRequest(
                "nearby search requires a resolved center".to_owned(),
            ));
        };
        let meters = query
            .bias_radius_miles
            .map_or(MAX_CIRCLE_RADIUS_METERS, miles_to_meters)
            .min(MAX_CIRCLE_RADIUS_METERS);

        let mut url = self.nearby_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            pairs.append_pair("location", &center.to_string());
            pairs.append_pair("radius", &format!("{meters:.0}"));
            pairs.append_pair("keyword", &query.text);
            if let Some(PageCursor::Token(token)) = &query.cursor {
                pairs.append_pair("pagetoken", token);
            }
        }
        Ok(url)
    }
}

/// Checks the envelope `status`. `OK` and `ZERO_RESULTS` succeed; a quota
/// status is a rate limit and `UNKNOWN_ERROR` is a transient server fault.
fn check_status(body: &Value) -> Result<(), DiscoveryError> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or("OK");
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "OVER_QUERY_LIMIT" => Err(DiscoveryError::RateLimited {
            provider: ProviderKind::GoogleNearby,
            retry_after_secs: 2,
        }),
        "UNKNOWN_ERROR" => Err(DiscoveryError::UnexpectedStatus {
            provider: ProviderKind::GoogleNearby,
            status: 500,
            url: NEARBY_PATH.to_owned(),
        }),
        other => Err(DiscoveryError::ProviderApi {
            provider: ProviderKind::GoogleNearby,
            message: str_field(body, "error_message").unwrap_or_else(|| other.to_owned()),
        }),
    }
}

pub(crate) fn parse_nearby_response(body: &Value) -> RawPage {
    let next_token = str_field(body, "next_page_token");
    let records = body
        .get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|place| parse_place(place, next_token.as_deref()))
                .collect()
        })
        .unwrap_or_default();
    RawPage {
        records,
        next: next_token.map(PageCursor::Token),
    }
}

fn parse_place(place: &Value, batch_token: Option<&str>) -> Option<RawProviderRecord> {
    if !place.is_object() {
        return None;
    }
    let location = place.get("geometry").and_then(|g| g.get("location"));
    let category = place
        .get("types")
        .and_then(Value::as_array)
        .and_then(|types| types.first())
        .and_then(Value::as_str)
        .map(|t| t.replace('_', " "));
    Some(RawProviderRecord {
        external_id: str_field(place, "place_id"),
        name: str_field(place, "name"),
        address: str_field(place, "vicinity").or_else(|| str_field(place, "formatted_address")),
        rating: f64_field(place, "rating"),
        latitude: location.and_then(|l| f64_field(l, "lat")),
        longitude: location.and_then(|l| f64_field(l, "lng")),
        category,
        website: None,
        phone: None,
        business_status: str_field(place, "business_status"),
        source: ProviderKind::GoogleNearby,
        batch_token: batch_token.map(str::to_owned),
        raw_data: place.clone(),
    })
}

#[async_trait]
impl PlaceProvider for GoogleNearbyClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GoogleNearby
    }

    fn max_page_size(&self) -> u32 {
        MAX_RESULTS_PER_PAGE
    }

    fn requires_center(&self) -> bool {
        true
    }

    async fn fetch_page(&self, query: &ProviderQuery) -> Result<RawPage, DiscoveryError> {
        let url = self.build_url(query)?;
        tracing::debug!(keyword = %query.text, "legacy nearby search");

        let body = retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url).send().await?;
                let body = read_json(ProviderKind::GoogleNearby, response).await?;
                check_status(&body)?;
                Ok(body)
            }
        })
        .await?;

        Ok(parse_nearby_response(&body))
    }
}
