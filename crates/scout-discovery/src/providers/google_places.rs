//! Google Places API (New) text search, also used for geocoding.
//!
//! Both operations are `POST /v1/places:searchText`; the response shape is
//! selected with the `X-Goog-FieldMask` header.

use async_trait::async_trait;
use reqwest::{Client, Url};
use scout_core::{Coordinate, PageCursor, ProviderKind};
use serde_json::{json, Map, Value};

use super::http::{
    build_client, error_message, f64_field, join_endpoint, normalize_base_url, read_json,
    str_field, HttpSettings,
};
use super::{PlaceProvider, MAX_CIRCLE_RADIUS_METERS};
use crate::error::DiscoveryError;
use crate::geo::miles_to_meters;
use crate::resolver::Geocoder;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{ProviderQuery, RawPage, RawProviderRecord};

pub const DEFAULT_BASE_URL: &str = "https://places.googleapis.com/";
const SEARCH_TEXT_PATH: &str = "v1/places:searchText";

/// Text search never returns more than this per page.
pub const MAX_RESULTS_PER_PAGE: u32 = 20;

const SEARCH_FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.rating,places.location,places.businessStatus,places.websiteUri,\
places.nationalPhoneNumber,places.primaryTypeDisplayName,nextPageToken";

const GEOCODE_FIELD_MASK: &str = "places.location";

/// Client for Places API (New) text search.
///
/// Use [`GooglePlacesClient::new`] for production or
/// [`GooglePlacesClient::with_base_url`] to point at a mock server in tests.
pub struct GooglePlacesClient {
    client: Client,
    api_key: String,
    search_url: Url,
    retry: RetryPolicy,
}

impl GooglePlacesClient {
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
        let base = normalize_base_url(ProviderKind::GooglePlaces, base_url)?;
        Ok(Self {
            client: build_client(settings)?,
            api_key: api_key.to_owned(),
            search_url: join_endpoint(ProviderKind::GooglePlaces, &base, SEARCH_TEXT_PATH)?,
            retry: settings.retry,
        })
    }

    async fn post_search(&self, body: &Value, field_mask: &str) -> Result<Value, DiscoveryError> {
        retry_with_backoff(self.retry, || async move {
            let response = self
                .client
                .post(self.search_url.clone())
                .header("X-Goog-Api-Key", &self.api_key)
                .header("X-Goog-FieldMask", field_mask)
                .json(body)
                .send()
                .await?;
            let body = read_json(ProviderKind::GooglePlaces, response).await?;
            check_api_error(&body)?;
            Ok(body)
        })
        .await
    }
}

/// Builds the `searchText` request body for `query`.
///
/// A circle bias is only sent when both a center and a radius are present;
/// the radius is capped at the API's 50 km maximum.
pub(crate) fn build_search_body(query: &ProviderQuery) -> Value {
    let mut body = Map::new();
    body.insert("textQuery".to_owned(), json!(query.text));
    body.insert(
        "maxResultCount".to_owned(),
        json!(query.limit.clamp(1, MAX_RESULTS_PER_PAGE)),
    );
    if !query.region_code.is_empty() {
        body.insert("regionCode".to_owned(), json!(query.region_code));
    }
    if let (Some(center), Some(radius)) = (query.center, query.bias_radius_miles) {
        let meters = miles_to_meters(radius).min(MAX_CIRCLE_RADIUS_METERS);
        body.insert(
            "locationBias".to_owned(),
            json!({
                "circle": {
                    "center": {"latitude": center.lat, "longitude": center.lng},
                    "radius": meters,
                }
            }),
        );
    }
    match &query.cursor {
        Some(PageCursor::Token(token)) => {
            body.insert("pageToken".to_owned(), json!(token));
        }
        Some(PageCursor::Offset(offset)) => {
            tracing::debug!(offset, "offset cursors are not supported by text search; ignoring");
        }
        None => {}
    }
    Value::Object(body)
}

fn check_api_error(body: &Value) -> Result<(), DiscoveryError> {
    if body.get("error").is_some() {
        let message = error_message(body).unwrap_or_else(|| "unknown error".to_owned());
        return Err(DiscoveryError::ProviderApi {
            provider: ProviderKind::GooglePlaces,
            message,
        });
    }
    Ok(())
}

/// Maps a `searchText` response into a page of raw records. Malformed
/// entries are skipped.
pub(crate) fn parse_search_response(body: &Value) -> RawPage {
    let next_token = str_field(body, "nextPageToken");
    let records = body
        .get("places")
        .and_then(Value::as_array)
        .map(|places| {
            places
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
    let location = place.get("location");
    Some(RawProviderRecord {
        external_id: str_field(place, "id"),
        name: place.get("displayName").and_then(|d| str_field(d, "text")),
        address: str_field(place, "formattedAddress"),
        rating: f64_field(place, "rating"),
        latitude: location.and_then(|l| f64_field(l, "latitude")),
        longitude: location.and_then(|l| f64_field(l, "longitude")),
        category: place
            .get("primaryTypeDisplayName")
            .and_then(|d| str_field(d, "text")),
        website: str_field(place, "websiteUri"),
        phone: str_field(place, "nationalPhoneNumber"),
        business_status: str_field(place, "businessStatus"),
        source: ProviderKind::GooglePlaces,
        batch_token: batch_token.map(str::to_owned),
        raw_data: place.clone(),
    })
}

/// Coordinate of the first place in a geocode response.
pub(crate) fn parse_geocode_response(body: &Value) -> Option<Coordinate> {
    let location = body.get("places")?.as_array()?.first()?.get("location")?;
    Some(Coordinate::new(
        f64_field(location, "latitude")?,
        f64_field(location, "longitude")?,
    ))
}

#[async_trait]
impl PlaceProvider for GooglePlacesClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GooglePlaces
    }

    fn max_page_size(&self) -> u32 {
        MAX_RESULTS_PER_PAGE
    }

    async fn fetch_page(&self, query: &ProviderQuery) -> Result<RawPage, DiscoveryError> {
        let body = build_search_body(query);
        tracing::debug!(text = %query.text, biased = query.center.is_some(), "google places text search");
        let response = self.post_search(&body, SEARCH_FIELD_MASK).await?;
        Ok(parse_search_response(&response))
    }
}

#[async_trait]
impl Geocoder for GooglePlacesClient {
    async fn geocode(&self, location: &str) -> Result<Option<Coordinate>, DiscoveryError> {
        let body = json!({ "textQuery": location });
        let response = self.post_search(&body, GEOCODE_FIELD_MASK).await?;
        Ok(parse_geocode_response(&response))
    }
}
