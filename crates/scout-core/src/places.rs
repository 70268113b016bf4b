use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` when both components are finite and inside the valid
    /// latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// External place-search backends the engine knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Places API (New) text search.
    GooglePlaces,
    /// Outscraper coordinate-anchored maps search.
    Outscraper,
    /// Legacy Places keyword nearby search.
    GoogleNearby,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GooglePlaces => "google_places",
            ProviderKind::Outscraper => "outscraper",
            ProviderKind::GoogleNearby => "google_nearby",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google_places" => Ok(ProviderKind::GooglePlaces),
            "outscraper" => Ok(ProviderKind::Outscraper),
            "google_nearby" => Ok(ProviderKind::GoogleNearby),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Where the next page of a result set starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PageCursor {
    /// Opaque provider-issued page token.
    Token(String),
    /// Explicit skip count for providers that paginate by offset.
    Offset(u32),
}

/// A page cursor tagged with the provider that issued it.
///
/// Tokens are only meaningful to the provider that minted them, so a
/// continuation handed back by the caller is always routed to `provider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    pub provider: ProviderKind,
    pub cursor: PageCursor,
}

impl Continuation {
    /// Encodes as `<provider>:token:<value>` or `<provider>:offset:<n>`.
    #[must_use]
    pub fn encode(&self) -> String {
        match &self.cursor {
            PageCursor::Token(token) => format!("{}:token:{token}", self.provider),
            PageCursor::Offset(skip) => format!("{}:offset:{skip}", self.provider),
        }
    }

    /// Inverse of [`Continuation::encode`]. Returns `None` for anything that
    /// does not round-trip.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ':');
        let provider = parts.next()?.parse::<ProviderKind>().ok()?;
        let kind = parts.next()?;
        let value = parts.next()?;
        if value.is_empty() {
            return None;
        }
        let cursor = match kind {
            "token" => PageCursor::Token(value.to_string()),
            "offset" => PageCursor::Offset(value.parse().ok()?),
            _ => return None,
        };
        Some(Self { provider, cursor })
    }
}

impl fmt::Display for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// One discovery call: find `query` businesses within `radius_miles` of
/// `location`, returning at most `limit` results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Category or free-text query, e.g. `"Haulage companies"`.
    pub query: String,
    /// Free-text place name, e.g. `"Swindon, UK"`.
    pub location: String,
    pub radius_miles: f64,
    pub limit: u32,
    pub continuation: Option<Continuation>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: &str, location: &str, radius_miles: f64, limit: u32) -> Self {
        Self {
            query: query.to_string(),
            location: location.to_string(),
            radius_miles,
            limit,
            continuation: None,
        }
    }

    #[must_use]
    pub fn with_continuation(mut self, continuation: Continuation) -> Self {
        self.continuation = Some(continuation);
        self
    }

    /// Checks the request invariants: non-empty query and location, a finite
    /// positive radius, and a positive limit.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason for the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if self.location.trim().is_empty() {
            return Err("location must not be empty".to_string());
        }
        if !self.radius_miles.is_finite() || self.radius_miles <= 0.0 {
            return Err(format!(
                "radius must be a positive number of miles, got {}",
                self.radius_miles
            ));
        }
        if self.limit == 0 {
            return Err("limit must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Canonical, provider-independent business record returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessResult {
    pub name: String,
    pub address: Option<String>,
    pub rating: Option<f64>,
    /// Provider category/type label, e.g. `"Trucking company"`.
    pub category: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub coordinate: Option<Coordinate>,
    /// Great-circle distance from the search center. `None` when either the
    /// center or this record's coordinate is unknown.
    pub distance_miles: Option<f64>,
    pub source: ProviderKind,
    /// Provider id when available, otherwise normalized name plus rounded
    /// coordinate. Equal keys mean the same real-world business.
    pub dedup_key: String,
}

/// API keys for the configured providers, supplied per call.
#[derive(Clone, Default)]
pub struct ApiCredentials {
    pub google_places: Option<String>,
    pub outscraper: Option<String>,
}

impl ApiCredentials {
    /// Returns `true` if no usable key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let blank = |key: &Option<String>| key.as_deref().is_none_or(|k| k.trim().is_empty());
        blank(&self.google_places) && blank(&self.outscraper)
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field(
                "google_places",
                &self.google_places.as_ref().map(|_| "[redacted]"),
            )
            .field("outscraper", &self.outscraper.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}
