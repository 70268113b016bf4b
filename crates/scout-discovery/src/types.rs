//! Provider-facing request/response shapes and the engine's call outcome.

use scout_core::{BusinessResult, Continuation, Coordinate, PageCursor, ProviderKind};
use serde::{Deserialize, Serialize};

use crate::strategy::Strategy;

/// One record as a provider returned it, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProviderRecord {
    /// Provider-assigned place ID, if available.
    pub external_id: Option<String>,
    /// Display name. Records without one are dropped during normalization.
    pub name: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Provider category/type label.
    pub category: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    /// e.g. `"OPERATIONAL"`, `"CLOSED_PERMANENTLY"`.
    pub business_status: Option<String>,
    pub source: ProviderKind,
    /// Continuation token of the page this record arrived on.
    pub batch_token: Option<String>,
    /// The raw provider JSON object, preserved for debugging.
    pub raw_data: serde_json::Value,
}

impl RawProviderRecord {
    /// Both coordinate components, when the provider supplied a usable pair.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        let coord = Coordinate::new(self.latitude?, self.longitude?);
        coord.is_valid().then_some(coord)
    }
}

/// A single outbound search, already shaped by the chosen strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQuery {
    pub text: String,
    /// Anchor point. Providers that support it bias or anchor results here.
    pub center: Option<Coordinate>,
    /// Circle-bias radius. `None` means no geometric constraint is sent;
    /// providers cap it at their native maximum.
    pub bias_radius_miles: Option<f64>,
    pub limit: u32,
    pub cursor: Option<PageCursor>,
    /// ISO 3166-1 alpha-2 region code.
    pub region_code: String,
}

/// One page of provider output.
#[derive(Debug, Clone, Default)]
pub struct RawPage {
    pub records: Vec<RawProviderRecord>,
    /// Where the following page starts, if the provider says there is one.
    pub next: Option<PageCursor>,
}

/// What one discovery call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    /// Deduplicated, filtered results sorted by ascending distance.
    pub results: Vec<BusinessResult>,
    /// Present when more pages may exist at the provider.
    pub next_page: Option<Continuation>,
    /// Provider that answered, `None` when nothing was fetched.
    pub provider: Option<ProviderKind>,
    /// Strategy whose output became `results`.
    pub strategy: Option<Strategy>,
    pub center: Option<Coordinate>,
    /// `true` when served from the result cache without network I/O.
    #[serde(default)]
    pub from_cache: bool,
}

impl DiscoveryOutcome {
    #[must_use]
    pub fn more_available(&self) -> bool {
        self.next_page.is_some()
    }
}
