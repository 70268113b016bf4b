//! Choosing how to query a provider for a given radius and resolution state.

use serde::{Deserialize, Serialize};

/// How a search was (or will be) executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One request biased to the requested circle.
    Direct,
    /// Concurrent requests over sub-regions covering a circle too wide to
    /// bias natively. `dense` adds the four diagonal sub-regions.
    Scatter { dense: bool },
    /// Unanchored text query, used when the location did not resolve.
    TextOnly,
    /// The single relaxed request issued after a strict search came back empty.
    ProximityFallback,
    /// Legacy nearby search after every primary provider failed.
    Legacy,
}

impl Strategy {
    /// `true` for strategies that constrain results geometrically, after which
    /// an empty answer earns one proximity fallback.
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Direct | Self::Scatter { .. })
    }
}

/// Picks the primary strategy.
///
/// Returns `None` when the location is unresolved and the radius exceeds the
/// circle-bias ceiling: an unanchored query over that area has unbounded
/// cost, so the caller must refuse it.
#[must_use]
pub fn select_strategy(
    radius_miles: f64,
    center_resolved: bool,
    ceiling_miles: f64,
    dense_threshold_miles: f64,
) -> Option<Strategy> {
    match (center_resolved, radius_miles <= ceiling_miles) {
        (true, true) => Some(Strategy::Direct),
        (true, false) => Some(Strategy::Scatter {
            dense: radius_miles > dense_threshold_miles,
        }),
        (false, true) => Some(Strategy::TextOnly),
        (false, false) => None,
    }
}

/// Natural-language query for a strict direct search.
#[must_use]
pub fn direct_query_text(query: &str, radius_miles: f64, location: &str) -> String {
    format!("{query} within {radius_miles} miles of {location}")
}

/// Query used for text-only searches and the proximity fallback.
#[must_use]
pub fn near_query_text(query: &str, location: &str) -> String {
    format!("{query} near {location}")
}
