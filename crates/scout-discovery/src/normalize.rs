//! Normalization from raw provider records to [`scout_core::BusinessResult`].
//!
//! The pipeline drops unusable and noise records, annotates and enforces
//! distance, deduplicates across every batch, then sorts nearest first.

use std::collections::HashSet;

use scout_core::{BusinessResult, Coordinate};

use crate::geo::distance_miles;
use crate::types::RawProviderRecord;

/// Case-insensitive substrings of name or category that mark consumer
/// services irrelevant to B2B prospecting.
pub const NOISE_TERMS: &[&str] = &[
    "courier",
    "parcel",
    "delivery service",
    "taxi",
    "cab service",
    "minicab",
    "chauffeur",
    "restaurant",
    "takeaway",
    "take away",
    "fast food",
    "cafe",
    "café",
    "coffee shop",
    "pizza",
    "kebab",
    "fish and chips",
    "self storage",
    "self-storage",
    "storage unit",
    "car repair",
    "auto repair",
    "car wash",
    "tyre",
    "tire shop",
    "mot centre",
    "mot test",
];

const CLOSED_STATUSES: &[&str] = &["CLOSED_TEMPORARILY", "CLOSED_PERMANENTLY"];

/// Decimal places kept when a coordinate becomes part of a dedup key
/// (about 11 m).
const KEY_COORD_PRECISION: usize = 4;

/// Geometry a batch is filtered against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBound {
    pub center: Option<Coordinate>,
    pub radius_miles: f64,
    /// Multiplier on `radius_miles` before a result is rejected.
    pub tolerance: f64,
}

impl DistanceBound {
    #[must_use]
    pub fn max_miles(&self) -> f64 {
        self.radius_miles * self.tolerance
    }
}

/// `true` if the name or category contains a noise term.
#[must_use]
pub fn is_noise(name: &str, category: Option<&str>) -> bool {
    let haystack = format!("{} {}", name, category.unwrap_or_default()).to_lowercase();
    NOISE_TERMS.iter().any(|term| haystack.contains(term))
}

fn is_closed(status: Option<&str>) -> bool {
    status.is_some_and(|s| CLOSED_STATUSES.contains(&s))
}

/// Lowercases and collapses everything but letters and digits to single
/// spaces.
fn normalize_text(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identity of a record for deduplication.
///
/// The provider's place ID when present; otherwise the normalized name
/// combined with the coordinate rounded to ~11 m, or with the normalized
/// address when there is no coordinate.
#[must_use]
pub fn dedup_key(record: &RawProviderRecord) -> String {
    if let Some(id) = &record.external_id {
        return format!("id:{id}");
    }
    let name = normalize_text(record.name.as_deref().unwrap_or_default());
    if let Some(coord) = record.coordinate() {
        return format!(
            "geo:{name}@{:.p$},{:.p$}",
            coord.lat,
            coord.lng,
            p = KEY_COORD_PRECISION
        );
    }
    match record.address.as_deref().map(normalize_text) {
        Some(address) if !address.is_empty() => format!("addr:{name}|{address}"),
        _ => format!("name:{name}"),
    }
}

/// Maps one raw record into a [`BusinessResult`] without distance.
///
/// Returns `None` for records with no usable name, closed businesses, and
/// noise categories.
#[must_use]
pub fn normalize_record(record: &RawProviderRecord) -> Option<BusinessResult> {
    let name = record.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
    if is_closed(record.business_status.as_deref()) {
        return None;
    }
    if is_noise(name, record.category.as_deref()) {
        return None;
    }
    Some(BusinessResult {
        name: name.to_owned(),
        address: record.address.clone(),
        rating: record.rating,
        category: record.category.clone(),
        website: record.website.clone(),
        phone: record.phone.clone(),
        coordinate: record.coordinate(),
        distance_miles: None,
        source: record.source,
        dedup_key: dedup_key(record),
    })
}

/// Runs the full pipeline over every record of a search, in arrival order.
///
/// Records whose distance exceeds the bound are rejected; records without a
/// coordinate (or searches without a center) keep `distance_miles = None`
/// and sort last. The first record seen for each dedup key wins.
#[must_use]
pub fn filter_and_rank(records: &[RawProviderRecord], bound: DistanceBound) -> Vec<BusinessResult> {
    let max_miles = bound.max_miles();
    let mut seen = HashSet::new();
    let mut results: Vec<BusinessResult> = records
        .iter()
        .filter_map(normalize_record)
        .filter_map(|mut result| {
            if let (Some(center), Some(coord)) = (bound.center, result.coordinate) {
                let d = distance_miles(center, coord);
                if d > max_miles {
                    return None;
                }
                result.distance_miles = Some(d);
            }
            Some(result)
        })
        .filter(|result| seen.insert(result.dedup_key.clone()))
        .collect();

    // Stable: equal distances keep arrival order.
    results.sort_by(|a, b| match (a.distance_miles, b.distance_miles) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    results
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
