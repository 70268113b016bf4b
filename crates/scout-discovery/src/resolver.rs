//! Free-text location to coordinate resolution.
//!
//! A small table of frequently searched UK places is consulted first so the
//! common case costs no geocoding request. Everything else goes to the
//! configured [`Geocoder`].

use std::sync::Arc;

use async_trait::async_trait;
use scout_core::Coordinate;

use crate::error::DiscoveryError;
use crate::region::is_uk_alias;

/// A geocoding backend.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinate of the first match for `location`, or `Ok(None)` when the
    /// backend answered but found nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the backend could not be reached or
    /// rejected the request.
    async fn geocode(&self, location: &str) -> Result<Option<Coordinate>, DiscoveryError>;
}

struct KnownLocation {
    name: &'static str,
    coordinate: Coordinate,
}

const KNOWN_LOCATIONS: &[KnownLocation] = &[
    KnownLocation {
        name: "silverstone",
        coordinate: Coordinate::new(52.0733, -1.0146),
    },
    KnownLocation {
        name: "london",
        coordinate: Coordinate::new(51.507, -0.127),
    },
    KnownLocation {
        name: "swindon",
        coordinate: Coordinate::new(51.568, -1.772),
    },
    KnownLocation {
        name: "birmingham",
        coordinate: Coordinate::new(52.486, -1.890),
    },
    KnownLocation {
        name: "manchester",
        coordinate: Coordinate::new(53.480, -2.242),
    },
];

/// Looks `location` up in the built-in table.
///
/// Matches "Swindon", "swindon, uk" or "London, England, UK", but not
/// "London, Ontario": every part after the first must name the UK.
#[must_use]
pub fn known_location(location: &str) -> Option<Coordinate> {
    let lowered = location.trim().to_lowercase();
    let mut parts = lowered.split(',').map(str::trim);
    let head = parts.next()?;
    if !parts.all(is_uk_alias) {
        return None;
    }
    KNOWN_LOCATIONS
        .iter()
        .find(|known| known.name == head)
        .map(|known| known.coordinate)
}

/// Resolves location text, consulting the known-location table before the
/// geocoder.
#[derive(Clone, Default)]
pub struct LocationResolver {
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl LocationResolver {
    #[must_use]
    pub fn new(geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self { geocoder }
    }

    /// Coordinate for `location`, or `None` if it could not be resolved.
    ///
    /// Geocoder failures are logged and reported as unresolved; the caller
    /// decides whether that is fatal.
    pub async fn resolve(&self, location: &str) -> Option<Coordinate> {
        if let Some(coordinate) = known_location(location) {
            tracing::debug!(location, %coordinate, "resolved from known-location table");
            return Some(coordinate);
        }

        let geocoder = self.geocoder.as_ref()?;
        match geocoder.geocode(location).await {
            Ok(Some(coordinate)) if coordinate.is_valid() => {
                tracing::debug!(location, %coordinate, "geocoded location");
                Some(coordinate)
            }
            Ok(Some(coordinate)) => {
                tracing::warn!(location, %coordinate, "geocoder returned out-of-range coordinate");
                None
            }
            Ok(None) => {
                tracing::info!(location, "geocoder found no match");
                None
            }
            Err(e) => {
                tracing::warn!(location, error = %e, "geocoding failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("has_geocoder", &self.geocoder.is_some())
            .finish()
    }
}
