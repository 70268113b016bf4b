//! Search-provider adapters.
//!
//! Each adapter turns a [`ProviderQuery`] into one HTTP request against its
//! backend and maps the response into [`RawProviderRecord`]s. The engine only
//! sees the [`PlaceProvider`] trait, so adapters are interchangeable in the
//! fallback chain.
//!
//! [`RawProviderRecord`]: crate::types::RawProviderRecord

pub mod google_nearby;
pub mod google_places;
pub(crate) mod http;
pub mod outscraper;

use async_trait::async_trait;
use scout_core::ProviderKind;

use crate::error::DiscoveryError;
use crate::geo::meters_to_miles;
use crate::types::{ProviderQuery, RawPage};

pub use google_nearby::GoogleNearbyClient;
pub use google_places::GooglePlacesClient;
pub use http::HttpSettings;
pub use outscraper::OutscraperClient;

/// Largest circle bias the Google endpoints accept, in meters.
pub const MAX_CIRCLE_RADIUS_METERS: f64 = 50_000.0;

/// [`MAX_CIRCLE_RADIUS_METERS`] in miles (about 31.07).
#[must_use]
pub fn max_circle_radius_miles() -> f64 {
    meters_to_miles(MAX_CIRCLE_RADIUS_METERS)
}

/// A place-search backend.
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Largest radius the provider can constrain natively. Wider searches are
    /// scattered over sub-regions no larger than this.
    fn circle_bias_ceiling_miles(&self) -> f64 {
        max_circle_radius_miles()
    }

    /// Most records one page can carry.
    fn max_page_size(&self) -> u32;

    /// `true` if the provider cannot search without a resolved center.
    fn requires_center(&self) -> bool {
        false
    }

    /// Fetches one page of results. Transient failures are retried inside the
    /// adapter.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the request fails after retries or the
    /// provider rejects it.
    async fn fetch_page(&self, query: &ProviderQuery) -> Result<RawPage, DiscoveryError>;
}
