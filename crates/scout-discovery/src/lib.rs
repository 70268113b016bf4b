//! Location-constrained business discovery: provider adapters, search
//! strategies, result shaping and caching.

pub mod cache;
pub mod engine;
pub mod error;
pub mod geo;
pub mod normalize;
pub mod providers;
pub mod region;
pub mod resolver;
pub(crate) mod retry;
pub(crate) mod scatter;
pub mod strategy;
pub mod types;

pub use cache::{cache_key, ResultCache};
pub use engine::{discover, DiscoveryEngine, EngineSettings, ProviderEndpoints, Tolerances};
pub use error::DiscoveryError;
pub use providers::{
    GoogleNearbyClient, GooglePlacesClient, HttpSettings, OutscraperClient, PlaceProvider,
};
pub use resolver::{Geocoder, LocationResolver};
pub use retry::RetryPolicy;
pub use strategy::Strategy;
pub use types::{DiscoveryOutcome, ProviderQuery, RawPage, RawProviderRecord};
