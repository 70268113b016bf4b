//! The discovery engine: cache lookup, location resolution, strategy
//! selection, provider fallback and result shaping for one search.

use std::sync::Arc;
use std::time::Duration;

use scout_core::{
    ApiCredentials, AppConfig, BusinessResult, Continuation, Coordinate, PageCursor, ProviderKind,
    SearchRequest,
};

use crate::cache::{cache_key, ResultCache, DEFAULT_TTL};
use crate::error::DiscoveryError;
use crate::geo::scatter_centers;
use crate::normalize::{filter_and_rank, DistanceBound};
use crate::providers::{
    google_nearby, google_places, outscraper, GoogleNearbyClient, GooglePlacesClient,
    HttpSettings, OutscraperClient, PlaceProvider,
};
use crate::region::region_code_for;
use crate::resolver::{Geocoder, LocationResolver};
use crate::scatter::scatter_fetch;
use crate::strategy::{direct_query_text, near_query_text, select_strategy, Strategy};
use crate::types::{DiscoveryOutcome, ProviderQuery, RawProviderRecord};

/// Distance tolerance multipliers, one per result origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Provider-biased direct, text-only and legacy results.
    pub direct: f64,
    /// Scatter results, which must be geometrically certain.
    pub scatter: f64,
    pub fallback: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            direct: 1.2,
            scatter: 1.0,
            fallback: 1.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub home_region: String,
    pub max_concurrent_requests: usize,
    /// Per-sub-region deadline during scatter.
    pub sub_region_timeout: Duration,
    /// Radius above which scatter adds the diagonal sub-regions.
    pub scatter_dense_threshold_miles: f64,
    pub tolerances: Tolerances,
    /// Result cap for the proximity fallback request.
    pub fallback_limit: u32,
    /// Pages auto-followed per call before handing back a continuation.
    pub max_pages: u32,
    /// Wait before using a freshly issued page token.
    pub inter_page_delay: Duration,
    /// Refuse unresolved locations instead of degrading to text-only search.
    pub require_resolved_location: bool,
    pub cache_ttl: Duration,
}

impl EngineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            home_region: config.home_region.clone(),
            max_concurrent_requests: config.max_concurrent_requests,
            sub_region_timeout: Duration::from_secs(config.sub_region_timeout_secs),
            scatter_dense_threshold_miles: config.scatter_dense_threshold_miles,
            tolerances: Tolerances {
                direct: config.direct_tolerance,
                scatter: config.scatter_tolerance,
                fallback: config.fallback_tolerance,
            },
            fallback_limit: config.fallback_limit,
            max_pages: config.max_pages,
            inter_page_delay: Duration::from_millis(config.inter_page_delay_ms),
            require_resolved_location: config.require_resolved_location,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            home_region: "GB".to_owned(),
            max_concurrent_requests: 10,
            sub_region_timeout: Duration::from_secs(45),
            scatter_dense_threshold_miles: 100.0,
            tolerances: Tolerances::default(),
            fallback_limit: 20,
            max_pages: 3,
            inter_page_delay: Duration::from_secs(2),
            require_resolved_location: true,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

/// Base URLs for each provider. Tests point these at a mock server.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub google_places: String,
    pub outscraper: String,
    pub google_nearby: String,
}

impl ProviderEndpoints {
    /// Every provider served from one base URL.
    #[must_use]
    pub fn all_at(base_url: &str) -> Self {
        Self {
            google_places: base_url.to_owned(),
            outscraper: base_url.to_owned(),
            google_nearby: base_url.to_owned(),
        }
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            google_places: google_places::DEFAULT_BASE_URL.to_owned(),
            outscraper: outscraper::DEFAULT_BASE_URL.to_owned(),
            google_nearby: google_nearby::DEFAULT_BASE_URL.to_owned(),
        }
    }
}

/// Runs discovery searches against a provider chain.
pub struct DiscoveryEngine {
    settings: EngineSettings,
    providers: Vec<Arc<dyn PlaceProvider>>,
    legacy: Option<Arc<dyn PlaceProvider>>,
    resolver: LocationResolver,
    cache: Arc<ResultCache>,
}

/// Where a fetch left off: the raw records gathered and the cursor of the
/// page after them, if any.
type Fetched = (Vec<RawProviderRecord>, Option<PageCursor>);

fn nonblank(key: Option<&String>) -> Option<&str> {
    key.map(|k| k.trim()).filter(|k| !k.is_empty())
}

fn tag_continuation(provider: ProviderKind, cursor: Option<PageCursor>) -> Option<Continuation> {
    cursor.map(|cursor| Continuation { provider, cursor })
}

fn distance_bound(
    center: Option<Coordinate>,
    request: &SearchRequest,
    tolerance: f64,
) -> DistanceBound {
    DistanceBound {
        center,
        radius_miles: request.radius_miles,
        tolerance,
    }
}

fn build_outcome(
    provider: ProviderKind,
    strategy: Strategy,
    center: Option<Coordinate>,
    mut results: Vec<BusinessResult>,
    limit: u32,
    next: Option<PageCursor>,
) -> DiscoveryOutcome {
    results.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    DiscoveryOutcome {
        results,
        next_page: tag_continuation(provider, next),
        provider: Some(provider),
        strategy: Some(strategy),
        center,
        from_cache: false,
    }
}

impl DiscoveryEngine {
    #[must_use]
    pub fn new(
        settings: EngineSettings,
        providers: Vec<Arc<dyn PlaceProvider>>,
        legacy: Option<Arc<dyn PlaceProvider>>,
        resolver: LocationResolver,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            settings,
            providers,
            legacy,
            resolver,
            cache,
        }
    }

    /// Builds the provider chain from `config.providers` and `credentials`.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::MissingCredentials`] if no configured provider has
    ///   a key.
    /// - [`DiscoveryError::Http`] if an HTTP client cannot be constructed.
    pub fn from_config(
        config: &AppConfig,
        credentials: &ApiCredentials,
        cache: Arc<ResultCache>,
    ) -> Result<Self, DiscoveryError> {
        Self::from_config_with_endpoints(config, credentials, cache, &ProviderEndpoints::default())
    }

    /// Like [`DiscoveryEngine::from_config`] with explicit provider base URLs.
    ///
    /// # Errors
    ///
    /// See [`DiscoveryEngine::from_config`]; additionally
    /// [`DiscoveryError::ProviderApi`] if a base URL is invalid.
    pub fn from_config_with_endpoints(
        config: &AppConfig,
        credentials: &ApiCredentials,
        cache: Arc<ResultCache>,
        endpoints: &ProviderEndpoints,
    ) -> Result<Self, DiscoveryError> {
        if credentials.is_empty() {
            return Err(DiscoveryError::MissingCredentials);
        }
        let http = HttpSettings::from_app_config(config);
        let google_key = nonblank(credentials.google_places.as_ref());
        let outscraper_key = nonblank(credentials.outscraper.as_ref());

        let google = google_key
            .map(|key| GooglePlacesClient::with_base_url(key, &http, &endpoints.google_places))
            .transpose()?
            .map(Arc::new);

        let mut providers: Vec<Arc<dyn PlaceProvider>> = Vec::new();
        for kind in &config.providers {
            match kind {
                ProviderKind::GooglePlaces => match &google {
                    Some(client) => providers.push(Arc::clone(client) as Arc<dyn PlaceProvider>),
                    None => tracing::debug!(provider = %kind, "no API key; skipping provider"),
                },
                ProviderKind::Outscraper => match outscraper_key {
                    Some(key) => providers.push(Arc::new(OutscraperClient::with_base_url(
                        key,
                        &http,
                        &endpoints.outscraper,
                    )?)),
                    None => tracing::debug!(provider = %kind, "no API key; skipping provider"),
                },
                // Only ever the last-resort fallback, never part of the chain.
                ProviderKind::GoogleNearby => {}
            }
        }
        if providers.is_empty() {
            return Err(DiscoveryError::MissingCredentials);
        }

        let legacy = google_key
            .map(|key| GoogleNearbyClient::with_base_url(key, &http, &endpoints.google_nearby))
            .transpose()?
            .map(|client| Arc::new(client) as Arc<dyn PlaceProvider>);
        let geocoder = google.map(|client| client as Arc<dyn Geocoder>);

        Ok(Self::new(
            EngineSettings::from_app_config(config),
            providers,
            legacy,
            LocationResolver::new(geocoder),
            cache,
        ))
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Runs one discovery search.
    ///
    /// A fresh cache entry short-circuits everything else. Otherwise the
    /// location is resolved, a strategy is chosen per provider, and providers
    /// are tried in chain order until one answers. A fresh search fetches one
    /// page per request and hands back a continuation; only a continuation
    /// call follows further pages. Transport failures move on to the next
    /// provider and finally the legacy nearby search; a provider rejecting the
    /// request is returned as-is.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::InvalidRequest`] for malformed requests.
    /// - [`DiscoveryError::MissingCredentials`] if no provider is configured.
    /// - [`DiscoveryError::ResolutionFailure`] when the location is required
    ///   to resolve and did not.
    /// - [`DiscoveryError::BudgetGuard`] when an unresolved location would
    ///   need an unbounded query.
    /// - [`DiscoveryError::ProviderApi`] when a provider rejected the request.
    /// - [`DiscoveryError::AllProvidersFailed`] when no provider answered.
    pub async fn discover(&self, request: &SearchRequest) -> Result<DiscoveryOutcome, DiscoveryError> {
        request.validate().map_err(DiscoveryError::InvalidRequest)?;
        if self.providers.is_empty() && self.legacy.is_none() {
            return Err(DiscoveryError::MissingCredentials);
        }

        let key = cache_key(request);
        if let Some(mut hit) = self.cache.get(&key).await {
            tracing::info!(key = %key, results = hit.results.len(), "cache hit");
            hit.from_cache = true;
            return Ok(hit);
        }

        tracing::info!(
            query = %request.query,
            location = %request.location,
            radius_miles = request.radius_miles,
            limit = request.limit,
            "discovery search started"
        );
        let outcome = self.search(request).await?;
        tracing::info!(
            results = outcome.results.len(),
            provider = ?outcome.provider,
            strategy = ?outcome.strategy,
            more_available = outcome.more_available(),
            "discovery search complete"
        );

        self.cache.put(&key, &outcome, self.settings.cache_ttl).await;
        Ok(outcome)
    }

    async fn search(&self, request: &SearchRequest) -> Result<DiscoveryOutcome, DiscoveryError> {
        let region = region_code_for(&request.location, &self.settings.home_region).to_owned();
        let center = self.resolver.resolve(&request.location).await;
        if center.is_none() && self.settings.require_resolved_location {
            return Err(DiscoveryError::ResolutionFailure {
                location: request.location.clone(),
            });
        }

        if let Some(continuation) = &request.continuation {
            return self.continue_search(request, continuation, center, &region).await;
        }

        let mut attempts = 0usize;
        let mut refused = 0usize;
        let mut last_error = None;
        for provider in &self.providers {
            if provider.requires_center() && center.is_none() {
                continue;
            }
            let Some(strategy) = select_strategy(
                request.radius_miles,
                center.is_some(),
                provider.circle_bias_ceiling_miles(),
                self.settings.scatter_dense_threshold_miles,
            ) else {
                refused += 1;
                continue;
            };

            match self
                .run_strategy(provider.as_ref(), strategy, request, center, &region)
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(e) if !e.is_transport() => {
                    tracing::warn!(provider = %provider.kind(), error = %e, "provider rejected the request");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(provider = %provider.kind(), error = %e, "provider failed; trying next");
                    attempts += 1;
                    last_error = Some(e);
                }
            }
        }

        if let (Some(legacy), Some(center)) = (&self.legacy, center) {
            match self.run_legacy(legacy.as_ref(), request, center, &region).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    tracing::warn!(error = %e, "legacy nearby search failed");
                    attempts += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(DiscoveryError::AllProvidersFailed {
                attempts,
                last: Box::new(last),
            }),
            None if refused > 0 => Err(DiscoveryError::BudgetGuard {
                location: request.location.clone(),
                radius_miles: request.radius_miles,
            }),
            None => Err(DiscoveryError::ResolutionFailure {
                location: request.location.clone(),
            }),
        }
    }

    async fn run_strategy(
        &self,
        provider: &dyn PlaceProvider,
        strategy: Strategy,
        request: &SearchRequest,
        center: Option<Coordinate>,
        region: &str,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        tracing::debug!(provider = %provider.kind(), ?strategy, "running strategy");
        let page_limit = request.limit.min(provider.max_page_size());

        let (results, next) = match (strategy, center) {
            (Strategy::Scatter { dense }, Some(center)) => {
                let ceiling = provider.circle_bias_ceiling_miles();
                let queries = scatter_centers(center, request.radius_miles, dense)
                    .into_iter()
                    .map(|point| ProviderQuery {
                        text: request.query.clone(),
                        center: Some(point),
                        bias_radius_miles: Some(ceiling),
                        limit: page_limit,
                        cursor: None,
                        region_code: region.to_owned(),
                    })
                    .collect();
                let records = scatter_fetch(
                    provider,
                    queries,
                    self.settings.max_concurrent_requests,
                    self.settings.sub_region_timeout,
                )
                .await?;
                let bound = distance_bound(Some(center), request, self.settings.tolerances.scatter);
                (filter_and_rank(&records, bound), None)
            }
            (Strategy::TextOnly, _) | (_, None) => {
                let query = ProviderQuery {
                    text: near_query_text(&request.query, &request.location),
                    center: None,
                    bias_radius_miles: None,
                    limit: page_limit,
                    cursor: None,
                    region_code: region.to_owned(),
                };
                let bound = distance_bound(None, request, self.settings.tolerances.direct);
                let page = provider.fetch_page(&query).await?;
                (filter_and_rank(&page.records, bound), page.next)
            }
            (_, Some(center)) => {
                let query = ProviderQuery {
                    text: direct_query_text(&request.query, request.radius_miles, &request.location),
                    center: Some(center),
                    bias_radius_miles: Some(request.radius_miles),
                    limit: page_limit,
                    cursor: None,
                    region_code: region.to_owned(),
                };
                let bound = distance_bound(Some(center), request, self.settings.tolerances.direct);
                let page = provider.fetch_page(&query).await?;
                (filter_and_rank(&page.records, bound), page.next)
            }
        };

        if results.is_empty() && strategy.is_strict() {
            tracing::info!(provider = %provider.kind(), ?strategy, "strict search empty after filtering; trying proximity fallback");
            return Ok(self.proximity_fallback(provider, request, center, region).await);
        }

        Ok(build_outcome(provider.kind(), strategy, center, results, request.limit, next))
    }

    /// One relaxed request without the strict radius constraint. The
    /// normalizer's distance filter alone enforces the radius. Failure here
    /// yields an empty answer rather than an error: the strict search already
    /// succeeded.
    async fn proximity_fallback(
        &self,
        provider: &dyn PlaceProvider,
        request: &SearchRequest,
        center: Option<Coordinate>,
        region: &str,
    ) -> DiscoveryOutcome {
        let limit = request
            .limit
            .min(self.settings.fallback_limit)
            .min(provider.max_page_size())
            .max(1);
        let query = ProviderQuery {
            text: near_query_text(&request.query, &request.location),
            center,
            bias_radius_miles: None,
            limit,
            cursor: None,
            region_code: region.to_owned(),
        };
        let bound = distance_bound(center, request, self.settings.tolerances.fallback);

        let results = match provider.fetch_page(&query).await {
            Ok(page) => filter_and_rank(&page.records, bound),
            Err(e) => {
                tracing::warn!(provider = %provider.kind(), error = %e, "proximity fallback failed");
                Vec::new()
            }
        };
        build_outcome(
            provider.kind(),
            Strategy::ProximityFallback,
            center,
            results,
            limit,
            None,
        )
    }

    async fn run_legacy(
        &self,
        legacy: &dyn PlaceProvider,
        request: &SearchRequest,
        center: Coordinate,
        region: &str,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        tracing::info!(provider = %legacy.kind(), "falling back to legacy nearby search");
        let query = ProviderQuery {
            text: request.query.clone(),
            center: Some(center),
            bias_radius_miles: Some(request.radius_miles.min(legacy.circle_bias_ceiling_miles())),
            limit: request.limit.min(legacy.max_page_size()),
            cursor: None,
            region_code: region.to_owned(),
        };
        let bound = distance_bound(Some(center), request, self.settings.tolerances.direct);
        let page = legacy.fetch_page(&query).await?;
        let results = filter_and_rank(&page.records, bound);
        Ok(build_outcome(legacy.kind(), Strategy::Legacy, Some(center), results, request.limit, page.next))
    }

    /// Resumes from a continuation, always against the provider that issued it.
    async fn continue_search(
        &self,
        request: &SearchRequest,
        continuation: &Continuation,
        center: Option<Coordinate>,
        region: &str,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        let provider = self
            .providers
            .iter()
            .chain(self.legacy.iter())
            .find(|p| p.kind() == continuation.provider)
            .ok_or_else(|| {
                DiscoveryError::InvalidRequest(format!(
                    "continuation was issued by {}, which is not configured",
                    continuation.provider
                ))
            })?;

        if center.is_none() {
            if provider.requires_center() {
                return Err(DiscoveryError::ResolutionFailure {
                    location: request.location.clone(),
                });
            }
            if request.radius_miles > provider.circle_bias_ceiling_miles() {
                return Err(DiscoveryError::BudgetGuard {
                    location: request.location.clone(),
                    radius_miles: request.radius_miles,
                });
            }
        }

        let legacy = provider.kind() == ProviderKind::GoogleNearby;
        let (strategy, text, bias) = match center {
            Some(_) if legacy => (
                Strategy::Legacy,
                request.query.clone(),
                Some(request.radius_miles.min(provider.circle_bias_ceiling_miles())),
            ),
            Some(_) => (
                Strategy::Direct,
                direct_query_text(&request.query, request.radius_miles, &request.location),
                Some(request.radius_miles),
            ),
            None => (
                Strategy::TextOnly,
                near_query_text(&request.query, &request.location),
                None,
            ),
        };
        let query = ProviderQuery {
            text,
            center: if bias.is_some() { center } else { None },
            bias_radius_miles: bias,
            limit: request.limit.min(provider.max_page_size()),
            cursor: Some(continuation.cursor.clone()),
            region_code: region.to_owned(),
        };
        let bound = distance_bound(center, request, self.settings.tolerances.direct);

        tracing::debug!(provider = %provider.kind(), continuation = %continuation, "resuming paged search");
        let (records, next) = self
            .fetch_pages(provider.as_ref(), query, request.limit, bound)
            .await
            .map_err(|e| {
                if e.is_transport() {
                    DiscoveryError::AllProvidersFailed {
                        attempts: 1,
                        last: Box::new(e),
                    }
                } else {
                    e
                }
            })?;
        let results = filter_and_rank(&records, bound);
        Ok(build_outcome(provider.kind(), strategy, center, results, request.limit, next))
    }

    /// Fetches pages from the continuation onward until `want` results
    /// survive filtering, the provider stops returning cursors, or the page
    /// cap is reached.
    ///
    /// A page that would push the result count past `want` is left for the
    /// next call and its cursor handed back, so nothing behind the returned
    /// continuation is dropped. A failure on the first page is an error; a
    /// failure on a later page keeps what was gathered and hands back the
    /// failed page's cursor.
    async fn fetch_pages(
        &self,
        provider: &dyn PlaceProvider,
        mut query: ProviderQuery,
        want: u32,
        bound: DistanceBound,
    ) -> Result<Fetched, DiscoveryError> {
        let max_pages = self.settings.max_pages.max(1);
        let want = usize::try_from(want).unwrap_or(usize::MAX);
        let mut records = Vec::new();
        let mut kept = 0usize;
        let mut pages = 0u32;

        loop {
            let page = match provider.fetch_page(&query).await {
                Ok(page) => page,
                Err(e) if pages == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!(provider = %provider.kind(), page = pages + 1, error = %e, "page fetch failed; returning partial results");
                    return Ok((records, query.cursor));
                }
            };

            let before = records.len();
            records.extend(page.records);
            let now_kept = filter_and_rank(&records, bound).len();
            if kept > 0 && now_kept > want {
                tracing::debug!(provider = %provider.kind(), kept, "next page overshoots the limit; deferring it");
                records.truncate(before);
                return Ok((records, query.cursor));
            }
            pages += 1;
            kept = now_kept;

            let Some(next) = page.next else {
                return Ok((records, None));
            };
            if kept >= want {
                return Ok((records, Some(next)));
            }
            if pages >= max_pages {
                tracing::info!(provider = %provider.kind(), pages, "page cap reached; more results available");
                return Ok((records, Some(next)));
            }

            // Page tokens are not valid immediately after issue.
            if matches!(next, PageCursor::Token(_)) && !self.settings.inter_page_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_page_delay).await;
            }
            query.cursor = Some(next);
        }
    }
}

/// Builds an engine from `config` and runs one search with `credentials`.
///
/// # Errors
///
/// See [`DiscoveryEngine::from_config`] and [`DiscoveryEngine::discover`].
pub async fn discover(
    config: &AppConfig,
    cache: Arc<ResultCache>,
    request: &SearchRequest,
    credentials: &ApiCredentials,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    request.validate().map_err(DiscoveryError::InvalidRequest)?;
    let engine = DiscoveryEngine::from_config(config, credentials, cache)?;
    engine.discover(request).await
}
