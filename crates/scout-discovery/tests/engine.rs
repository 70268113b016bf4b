//! End-to-end tests for `DiscoveryEngine::discover` against wiremock
//! stand-ins for every provider.
//!
//! "Swindon, UK" resolves from the built-in location table, so these tests
//! only see geocoding traffic when they ask for it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scout_core::{
    ApiCredentials, AppConfig, Continuation, Environment, PageCursor, ProviderKind, SearchRequest,
};
use scout_discovery::{
    DiscoveryEngine, DiscoveryError, EngineSettings, GoogleNearbyClient, GooglePlacesClient,
    HttpSettings, LocationResolver, OutscraperClient, PlaceProvider, ProviderEndpoints,
    ResultCache, RetryPolicy, Strategy,
};

const SEARCH_PATH: &str = "/v1/places:searchText";
const NEARBY_PATH: &str = "/maps/api/place/nearbysearch/json";

fn http() -> HttpSettings {
    HttpSettings {
        timeout_secs: 5,
        user_agent: "scout-test/0.1".to_owned(),
        retry: RetryPolicy::none(),
    }
}

fn settings() -> EngineSettings {
    EngineSettings {
        inter_page_delay: Duration::ZERO,
        sub_region_timeout: Duration::from_secs(5),
        ..EngineSettings::default()
    }
}

/// Google Places primary with the legacy nearby fallback and Google geocoding.
fn google_engine(server: &MockServer, settings: EngineSettings) -> DiscoveryEngine {
    let google = Arc::new(
        GooglePlacesClient::with_base_url("test-key", &http(), &server.uri())
            .expect("client construction should not fail"),
    );
    let legacy = GoogleNearbyClient::with_base_url("test-key", &http(), &server.uri())
        .expect("client construction should not fail");
    DiscoveryEngine::new(
        settings,
        vec![Arc::clone(&google) as Arc<dyn PlaceProvider>],
        Some(Arc::new(legacy)),
        LocationResolver::new(Some(google)),
        Arc::new(ResultCache::in_memory()),
    )
}

fn place(id: &str, name: &str, lat: f64, lng: f64) -> serde_json::Value {
    json!({
        "id": id,
        "displayName": {"text": name},
        "formattedAddress": format!("{name}, UK"),
        "location": {"latitude": lat, "longitude": lng},
        "businessStatus": "OPERATIONAL"
    })
}

fn places(items: &[serde_json::Value]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "places": items }))
}

// ---------------------------------------------------------------------------
// Direct strategy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn direct_search_issues_one_biased_request_and_enforces_radius() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(header("X-Goog-Api-Key", "test-key"))
        .and(body_partial_json(json!({
            "textQuery": "motorsport within 20 miles of Swindon, UK",
            "regionCode": "GB",
            "locationBias": {"circle": {"center": {"latitude": 51.568, "longitude": -1.772}}}
        })))
        .respond_with(places(&[
            place("far", "Northern Race Works", 53.48, -2.242),
            place("near", "Apex Motorsport", 51.58, -1.78),
            json!({"id": "closed", "displayName": {"text": "Gone Ltd"},
                   "location": {"latitude": 51.57, "longitude": -1.77},
                   "businessStatus": "CLOSED_PERMANENTLY"}),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let outcome = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 20.0, 20))
        .await
        .expect("direct search should succeed");

    assert_eq!(outcome.strategy, Some(Strategy::Direct));
    assert_eq!(outcome.provider, Some(ProviderKind::GooglePlaces));
    assert_eq!(outcome.results.len(), 1);
    let result = &outcome.results[0];
    assert_eq!(result.name, "Apex Motorsport");
    assert!(result.distance_miles.unwrap() <= 20.0 * 1.2);
    assert!(outcome.next_page.is_none());
    assert!(!outcome.from_cache);
}

// ---------------------------------------------------------------------------
// Scatter strategy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wide_radius_scatters_over_nine_sub_regions_and_dedups() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"textQuery": "motorsport"})))
        .respond_with(places(&[
            place("shared", "Apex Motorsport", 51.58, -1.78),
            place("north", "Northern Race Works", 53.48, -2.242),
        ]))
        .expect(9)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let outcome = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 150.0, 50))
        .await
        .expect("scatter search should succeed");

    assert_eq!(outcome.strategy, Some(Strategy::Scatter { dense: true }));
    assert_eq!(outcome.results.len(), 2, "duplicates across sub-regions collapse");
    assert_eq!(outcome.results[0].name, "Apex Motorsport");
    for r in &outcome.results {
        assert!(r.distance_miles.unwrap() <= 150.0);
    }
}

#[tokio::test]
async fn moderate_wide_radius_scatters_over_five_sub_regions() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"textQuery": "motorsport"})))
        .respond_with(places(&[place("shared", "Apex Motorsport", 51.58, -1.78)]))
        .expect(5)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let outcome = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 60.0, 20))
        .await
        .unwrap();
    assert_eq!(outcome.strategy, Some(Strategy::Scatter { dense: false }));
    assert_eq!(outcome.results.len(), 1);
}

#[tokio::test]
async fn failed_sub_regions_do_not_abort_scatter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(4)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(places(&[place("shared", "Apex Motorsport", 51.58, -1.78)]))
        .expect(5)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let outcome = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 150.0, 20))
        .await
        .expect("partial scatter coverage is still a success");
    assert_eq!(outcome.results.len(), 1);
}

// ---------------------------------------------------------------------------
// Proximity fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_strict_search_triggers_exactly_one_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({
            "textQuery": "composites within 10 miles of Swindon, UK"
        })))
        .respond_with(places(&[place("far", "Northern Composites", 53.48, -2.242)]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"textQuery": "composites near Swindon, UK"})))
        .respond_with(places(&[
            place("near", "Swindon Composites", 51.60, -1.75),
            place("far", "Northern Composites", 53.48, -2.242),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let outcome = engine
        .discover(&SearchRequest::new("composites", "Swindon, UK", 10.0, 20))
        .await
        .unwrap();

    assert_eq!(outcome.strategy, Some(Strategy::ProximityFallback));
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].name, "Swindon Composites");
    assert!(outcome.results[0].distance_miles.unwrap() <= 10.0 * 1.1);
}

#[tokio::test]
async fn empty_fallback_is_an_empty_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(places(&[]))
        .expect(2)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let outcome = engine
        .discover(&SearchRequest::new("composites", "Swindon, UK", 10.0, 20))
        .await
        .unwrap();
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.strategy, Some(Strategy::ProximityFallback));
}

// ---------------------------------------------------------------------------
// Unresolved locations
// ---------------------------------------------------------------------------

async fn mount_empty_geocode(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(header("X-Goog-FieldMask", "places.location"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn unresolved_location_is_refused_without_searching() {
    let server = MockServer::start().await;
    mount_empty_geocode(&server).await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"textQuery": "cnc near Atlantis"})))
        .respond_with(places(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let err = engine
        .discover(&SearchRequest::new("cnc", "Atlantis", 100.0, 20))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DiscoveryError::ResolutionFailure { ref location } if location == "Atlantis"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn unresolved_wide_radius_hits_budget_guard_when_degrading_is_allowed() {
    let server = MockServer::start().await;
    mount_empty_geocode(&server).await;

    let engine = google_engine(
        &server,
        EngineSettings {
            require_resolved_location: false,
            ..settings()
        },
    );
    let err = engine
        .discover(&SearchRequest::new("cnc", "Atlantis", 100.0, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::BudgetGuard { .. }), "got {err:?}");
    // Only the geocode request reached the server.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unresolved_small_radius_degrades_to_text_only() {
    let server = MockServer::start().await;
    mount_empty_geocode(&server).await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"textQuery": "cnc near Atlantis"})))
        .respond_with(places(&[place("a", "Atlantis Machining", 10.0, 10.0)]))
        .expect(1)
        .mount(&server)
        .await;

    let engine = google_engine(
        &server,
        EngineSettings {
            require_resolved_location: false,
            ..settings()
        },
    );
    let outcome = engine
        .discover(&SearchRequest::new("cnc", "Atlantis", 10.0, 20))
        .await
        .unwrap();
    assert_eq!(outcome.strategy, Some(Strategy::TextOnly));
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0].distance_miles.is_none());
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_search_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(places(&[place("near", "Apex Motorsport", 51.58, -1.78)]))
        .expect(1)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let first = engine
        .discover(&SearchRequest::new("Motorsport", "Swindon, UK", 20.0, 20))
        .await
        .unwrap();
    let second = engine
        .discover(&SearchRequest::new(" motorsport ", "swindon, uk", 20.0, 20))
        .await
        .unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.results, second.results);
}

#[tokio::test]
async fn invalid_request_is_rejected_before_any_io() {
    let server = MockServer::start().await;
    let engine = google_engine(&server, settings());
    let err = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 20.0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidRequest(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Provider fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn primary_failure_falls_back_to_legacy_nearby() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .and(query_param("keyword", "motorsport"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "place_id": "n1",
                "name": "Apex Motorsport",
                "vicinity": "Swindon",
                "geometry": {"location": {"lat": 51.58, "lng": -1.78}},
                "types": ["point_of_interest"]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let outcome = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 20.0, 20))
        .await
        .expect("legacy fallback should answer");
    assert_eq!(outcome.strategy, Some(Strategy::Legacy));
    assert_eq!(outcome.provider, Some(ProviderKind::GoogleNearby));
    assert_eq!(outcome.results[0].source, ProviderKind::GoogleNearby);
}

#[tokio::test]
async fn every_provider_failing_is_a_hard_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let err = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 20.0, 20))
        .await
        .unwrap_err();
    match err {
        DiscoveryError::AllProvidersFailed { attempts, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, DiscoveryError::UnexpectedStatus { status: 503, .. }));
        }
        other => panic!("expected AllProvidersFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn chain_falls_through_to_second_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/search-v3"))
        .and(header("X-API-KEY", "out-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "data": [[{"name": "Apex Motorsport", "latitude": 51.58, "longitude": -1.78,
                       "place_id": "o1", "full_address": "Swindon"}]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let google = Arc::new(GooglePlacesClient::with_base_url("test-key", &http(), &server.uri()).unwrap());
    let outscraper = Arc::new(OutscraperClient::with_base_url("out-key", &http(), &server.uri()).unwrap());
    let engine = DiscoveryEngine::new(
        settings(),
        vec![google as Arc<dyn PlaceProvider>, outscraper],
        None,
        LocationResolver::default(),
        Arc::new(ResultCache::in_memory()),
    );
    let outcome = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 20.0, 20))
        .await
        .unwrap();
    assert_eq!(outcome.provider, Some(ProviderKind::Outscraper));
    assert_eq!(outcome.results.len(), 1);
}

#[tokio::test]
async fn rejected_request_is_returned_without_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "API key not valid"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NEARBY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "results": []})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/search-v3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let google = Arc::new(GooglePlacesClient::with_base_url("test-key", &http(), &server.uri()).unwrap());
    let outscraper = Arc::new(OutscraperClient::with_base_url("out-key", &http(), &server.uri()).unwrap());
    let legacy = GoogleNearbyClient::with_base_url("test-key", &http(), &server.uri()).unwrap();
    let engine = DiscoveryEngine::new(
        settings(),
        vec![google as Arc<dyn PlaceProvider>, outscraper],
        Some(Arc::new(legacy)),
        LocationResolver::default(),
        Arc::new(ResultCache::in_memory()),
    );
    let err = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 20.0, 20))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DiscoveryError::ProviderApi { provider: ProviderKind::GooglePlaces, ref message } if message == "API key not valid"),
        "got {err:?}"
    );
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

fn paged(items: &[serde_json::Value], next: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "places": items, "nextPageToken": next }))
}

fn token(tok: &str) -> Continuation {
    Continuation {
        provider: ProviderKind::GooglePlaces,
        cursor: PageCursor::Token(tok.to_owned()),
    }
}

#[tokio::test]
async fn direct_search_fetches_one_page_and_hands_back_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(paged(&[place("a", "Apex Engineering", 51.58, -1.78)], "tok-2"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let outcome = engine
        .discover(&SearchRequest::new("engineering", "Swindon, UK", 20.0, 10))
        .await
        .unwrap();

    assert_eq!(outcome.strategy, Some(Strategy::Direct));
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.next_page, Some(token("tok-2")));
}

#[tokio::test]
async fn continuation_follows_pages_up_to_cap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"pageToken": "tok-2"})))
        .respond_with(paged(&[place("a", "Apex Engineering", 51.58, -1.78)], "tok-3"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"pageToken": "tok-3"})))
        .respond_with(paged(&[place("b", "Beta Engineering", 51.59, -1.76)], "tok-4"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = google_engine(
        &server,
        EngineSettings {
            max_pages: 2,
            ..settings()
        },
    );
    let request = SearchRequest::new("engineering", "Swindon, UK", 20.0, 10)
        .with_continuation(token("tok-2"));
    let outcome = engine.discover(&request).await.unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.more_available());
    assert_eq!(outcome.next_page, Some(token("tok-4")));
}

#[tokio::test]
async fn page_overshooting_the_limit_is_deferred_to_the_next_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"pageToken": "tok-2"})))
        .respond_with(paged(&[place("a", "Apex Engineering", 51.58, -1.78)], "tok-3"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"pageToken": "tok-3"})))
        .respond_with(paged(
            &[
                place("b", "Beta Engineering", 51.59, -1.76),
                place("c", "Gamma Engineering", 51.57, -1.77),
            ],
            "tok-4",
        ))
        .expect(2)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let first = engine
        .discover(
            &SearchRequest::new("engineering", "Swindon, UK", 20.0, 2)
                .with_continuation(token("tok-2")),
        )
        .await
        .unwrap();
    let names: Vec<&str> = first.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Apex Engineering"]);
    assert_eq!(first.next_page, Some(token("tok-3")));

    let second = engine
        .discover(
            &SearchRequest::new("engineering", "Swindon, UK", 20.0, 2)
                .with_continuation(token("tok-3")),
        )
        .await
        .unwrap();
    let mut names: Vec<&str> = second.results.iter().map(|r| r.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Beta Engineering", "Gamma Engineering"]);
    assert_eq!(second.next_page, Some(token("tok-4")));
}

#[tokio::test]
async fn continuation_is_sent_to_the_issuing_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({"pageToken": "tok-3"})))
        .respond_with(places(&[place("c", "Gamma Engineering", 51.57, -1.77)]))
        .expect(1)
        .mount(&server)
        .await;

    let engine = google_engine(&server, settings());
    let request = SearchRequest::new("engineering", "Swindon, UK", 20.0, 10).with_continuation(
        Continuation {
            provider: ProviderKind::GooglePlaces,
            cursor: PageCursor::Token("tok-3".to_owned()),
        },
    );
    let outcome = engine.discover(&request).await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.next_page.is_none());
}

#[tokio::test]
async fn continuation_for_unconfigured_provider_is_invalid() {
    let server = MockServer::start().await;
    let engine = google_engine(&server, settings());
    let request = SearchRequest::new("engineering", "Swindon, UK", 20.0, 10).with_continuation(
        Continuation {
            provider: ProviderKind::Outscraper,
            cursor: PageCursor::Offset(20),
        },
    );
    let err = engine.discover(&request).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidRequest(_)));
}

// ---------------------------------------------------------------------------
// Construction from configuration
// ---------------------------------------------------------------------------

fn app_config() -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "debug".to_owned(),
        google_places_api_key: None,
        outscraper_api_key: None,
        providers: vec![ProviderKind::GooglePlaces, ProviderKind::Outscraper],
        home_region: "GB".to_owned(),
        request_timeout_secs: 5,
        user_agent: "scout-test/0.1".to_owned(),
        max_retries: 0,
        retry_backoff_base_ms: 0,
        max_concurrent_requests: 10,
        sub_region_timeout_secs: 5,
        scatter_dense_threshold_miles: 100.0,
        direct_tolerance: 1.2,
        scatter_tolerance: 1.0,
        fallback_tolerance: 1.1,
        fallback_limit: 20,
        max_pages: 3,
        inter_page_delay_ms: 0,
        require_resolved_location: true,
        cache_ttl_secs: 60,
        cache_dir: None,
    }
}

#[test]
fn from_config_without_credentials_fails_fast() {
    let result = DiscoveryEngine::from_config(
        &app_config(),
        &ApiCredentials::default(),
        Arc::new(ResultCache::in_memory()),
    );
    assert!(matches!(result, Err(DiscoveryError::MissingCredentials)));
}

#[test]
fn from_config_without_key_for_any_chained_provider_fails_fast() {
    let config = AppConfig {
        providers: vec![ProviderKind::Outscraper],
        ..app_config()
    };
    let credentials = ApiCredentials {
        google_places: Some("g".to_owned()),
        outscraper: None,
    };
    let result =
        DiscoveryEngine::from_config(&config, &credentials, Arc::new(ResultCache::in_memory()));
    assert!(matches!(result, Err(DiscoveryError::MissingCredentials)));
}

#[tokio::test]
async fn engine_from_config_uses_outscraper_when_only_its_key_is_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/search-v3"))
        .and(query_param("region", "GB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [[{"name": "Apex Motorsport", "latitude": 51.58, "longitude": -1.78}]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = ApiCredentials {
        google_places: None,
        outscraper: Some("out-key".to_owned()),
    };
    let engine = DiscoveryEngine::from_config_with_endpoints(
        &app_config(),
        &credentials,
        Arc::new(ResultCache::in_memory()),
        &ProviderEndpoints::all_at(&server.uri()),
    )
    .unwrap();
    let outcome = engine
        .discover(&SearchRequest::new("motorsport", "Swindon, UK", 20.0, 20))
        .await
        .unwrap();
    assert_eq!(outcome.provider, Some(ProviderKind::Outscraper));
    assert_eq!(outcome.results[0].dedup_key, "geo:apex motorsport@51.5800,-1.7800");
}

#[tokio::test]
async fn disk_cache_is_shared_across_engines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(places(&[place("near", "Apex Motorsport", 51.58, -1.78)]))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let credentials = ApiCredentials {
        google_places: Some("test-key".to_owned()),
        outscraper: None,
    };
    let request = SearchRequest::new("motorsport", "Swindon, UK", 20.0, 20);
    for expect_cached in [false, true] {
        let engine = DiscoveryEngine::from_config_with_endpoints(
            &app_config(),
            &credentials,
            Arc::new(ResultCache::with_dir(dir.path())),
            &ProviderEndpoints::all_at(&server.uri()),
        )
        .unwrap();
        let outcome = engine.discover(&request).await.unwrap();
        assert_eq!(outcome.from_cache, expect_cached);
        assert_eq!(outcome.results.len(), 1);
    }
}
