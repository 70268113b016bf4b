//! Integration tests for the provider adapters using wiremock HTTP mocks.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scout_core::{Coordinate, PageCursor, ProviderKind};
use scout_discovery::{
    DiscoveryError, Geocoder, GoogleNearbyClient, GooglePlacesClient, HttpSettings,
    OutscraperClient, PlaceProvider, ProviderQuery, RetryPolicy,
};

const SWINDON: Coordinate = Coordinate::new(51.568, -1.772);

fn http(max_retries: u32) -> HttpSettings {
    HttpSettings {
        timeout_secs: 5,
        user_agent: "scout-test/0.1".to_owned(),
        retry: RetryPolicy {
            max_retries,
            backoff_base_ms: 0,
        },
    }
}

fn query(text: &str) -> ProviderQuery {
    ProviderQuery {
        text: text.to_owned(),
        center: Some(SWINDON),
        bias_radius_miles: Some(20.0),
        limit: 20,
        cursor: None,
        region_code: "GB".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Google Places
// ---------------------------------------------------------------------------

#[tokio::test]
async fn google_sends_key_and_field_mask_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/places:searchText"))
        .and(header("X-Goog-Api-Key", "test-key"))
        .and(body_partial_json(json!({"textQuery": "machining", "maxResultCount": 20})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [{"id": "p1", "displayName": {"text": "Apex"}}],
            "nextPageToken": "tok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GooglePlacesClient::with_base_url("test-key", &http(0), &server.uri()).unwrap();
    let page = client.fetch_page(&query("machining")).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].source, ProviderKind::GooglePlaces);
    assert_eq!(page.next, Some(PageCursor::Token("tok".to_owned())));

    let requests = server.received_requests().await.unwrap();
    let mask = requests[0]
        .headers
        .get("X-Goog-FieldMask")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(mask.contains("places.displayName"));
    assert!(mask.contains("nextPageToken"));
}

#[tokio::test]
async fn google_retries_rate_limit_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/places:searchText"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/places:searchText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"places": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = GooglePlacesClient::with_base_url("test-key", &http(3), &server.uri()).unwrap();
    let page = client.fetch_page(&query("machining")).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn google_auth_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/places:searchText"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "API key not valid. Please pass a valid API key."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GooglePlacesClient::with_base_url("bad-key", &http(3), &server.uri()).unwrap();
    let err = client.fetch_page(&query("machining")).await.unwrap_err();
    match err {
        DiscoveryError::ProviderApi { provider, message } => {
            assert_eq!(provider, ProviderKind::GooglePlaces);
            assert!(message.starts_with("API key not valid"));
        }
        other => panic!("expected ProviderApi, got {other:?}"),
    }
}

#[tokio::test]
async fn google_unparsable_body_is_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/places:searchText"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = GooglePlacesClient::with_base_url("test-key", &http(0), &server.uri()).unwrap();
    let err = client.fetch_page(&query("machining")).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Deserialize { .. }), "got {err:?}");
}

#[tokio::test]
async fn geocode_uses_location_field_mask_and_first_place() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/places:searchText"))
        .and(header("X-Goog-FieldMask", "places.location"))
        .and(body_partial_json(json!({"textQuery": "Leeds, UK"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [{"location": {"latitude": 53.8, "longitude": -1.55}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GooglePlacesClient::with_base_url("test-key", &http(0), &server.uri()).unwrap();
    let coord = client.geocode("Leeds, UK").await.unwrap();
    assert_eq!(coord, Some(Coordinate::new(53.8, -1.55)));
}

// ---------------------------------------------------------------------------
// Outscraper
// ---------------------------------------------------------------------------

#[tokio::test]
async fn outscraper_pages_by_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/search-v3"))
        .and(header("X-API-KEY", "out-key"))
        .and(query_param("skip", "20"))
        .and(query_param("limit", "2"))
        .and(query_param("coordinates", "51.568000,-1.772000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Success",
            "data": [[{"name": "A", "place_id": "a"}, {"name": "B", "place_id": "b"}]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OutscraperClient::with_base_url("out-key", &http(0), &server.uri()).unwrap();
    let mut q = query("fabrication");
    q.limit = 2;
    q.cursor = Some(PageCursor::Offset(20));
    let page = client.fetch_page(&q).await.unwrap();
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.next, Some(PageCursor::Offset(22)));
}

#[tokio::test]
async fn outscraper_unauthorized_is_provider_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/search-v3"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"errorMessage": "Unauthorized"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OutscraperClient::with_base_url("bad", &http(3), &server.uri()).unwrap();
    let err = client.fetch_page(&query("fabrication")).await.unwrap_err();
    assert!(
        matches!(err, DiscoveryError::ProviderApi { ref message, .. } if message == "Unauthorized"),
        "got {err:?}"
    );
}

// ---------------------------------------------------------------------------
// Legacy nearby
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nearby_quota_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OVER_QUERY_LIMIT"})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/nearbysearch/json"))
        .and(query_param("location", "51.568000,-1.772000"))
        .and(query_param("radius", "32187"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ZERO_RESULTS",
            "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GoogleNearbyClient::with_base_url("k", &http(2), &server.uri()).unwrap();
    let page = client.fetch_page(&query("fabrication")).await.unwrap();
    assert!(page.records.is_empty());
    assert!(page.next.is_none());
}

#[tokio::test]
async fn nearby_denied_is_provider_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "This API project is not authorized to use this API."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GoogleNearbyClient::with_base_url("k", &http(3), &server.uri()).unwrap();
    let err = client.fetch_page(&query("fabrication")).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::ProviderApi { provider: ProviderKind::GoogleNearby, .. }));
}
