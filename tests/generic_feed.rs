//! Integration tests for the generic feed: fetch, normalize, filter.
//!
//! Each test starts its own mock HTTP server serving one of the GeoJSON
//! fixtures, so the full update cycle runs end-to-end.

use chrono::{TimeZone, Utc};
use geojson_generic_feed::{EntryError, GenericFeed, UpdateStatus};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_PATH: &str = "/feeds/majorIncidents.json";

async fn serve_fixture(body: &'static str) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/json"),
        )
        .mount(&mock_server)
        .await;
    mock_server
}

fn feed_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), FEED_PATH)
}

// ============================================================================
// Representation
// ============================================================================

#[test]
fn test_feed_representation() {
    let feed = GenericFeed::new(
        reqwest::Client::new(),
        (-31.0, 151.0),
        "https://www.rfs.nsw.gov.au/feeds/majorIncidents.json",
        None,
    );
    assert_eq!(
        feed.to_string(),
        "<GenericFeed(home=(-31.0, 151.0), \
         url=https://www.rfs.nsw.gov.au/feeds/majorIncidents.json, \
         radius=None)>"
    );
}

#[test]
fn test_feed_representation_with_radius() {
    let feed = GenericFeed::new(
        reqwest::Client::new(),
        (-41.2, 174.7),
        "https://example.com/feed.json",
        Some(120.5),
    );
    assert_eq!(
        feed.to_string(),
        "<GenericFeed(home=(-41.2, 174.7), url=https://example.com/feed.json, radius=120.5)>"
    );
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_ok() {
    let server = serve_fixture(include_str!("fixtures/incidents-1.json")).await;
    let mut feed = GenericFeed::new(reqwest::Client::new(), (-31.0, 151.0), feed_url(&server), None);

    let (status, entries) = feed.update().await.unwrap();
    assert_eq!(status, UpdateStatus::Ok);
    let entries = entries.unwrap();
    assert_eq!(entries.len(), 4);

    let entry = &entries[0];
    assert_eq!(entry.title(), Some("Title 1"));
    assert_eq!(entry.external_id(), "1234");
    assert_eq!(entry.coordinates().unwrap().latitude, -37.2345);
    assert_eq!(entry.coordinates().unwrap().longitude, 149.1234);
    assert!((entry.distance_to_home() - 714.4).abs() < 0.1);
    assert_eq!(entry.to_string(), "<GenericFeedEntry(id=1234)>");
    assert_eq!(
        entry.publication_date(),
        Some(Utc.with_ymd_and_hms(2018, 9, 21, 6, 30, 0).unwrap())
    );
    assert_eq!(
        serde_json::Value::Object(entry.properties().unwrap().clone()),
        serde_json::json!({
            "title": "Title 1",
            "category": "Category 1",
            "guid": "1234",
            "pubDate": "21/09/2018 6:30:00 AM",
            "description": "Description 1"
        })
    );

    let entry = &entries[1];
    assert_eq!(entry.title(), Some("Title 2"));
    assert_eq!(entry.external_id(), "2345");

    let entry = &entries[2];
    assert_eq!(entry.title(), Some("Title 3"));
    assert_eq!(entry.external_id(), "3456");
    assert_eq!(entry.publication_date(), None);

    let entry = &entries[3];
    assert_eq!(entry.title(), Some("Badja Forest Rd, Countegany"));
    assert_eq!(entry.external_id(), "Badja Forest Rd, Countegany");
    assert_eq!(entry.geometries().len(), 4);
    assert!((entry.distance_to_home() - 549.3).abs() < 0.1);

    assert_eq!(
        feed.last_timestamp(),
        Some(Utc.with_ymd_and_hms(2018, 9, 21, 6, 40, 0).unwrap())
    );
}

#[tokio::test]
async fn test_update_with_radius_filter() {
    let server = serve_fixture(include_str!("fixtures/incidents-1.json")).await;
    let mut feed = GenericFeed::new(
        reqwest::Client::new(),
        (-31.0, 151.0),
        feed_url(&server),
        Some(500.0),
    );

    let (status, entries) = feed.update().await.unwrap();
    assert_eq!(status, UpdateStatus::Ok);
    let ids: Vec<_> = entries
        .unwrap()
        .iter()
        .map(|e| e.external_id().to_string())
        .collect();
    assert_eq!(ids, vec!["2345", "3456"]);
}

#[tokio::test]
async fn test_empty_feed() {
    let server = serve_fixture(include_str!("fixtures/incidents-2.json")).await;
    let mut feed = GenericFeed::new(reqwest::Client::new(), (-41.2, 174.7), feed_url(&server), None);

    let (status, entries) = feed.update().await.unwrap();
    assert_eq!(status, UpdateStatus::Ok);
    assert!(entries.unwrap().is_empty());
    assert!(feed.last_timestamp().is_none());
}

#[tokio::test]
async fn test_malformed_publication_date_propagates() {
    let server = serve_fixture(include_str!("fixtures/incidents-bad-date.json")).await;
    let mut feed = GenericFeed::new(reqwest::Client::new(), (-31.0, 151.0), feed_url(&server), None);

    match feed.update().await {
        Err(EntryError::PublicationDate { value, .. }) => assert_eq!(value, "2018-09-21 06:30"),
        other => panic!("Expected PublicationDate error, got {:?}", other.map(|(s, _)| s)),
    }
}

#[tokio::test]
async fn test_http_error_clears_last_timestamp() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(include_str!("fixtures/incidents-1.json")),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut feed = GenericFeed::new(
        reqwest::Client::new(),
        (-31.0, 151.0),
        feed_url(&mock_server),
        None,
    );

    let (status, _) = feed.update().await.unwrap();
    assert_eq!(status, UpdateStatus::Ok);
    assert!(feed.last_timestamp().is_some());

    let (status, entries) = feed.update().await.unwrap();
    assert_eq!(status, UpdateStatus::Error);
    assert!(entries.is_none());
    assert!(feed.last_timestamp().is_none());
}

#[tokio::test]
async fn test_invalid_json_is_error_status() {
    let server = serve_fixture("<html>maintenance</html>").await;
    let mut feed = GenericFeed::new(reqwest::Client::new(), (-31.0, 151.0), feed_url(&server), None);

    let (status, entries) = feed.update().await.unwrap();
    assert_eq!(status, UpdateStatus::Error);
    assert!(entries.is_none());
}
