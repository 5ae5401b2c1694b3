//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the search API and run the full
//! crawl cycle end-to-end against a SQLite store on disk.

use geo_sweep::config::{load_config, Config};
use geo_sweep::crawler::crawl;
use geo_sweep::search::SearchError;
use geo_sweep::storage::{open_storage, DedupStore};
use geo_sweep::CrawlError;
use serde_json::{json, Value};
use std::collections::HashSet;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROOT: &str = "0,0~2,1";
const WEST: &str = "0,0~1,1";
const EAST: &str = "1,0~2,1";

/// Writes a configuration pointing at `server` and loads it
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let db_path = dir.path().join("objects.db");
    let config_path = dir.path().join("geo-sweep.toml");
    let content = format!(
        r#"
[api]
base-url = "{}/v1/"
api-key = "test-key"
timeout-secs = 5

[query]
text = "coffee"
lang = "en_US"
type = "biz"
restrict-to-area = true
results = 500

[area]
min = [0.0, 0.0]
max = [2.0, 1.0]

[crawler]
max-workers = 4

[storage]
database-path = "{}"
"#,
        server.uri(),
        db_path.display()
    );
    std::fs::write(&config_path, content).unwrap();
    load_config(&config_path).unwrap()
}

fn feature(id: Option<&str>, name: &str, lon: f64, lat: f64) -> Value {
    let mut company = json!({
        "name": name,
        "address": format!("{} street, 1", name),
        "url": format!("https://{}.example", name.to_lowercase()),
    });
    if let Some(id) = id {
        company["id"] = json!(id);
    }
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [lon, lat] },
        "properties": { "CompanyMetaData": company },
    })
}

fn response(found: u64, features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "properties": {
            "ResponseMetaData": {
                "SearchResponse": { "found": found, "display": "SingleObject" }
            }
        },
        "features": features,
    })
}

async fn mount_bbox(server: &MockServer, bbox: &str, body: Value, expected: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/v1/"))
        .and(query_param("apikey", "test-key"))
        .and(query_param("bbox", bbox))
        .respond_with(ResponseTemplate::new(200).set_body_json(body));
    let mock = match expected {
        Some(n) => mock.expect(n),
        None => mock,
    };
    mock.mount(server).await;
}

/// Root box over the threshold, two halves under it
async fn mount_split_area(server: &MockServer, root_requests: Option<u64>) {
    mount_bbox(server, ROOT, response(1200, vec![]), root_requests).await;
    mount_bbox(
        server,
        WEST,
        response(
            2,
            vec![
                feature(Some("101"), "Alpha", 0.25, 0.5),
                feature(Some("102"), "Bravo", 0.75, 0.5),
            ],
        ),
        None,
    )
    .await;
    mount_bbox(
        server,
        EAST,
        response(1, vec![feature(Some("103"), "Charlie", 1.5, 0.5)]),
        None,
    )
    .await;
}

fn ids(objects: &[geo_sweep::ObjectRecord]) -> HashSet<String> {
    objects
        .iter()
        .map(|o| o.id().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_second_crawl_reports_nothing_new() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);

    // The root is only counted while computing the partition
    mount_split_area(&server, Some(1)).await;

    let (objects, report) = crawl(&config, false).await.unwrap();
    assert_eq!(
        ids(&objects),
        HashSet::from(["101".to_string(), "102".to_string(), "103".to_string()])
    );
    assert_eq!(report.leaves, 2);
    assert!(!report.partition_cached);

    let (objects, report) = crawl(&config, false).await.unwrap();
    assert!(objects.is_empty());
    assert_eq!(report.already_seen, 3);
    assert!(report.partition_cached);

    let store = open_storage(std::path::Path::new(&config.storage.database_path)).unwrap();
    assert_eq!(store.count_objects().unwrap(), 3);
    assert_eq!(store.cached_partition().unwrap().unwrap().leaves.len(), 2);
}

#[tokio::test]
async fn test_clear_reports_everything_again() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);
    mount_split_area(&server, None).await;

    let (first, _) = crawl(&config, false).await.unwrap();
    let (again, report) = crawl(&config, true).await.unwrap();

    assert_eq!(ids(&first), ids(&again));
    assert!(!report.partition_cached);
}

#[tokio::test]
async fn test_record_without_id_is_kept_under_fallback_id() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);
    mount_bbox(
        &server,
        ROOT,
        response(
            2,
            vec![
                feature(None, "Nameless", 0.5, 0.5),
                feature(Some("201"), "Delta", 1.5, 0.5),
            ],
        ),
        None,
    )
    .await;

    let (objects, report) = crawl(&config, false).await.unwrap();

    assert_eq!(objects.len(), 2);
    assert_eq!(report.recovered, 1);

    let recovered = objects
        .iter()
        .find(|o| o.name().unwrap() == "Nameless")
        .unwrap();
    let fallback = recovered.id().unwrap();
    assert_eq!(fallback.len(), 32);

    let store = open_storage(std::path::Path::new(&config.storage.database_path)).unwrap();
    assert!(store.exists(fallback).unwrap());
    assert!(store.exists("201").unwrap());
}

#[tokio::test]
async fn test_feature_with_malformed_metadata_is_dropped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);
    let broken = json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [0.5, 0.5] },
        "properties": { "CompanyMetaData": ["not", "an", "object"] },
    });
    mount_bbox(
        &server,
        ROOT,
        response(2, vec![broken, feature(Some("301"), "Echo", 1.5, 0.5)]),
        None,
    )
    .await;

    let (objects, report) = crawl(&config, false).await.unwrap();

    assert_eq!(ids(&objects), HashSet::from(["301".to_string()]));
    assert_eq!(report.dropped, 1);
}

#[tokio::test]
async fn test_api_error_fails_crawl() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);
    Mock::given(method("GET"))
        .and(path("/v1/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid key"))
        .mount(&server)
        .await;

    let result = crawl(&config, false).await;

    match result {
        Err(CrawlError::Search(SearchError::Rejected { status, message })) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Invalid key");
        }
        other => panic!("expected a rejected search, got {:?}", other.map(|(o, _)| o.len())),
    }

    let store = open_storage(std::path::Path::new(&config.storage.database_path)).unwrap();
    assert_eq!(store.count_objects().unwrap(), 0);
    assert!(store.cached_partition().unwrap().is_none());
}

#[tokio::test]
async fn test_missing_count_accepts_root_as_leaf() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);
    let body = json!({
        "type": "FeatureCollection",
        "properties": {},
        "features": [feature(Some("401"), "Foxtrot", 0.5, 0.5)],
    });
    mount_bbox(&server, ROOT, body, None).await;

    let (objects, report) = crawl(&config, false).await.unwrap();

    assert_eq!(report.leaves, 1);
    assert_eq!(report.partition.unwrap().unavailable_counts, 1);
    assert_eq!(ids(&objects), HashSet::from(["401".to_string()]));
}
