mod common;

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use common::{insert_podcast, insert_tag, tag_podcast, test_database, ItemSeed};
use podcast_server::config::Config;
use podcast_server::covers::CoverStorage;
use podcast_server::database::Database;
use podcast_server::feed::FeedGenerator;
use podcast_server::web::{AppState, WebServer};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const BASE_URL: &str = "https://localhost:8080";

async fn test_app() -> (Router, Database) {
    let database = test_database().await;

    let mut config = Config::default();
    config.web.base_url = BASE_URL.to_string();
    // Point storage at nothing so every cover/media lookup misses and
    // redirects fall back to the external URLs.
    config.storage.data_path = PathBuf::from("./target/test-data-does-not-exist");

    let state = AppState {
        database: database.clone(),
        feeds: Arc::new(FeedGenerator::new(&config.web.base_url).expect("base url")),
        covers: Arc::new(CoverStorage::new(
            config.storage.data_path.clone(),
            config.storage.cover_default_name.clone(),
        )),
        config,
    };

    (WebServer::create_router(state), database)
}

// Helper function to send requests to the app
async fn send_request_raw(
    app: &Router,
    method: Method,
    uri: &str,
) -> (StatusCode, HeaderMap, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8_lossy(&body_bytes).to_string();

    (status, headers, body)
}

async fn send_request(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send_request_raw(app, method, uri).await;
    let json: Value = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_str(&body).unwrap_or(json!({}))
    };
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _db) = test_app().await;

    let (status, response) = send_request(&app, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert!(response.get("timestamp").is_some());
}

#[tokio::test]
async fn test_get_podcast_not_found() {
    let (app, _db) = test_app().await;

    let (status, _) = send_request(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{}", Uuid::new_v4()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_podcast_rewrites_cover_url_and_carries_tags() {
    let (app, db) = test_app().await;

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Podcast title", "RSS").await;
    let tag = insert_tag(&db, "Cinema").await;
    tag_podcast(&db, podcast_id, tag).await;

    let (status, response) = send_request(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["title"], "Podcast title");
    assert_eq!(response["type"], "RSS");
    assert_eq!(response["hasToBeDeleted"], true);
    assert_eq!(
        response["cover"]["url"],
        format!("/api/v1/podcasts/{podcast_id}/cover.png")
    );
    assert_eq!(response["tags"][0]["name"], "Cinema");
}

#[tokio::test]
async fn test_list_podcasts_wraps_content() {
    let (app, db) = test_app().await;

    insert_podcast(&db, Uuid::new_v4(), "Podcast second", "RSS").await;
    insert_podcast(&db, Uuid::new_v4(), "Podcast first", "RSS").await;

    let (status, response) = send_request(&app, Method::GET, "/api/v1/podcasts").await;

    assert_eq!(status, StatusCode::OK);
    let content = response["content"].as_array().unwrap();
    assert_eq!(content.len(), 2);
    assert_eq!(content[0]["title"], "Podcast first");
    assert_eq!(content[1]["title"], "Podcast second");
}

#[tokio::test]
async fn test_global_stats_shape_and_empty_case() {
    let (app, db) = test_app().await;

    let (status, response) = send_request(
        &app,
        Method::GET,
        "/api/v1/podcasts/stats/byPubDate?numberOfMonths=3",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["content"], json!([]));

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Tube", "YOUTUBE").await;
    ItemSeed::new(podcast_id, "y1")
        .pub_date(Utc::now() - Duration::days(2))
        .insert(&db)
        .await;

    let (status, response) = send_request(
        &app,
        Method::GET,
        "/api/v1/podcasts/stats/byPubDate?numberOfMonths=3",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let content = response["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["type"], "YOUTUBE");
    assert_eq!(content[0]["values"][0]["numberOfItems"], 1);
    assert!(content[0]["values"][0]["date"].is_string());
}

#[tokio::test]
async fn test_podcast_stats_returns_bare_array() {
    let (app, db) = test_app().await;

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Stats", "RSS").await;
    ItemSeed::new(podcast_id, "one")
        .download_date(Utc::now() - Duration::days(1))
        .insert(&db)
        .await;

    let (status, response) = send_request(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/stats/byDownloadDate?numberOfMonths=1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let values = response.as_array().unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0]["numberOfItems"], 1);
}

#[tokio::test]
async fn test_negative_month_count_is_rejected_before_querying() {
    let (app, _db) = test_app().await;

    let (status, _) = send_request(
        &app,
        Method::GET,
        "/api/v1/podcasts/stats/byCreationDate?numberOfMonths=-1",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparseable_sort_and_status_are_rejected() {
    let (app, db) = test_app().await;

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Sorted", "RSS").await;

    let (status, _) = send_request(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/items?sort=banana,DESC"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_request(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/items?status=BANANA"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_item_search_returns_page_metadata() {
    let (app, db) = test_app().await;

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Paged", "RSS").await;
    let now = Utc::now();
    for n in 0..30 {
        ItemSeed::new(podcast_id, &format!("Foo {n:02}"))
            .pub_date(now - Duration::days(n))
            .insert(&db)
            .await;
    }

    let (status, response) = send_request(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/items?page=1&size=10&sort=pubDate,DESC"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["totalElements"], 30);
    assert_eq!(response["totalPages"], 3);
    assert_eq!(response["number"], 1);
    let content = response["content"].as_array().unwrap();
    assert_eq!(content.len(), 10);
    assert_eq!(content[0]["title"], "Foo 10");
}

#[tokio::test]
async fn test_rss_renders_a_50_item_page_in_pub_date_order() {
    let (app, db) = test_app().await;

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Feed", "RSS").await;
    let now = Utc::now();
    for n in 1..=60u32 {
        ItemSeed::new(podcast_id, &format!("Foo {n:03}"))
            .pub_date(now - Duration::days(i64::from(60 - n)))
            .insert(&db)
            .await;
    }

    let (status, headers, body) = send_request_raw(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/rss"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[axum::http::header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/xml"));

    assert_eq!(body.matches("<item>").count(), 50);
    // Most recently published first; the oldest ten fall off the page.
    let newest = body.find("Foo 060").unwrap();
    let oldest_on_page = body.find("Foo 011").unwrap();
    assert!(newest < oldest_on_page);
    assert!(!body.contains("Foo 010"));
}

#[tokio::test]
async fn test_rss_without_limit_renders_everything() {
    let (app, db) = test_app().await;

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Feed", "RSS").await;
    let now = Utc::now();
    for n in 1..=60u32 {
        ItemSeed::new(podcast_id, &format!("Foo {n:03}"))
            .pub_date(now - Duration::days(i64::from(60 - n)))
            .insert(&db)
            .await;
    }

    let (status, _, body) = send_request_raw(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/rss?limit=false"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("<item>").count(), 60);
}

#[tokio::test]
async fn test_opml_with_no_podcast_has_empty_body() {
    let (app, _db) = test_app().await;

    let (status, headers, body) = send_request_raw(&app, Method::GET, "/api/v1/podcasts/opml").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[axum::http::header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/xml"));
    assert!(body.contains("<body/>"));
    assert!(!body.contains("<outline"));
}

#[tokio::test]
async fn test_opml_lists_every_podcast_in_order() {
    let (app, db) = test_app().await;

    insert_podcast(&db, Uuid::new_v4(), "Podcast second", "RSS").await;
    insert_podcast(&db, Uuid::new_v4(), "Podcast first", "RSS").await;
    insert_podcast(&db, Uuid::new_v4(), "Podcast third", "RSS").await;

    let (status, _, body) = send_request_raw(&app, Method::GET, "/api/v1/podcasts/opml").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("<outline").count(), 3);
    let a = body.find("Podcast first").unwrap();
    let b = body.find("Podcast second").unwrap();
    let c = body.find("Podcast third").unwrap();
    assert!(a < b && b < c);
}

#[tokio::test]
async fn test_cover_redirects_to_external_url_when_not_cached() {
    let (app, db) = test_app().await;

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Podcast title", "RSS").await;

    let (status, headers, _) = send_request_raw(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/cover.png"),
    )
    .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        headers["location"],
        "https://external.domain.tld/cover.png"
    );
}

#[tokio::test]
async fn test_item_media_redirect() {
    let (app, db) = test_app().await;

    let podcast_id = Uuid::new_v4();
    insert_podcast(&db, podcast_id, "Media", "RSS").await;

    let pending = ItemSeed::new(podcast_id, "pending")
        .pub_date(Utc::now())
        .insert(&db)
        .await;
    let downloaded = ItemSeed::new(podcast_id, "downloaded")
        .status(podcast_server::models::Status::Finish)
        .file_name("downloaded.mp4")
        .pub_date(Utc::now())
        .insert(&db)
        .await;

    // Never downloaded: nothing to serve.
    let (status, _, _) = send_request_raw(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/items/{pending}/whatever.mp4"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Downloaded but missing on disk: fall back to the external URL.
    let (status, headers, _) = send_request_raw(
        &app,
        Method::GET,
        &format!("/api/v1/podcasts/{podcast_id}/items/{downloaded}/downloaded.mp4"),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        headers["location"],
        "https://external.domain.tld/downloaded.mp4"
    );
}
