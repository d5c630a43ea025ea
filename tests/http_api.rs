//! End-to-end tests against the axum router with an in-memory fetcher.
//!
//! Run with: cargo test --test http_api

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::*;
use framecache::config::ServiceConfig;
use std::sync::Arc;

const CAT_URL: &str = "https://img.test/cat.png";
const CAT_QUERY: &str = "url=https%3A%2F%2Fimg.test%2Fcat.png";

fn cat_fetcher() -> Arc<StubFetcher> {
    Arc::new(StubFetcher::default().with(CAT_URL, png(80, 60, [200, 40, 40])))
}

// =========================================================================
// /thumbnail
// =========================================================================

#[tokio::test]
async fn thumbnail_miss_then_hit() {
    let fetcher = cat_fetcher();
    let app = app(Arc::clone(&fetcher));
    let uri = format!("/thumbnail?{CAT_QUERY}&width=40&height=30");

    let first = send(&app, get(&uri)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("x-cache"), Some("MISS"));
    assert_eq!(first.header("content-type"), Some("image/png"));
    assert_eq!(
        first.header("cache-control"),
        Some("public, max-age=31536000, immutable")
    );
    assert_eq!(
        first.header("content-length"),
        Some(first.body.len().to_string().as_str())
    );
    assert!(first.header("etag").is_some());

    let second = send(&app, get(&uri)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.header("x-cache"), Some("HIT"));
    assert_eq!(second.body, first.body);
    assert_eq!(second.header("etag"), first.header("etag"));
    assert_eq!(fetcher.calls(), 1);

    let img = image::load_from_memory(&first.body).unwrap();
    assert_eq!((img.width(), img.height()), (40, 30));
}

#[tokio::test]
async fn thumbnail_defaults_to_350_square() {
    let app = app(cat_fetcher());
    let res = send(&app, get(&format!("/thumbnail?{CAT_QUERY}"))).await;
    assert_eq!(res.status, StatusCode::OK);
    let img = image::load_from_memory(&res.body).unwrap();
    assert_eq!((img.width(), img.height()), (350, 350));
}

#[tokio::test]
async fn thumbnail_explicit_format_overrides_extension() {
    let app = app(cat_fetcher());
    let res = send(
        &app,
        get(&format!("/thumbnail?{CAT_QUERY}&width=20&height=20&format=jpeg&quality=60")),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header("content-type"), Some("image/jpeg"));
    assert!(res.body.starts_with(&[0xFF, 0xD8]));
}

#[tokio::test]
async fn thumbnail_head_returns_headers_only() {
    let app = app(cat_fetcher());
    let request = Request::builder()
        .method("HEAD")
        .uri(format!("/thumbnail?{CAT_QUERY}&width=20&height=20"))
        .body(Body::empty())
        .unwrap();
    let res = send(&app, request).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header("x-cache"), Some("MISS"));
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn thumbnail_missing_url_is_400() {
    let app = app(cat_fetcher());
    let res = send(&app, get("/thumbnail?width=20")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body = res.json();
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn thumbnail_invalid_inputs_are_400() {
    let app = app(cat_fetcher());
    for query in [
        format!("{CAT_QUERY}&format=bmp"),
        format!("{CAT_QUERY}&quality=0"),
        format!("{CAT_QUERY}&width=-5"),
        "url=not%20a%20url".to_string(),
    ] {
        let res = send(&app, get(&format!("/thumbnail?{query}"))).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{query}");
    }
}

#[tokio::test]
async fn thumbnail_post_is_405() {
    let app = app(cat_fetcher());
    let request = Request::builder()
        .method("POST")
        .uri(format!("/thumbnail?{CAT_QUERY}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn thumbnail_fetch_failure_is_500_json() {
    let app = app(cat_fetcher());
    let res = send(
        &app,
        get("/thumbnail?url=https%3A%2F%2Fimg.test%2Fmissing.png"),
    )
    .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json();
    assert_eq!(body["error"], "fetch_error");
    assert!(body["message"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn thumbnail_undecodable_source_is_500_json() {
    let fetcher = Arc::new(StubFetcher::default().with(CAT_URL, b"<html>nope</html>".to_vec()));
    let res = send(&app(fetcher), get(&format!("/thumbnail?{CAT_QUERY}"))).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.json()["error"], "decode_error");
}

#[tokio::test]
async fn thumbnail_larger_than_cache_budget_is_served_uncached() {
    let mut config = ServiceConfig::default();
    config.cache.max_bytes = 16;
    let fetcher = cat_fetcher();
    let app = app_with_config(Arc::clone(&fetcher), config);
    let uri = format!("/thumbnail?{CAT_QUERY}&width=40&height=30");

    assert_eq!(send(&app, get(&uri)).await.header("x-cache"), Some("MISS"));
    assert_eq!(send(&app, get(&uri)).await.header("x-cache"), Some("MISS"));
    assert_eq!(fetcher.calls(), 2);
}

// =========================================================================
// /create-filtered-gif
// =========================================================================

#[tokio::test]
async fn gif_from_four_uniform_frames() {
    let app = app(cat_fetcher());
    let mut parts: Vec<Part> = (0..4u8)
        .map(|i| image_part(i as usize, png(50, 50, [i * 60, 90, 150])))
        .collect();
    parts.push(delay_part("500"));

    let res = send(&app, multipart(parts)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header("content-type"), Some("image/gif"));
    assert!(res.body.starts_with(b"GIF8"));
    assert_eq!(gif_frames(&res.body), vec![50; 4]);
}

#[tokio::test]
async fn gif_accepts_array_field_name() {
    let app = app(cat_fetcher());
    let parts = (0..2)
        .map(|i| Part::File {
            field: "images[]",
            name: format!("f{i}.png"),
            bytes: png(30, 30, [10, 20, 30]),
        })
        .collect();
    let res = send(&app, multipart(parts)).await;
    assert_eq!(res.status, StatusCode::OK);
    // Default delay of 500 ms
    assert_eq!(gif_frames(&res.body), vec![50, 50]);
}

#[tokio::test]
async fn gif_short_delay_is_encoded_at_200ms() {
    let app = app(cat_fetcher());
    let parts = vec![
        image_part(0, png(20, 20, [0, 0, 0])),
        image_part(1, png(20, 20, [255, 255, 255])),
        delay_part("10"),
    ];
    let res = send(&app, multipart(parts)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(gif_frames(&res.body), vec![20, 20]);
}

#[tokio::test]
async fn gif_frames_within_tolerance_are_cropped() {
    let app = app(cat_fetcher());
    let parts = vec![
        image_part(0, png(100, 100, [0, 0, 0])),
        image_part(1, png(100, 100, [0, 0, 0])),
        image_part(2, png(109, 100, [0, 0, 0])),
    ];
    let res = send(&app, multipart(parts)).await;
    assert_eq!(res.status, StatusCode::OK);
    let decoder = gif::DecodeOptions::new().read_info(&res.body[..]).unwrap();
    assert_eq!((decoder.width(), decoder.height()), (100, 100));
}

#[tokio::test]
async fn gif_dimension_mismatch_is_400() {
    let app = app(cat_fetcher());
    let parts = vec![
        image_part(0, png(100, 100, [0, 0, 0])),
        image_part(1, png(100, 100, [0, 0, 0])),
        image_part(2, png(120, 100, [0, 0, 0])),
    ];
    let res = send(&app, multipart(parts)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body = res.json();
    assert_eq!(body["error"], "dimension_mismatch");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("120x100"), "{message}");
    assert!(message.contains("100x100"), "{message}");
}

#[tokio::test]
async fn gif_without_images_is_400() {
    let app = app(cat_fetcher());
    let res = send(&app, multipart(vec![delay_part("500")])).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let message = res.json()["message"].as_str().unwrap().to_string();
    assert!(message.contains("No images"), "{message}");
}

#[tokio::test]
async fn gif_oversized_upload_names_index_and_size() {
    let app = app(cat_fetcher());
    let oversized = 10 * 1024 * 1024 + 1;
    let parts = vec![
        image_part(0, png(20, 20, [0, 0, 0])),
        image_part(1, vec![0u8; oversized]),
    ];
    let res = send(&app, multipart(parts)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let message = res.json()["message"].as_str().unwrap().to_string();
    assert!(message.contains("Image 1"), "{message}");
    assert!(message.contains(&oversized.to_string()), "{message}");
}

#[tokio::test]
async fn gif_too_many_images_is_400() {
    let app = app(cat_fetcher());
    let parts = (0..21).map(|i| image_part(i, png(4, 4, [1, 2, 3]))).collect();
    let res = send(&app, multipart(parts)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gif_delay_below_floor_is_400() {
    let app = app(cat_fetcher());
    for delay in ["5", "10001", "fast"] {
        let parts = vec![image_part(0, png(20, 20, [0, 0, 0])), delay_part(delay)];
        let res = send(&app, multipart(parts)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "frameDelay={delay}");
        assert_eq!(res.json()["error"], "validation_error");
    }
}

#[tokio::test]
async fn gif_get_is_405() {
    let app = app(cat_fetcher());
    assert_eq!(
        send(&app, get("/create-filtered-gif")).await.status,
        StatusCode::METHOD_NOT_ALLOWED
    );
}

#[tokio::test]
async fn gif_non_multipart_body_is_400() {
    let app = app(cat_fetcher());
    let request = Request::builder()
        .method("POST")
        .uri("/create-filtered-gif")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::BAD_REQUEST);
}

// =========================================================================
// /resize
// =========================================================================

fn resize_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/resize")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn resize_returns_base64_jpeg() {
    let app = app(cat_fetcher());
    let res = send(&app, resize_request(&format!(r#"{{"image_url":"{CAT_URL}"}}"#))).await;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json();
    let content = body["content"].as_str().unwrap();
    let data_uri = body["dataURIBase64"].as_str().unwrap();
    assert_eq!(data_uri, format!("data:image/jpeg;base64,{content}"));

    let jpeg = STANDARD.decode(content).unwrap();
    let img = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((img.width(), img.height()), (350, 350));
}

#[tokio::test]
async fn resize_failures_are_500_with_error_message() {
    let app = app(cat_fetcher());
    for body in [
        r#"{"image_url":"https://img.test/missing.png"}"#,
        r#"{"image_url":"not a url"}"#,
        r#"{"wrong":"field"}"#,
    ] {
        let res = send(&app, resize_request(body)).await;
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
        assert!(res.json()["errorMessage"].is_string(), "{body}");
    }
}

// =========================================================================
// /health and /cache/stats
// =========================================================================

#[tokio::test]
async fn health_reports_version() {
    let res = send(&app(cat_fetcher()), get("/health")).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn cache_stats_track_hits_and_misses() {
    let app = app(cat_fetcher());
    let uri = format!("/thumbnail?{CAT_QUERY}&width=16&height=16");
    send(&app, get(&uri)).await;
    send(&app, get(&uri)).await;

    let stats = send(&app, get("/cache/stats")).await.json();
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["entry_count"], 1);
    assert_eq!(stats["max_bytes"], 314_572_800u64);
    assert!(stats["total_bytes"].as_u64().unwrap() > 0);
}
