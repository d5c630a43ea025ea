//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use framecache::config::ServiceConfig;
use framecache::fetch::{FetchError, SourceFetcher};
use framecache::imaging::RustBackend;
use framecache::server::{AppState, create_router};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

pub const BOUNDARY: &str = "framecache-test-boundary";

/// In-memory fetcher: known URLs return their bytes, anything else is a 404.
#[derive(Default)]
pub struct StubFetcher {
    sources: HashMap<String, Bytes>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.sources.insert(url.to_string(), Bytes::from(body));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sources.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

pub fn app(fetcher: Arc<StubFetcher>) -> Router {
    app_with_config(fetcher, ServiceConfig::default())
}

pub fn app_with_config(fetcher: Arc<StubFetcher>, config: ServiceConfig) -> Router {
    let state = AppState::new(config, fetcher, Arc::new(RustBackend::new()));
    create_router(Arc::new(state))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// =========================================================================
// Image fixtures
// =========================================================================

pub fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([
            rgb[0].wrapping_add((x % 32) as u8),
            rgb[1].wrapping_add((y % 32) as u8),
            rgb[2],
            255,
        ])
    });
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    bytes
}

// =========================================================================
// Multipart
// =========================================================================

pub enum Part {
    File { field: &'static str, name: String, bytes: Vec<u8> },
    Text { field: &'static str, value: String },
}

pub fn multipart(parts: Vec<Part>) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File { field, name, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/create-filtered-gif")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn image_part(index: usize, bytes: Vec<u8>) -> Part {
    Part::File {
        field: "images",
        name: format!("frame-{index}.png"),
        bytes,
    }
}

pub fn delay_part(value: &str) -> Part {
    Part::Text {
        field: "frameDelay",
        value: value.to_string(),
    }
}

/// Frame count and delays (centiseconds) of a GIF stream.
pub fn gif_frames(bytes: &[u8]) -> Vec<u16> {
    let mut decoder = gif::DecodeOptions::new().read_info(bytes).unwrap();
    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        delays.push(frame.delay);
    }
    delays
}
