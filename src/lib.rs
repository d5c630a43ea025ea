//! # framecache
//!
//! An HTTP service that serves processed image variants: resized thumbnails
//! of remote images, and animated GIFs assembled from frames the client has
//! already filtered. Decode and encode are expensive, so thumbnail results are
//! kept in a bounded in-memory cache keyed on every transform parameter.
//!
//! # Architecture: Two Pipelines, One Cache
//!
//! ```text
//! GET /thumbnail           key → cache ─hit──────────────────────────────→ bytes
//!                                    └miss→ fetch → decode → cover fit → encode → put
//!
//! POST /create-filtered-gif  uploads → validate → decode → audit → crop → quantize → GIF
//! ```
//!
//! Both pipelines run their pixel work on blocking threads. The only suspension
//! points are network fetches and upload reads.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | Typed requests validated at the boundary; [`request::CacheKey`] derivation |
//! | [`cache`] | [`cache::CacheStore`]: byte budget, TTL, strict LRU |
//! | [`fetch`] | [`fetch::SourceFetcher`] seam and the `reqwest` implementation |
//! | [`imaging`] | Decode, cover-fit resize, crop, palette quantization, encode |
//! | [`compose`] | [`compose::GifComposer`]: dimension audit through GIF assembly |
//! | [`coordinator`] | Step ordering for each pipeline, upload cleanup |
//! | [`server`] | axum router, handlers, multipart intake |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`error`] | [`error::PipelineError`] and its HTTP mapping |
//!
//! # Design Decisions
//!
//! ## Explicitly Owned Cache
//!
//! The [`cache::CacheStore`] is constructed in `main`, wrapped in an `Arc`, and
//! handed to the thumbnail coordinator through [`server::AppState`]. Tests
//! build their own stores with small budgets and injected clocks.
//!
//! ## Crop, Never Rescale, GIF Frames
//!
//! Uploaded frames are already filtered by the client. Rescaling would blur
//! them, so frames within 10% of the smallest size are cropped flush left and
//! centered vertically. Larger differences are rejected with the offending
//! frame index and both sizes.
//!
//! ## No Request Coalescing
//!
//! Concurrent misses for the same key each fetch and transcode independently.
//! The cache stays correct (the last `put` replaces the entry) at the cost of
//! duplicated work under bursts of identical requests.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for codecs and Lanczos3
//! resampling, and `color_quant`/`gif` for palette reduction and GIF assembly.
//! No system libraries are required.

pub mod cache;
pub mod compose;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod imaging;
pub mod request;
pub mod server;

#[cfg(test)]
pub(crate) mod test_helpers;
