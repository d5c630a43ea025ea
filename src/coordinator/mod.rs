//! Request orchestration.
//!
//! Coordinators own the order of steps within one request. They hold their
//! collaborators as trait objects so tests can swap the network and the
//! image backend independently.
//!
//! CPU-bound work (decode, resize, quantize, encode) runs inside
//! [`tokio::task::spawn_blocking`]; the only awaits are fetches and upload
//! reads.

mod gif_request;
mod thumbnail;

pub use gif_request::{GifRequestCoordinator, UploadedFrame};
pub use thumbnail::{CacheStatus, ThumbnailCoordinator, ThumbnailOutcome};
