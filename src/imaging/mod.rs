//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` decoders, `AnimationDecoder` for GIF / animated WebP |
//! | **Resize** | Lanczos3 cover fit + center crop |
//! | **Crop** | `image::imageops::crop_imm` |
//! | **Quantize** | NeuQuant (`color_quant`), ≤256 colors |
//! | **Encode** | JPEG / PNG / WebP via `image`, GIF via `gif` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and timing math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Palette**: GIF quantization and stream assembly
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
pub mod calculations;
pub mod operations;
pub mod palette;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, Dimensions, EncodedImage, Frame, ImageBackend};
pub use operations::create_thumbnail;
pub use params::{DEFAULT_ANIMATION_DELAY_MS, EncodeParams, OutputFormat, Quality};
pub use rust_backend::RustBackend;
