//! Service configuration module.
//!
//! Handles loading, validating, and merging the service `config.toml`.
//! Configuration is layered: stock defaults are overridden by an optional
//! user file, and `serve --bind` overrides the listen address last.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [cache]
//! max_bytes = 314572800     # 300 MiB payload budget
//! ttl_secs = 86400          # 24 hours
//! refresh_on_access = false # extend TTL on every hit
//!
//! [fetch]
//! timeout_secs = 15
//! max_source_bytes = 52428800
//! user_agent = "framecache/<version>"
//!
//! [thumbnail]
//! default_width = 350
//! default_height = 350
//! default_quality = 80
//! max_dimension = 4000
//!
//! [gif]
//! max_frames = 20
//! max_frame_bytes = 10485760
//! default_delay_ms = 500
//! min_encoded_delay_ms = 200
//! tolerance = 0.10
//!
//! [resize]
//! width = 350
//! height = 350
//! quality = 80
//!
//! [processing]
//! max_threads = 4           # omit for auto = CPU cores
//! ```
//!
//! Config files are sparse and unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub thumbnail: ThumbnailConfig,
    pub gif: GifConfig,
    pub resize: ResizeConfig,
    pub processing: ProcessingConfig,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.into()));

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "server.bind '{}' is not a socket address",
                self.server.bind
            )));
        }
        if self.cache.max_bytes == 0 {
            return fail("cache.max_bytes must be positive");
        }
        if self.cache.ttl_secs == 0 {
            return fail("cache.ttl_secs must be positive");
        }
        if self.fetch.timeout_secs == 0 {
            return fail("fetch.timeout_secs must be positive");
        }
        if self.fetch.max_source_bytes == 0 {
            return fail("fetch.max_source_bytes must be positive");
        }
        let t = &self.thumbnail;
        if t.max_dimension == 0 {
            return fail("thumbnail.max_dimension must be positive");
        }
        if t.default_width == 0
            || t.default_height == 0
            || t.default_width > t.max_dimension
            || t.default_height > t.max_dimension
        {
            return fail("thumbnail default dimensions must be within 1..=max_dimension");
        }
        if !(1..=100).contains(&t.default_quality) {
            return fail("thumbnail.default_quality must be 1-100");
        }
        let g = &self.gif;
        if g.max_frames == 0 {
            return fail("gif.max_frames must be positive");
        }
        if g.max_frame_bytes == 0 {
            return fail("gif.max_frame_bytes must be positive");
        }
        if !crate::request::FRAME_DELAY_RANGE_MS.contains(&g.default_delay_ms) {
            return fail("gif.default_delay_ms must be 10-10000");
        }
        if g.min_encoded_delay_ms < GIF_DELAY_FLOOR_MS {
            return fail("gif.min_encoded_delay_ms must be at least 200");
        }
        if !(g.tolerance > 0.0 && g.tolerance < 1.0) {
            return fail("gif.tolerance must be in (0, 1)");
        }
        let r = &self.resize;
        if r.width == 0 || r.height == 0 {
            return fail("resize.width and resize.height must be positive");
        }
        if !(1..=100).contains(&r.quality) {
            return fail("resize.quality must be 1-100");
        }
        if self.processing.max_threads == Some(0) {
            return fail("processing.max_threads must be positive when set");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Upper bound on the summed payload size of all entries.
    pub max_bytes: u64,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// When true, a hit restarts the entry's TTL.
    pub refresh_on_access: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 300 * 1024 * 1024,
            ttl_secs: 24 * 60 * 60,
            refresh_on_access: false,
        }
    }
}

/// Source fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Sources larger than this are rejected while streaming.
    pub max_source_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_source_bytes: 50 * 1024 * 1024,
            user_agent: concat!("framecache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Defaults and limits for `/thumbnail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailConfig {
    pub default_width: u32,
    pub default_height: u32,
    pub default_quality: u32,
    /// Largest accepted width or height.
    pub max_dimension: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            default_width: 350,
            default_height: 350,
            default_quality: 80,
            max_dimension: 4000,
        }
    }
}

/// Lowest delay ever written into a composed GIF, in milliseconds.
pub const GIF_DELAY_FLOOR_MS: u32 = 200;

/// Limits and encoding constants for `/create-filtered-gif`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GifConfig {
    pub max_frames: usize,
    pub max_frame_bytes: u64,
    pub default_delay_ms: u32,
    /// Delays below this are raised before encoding. At least
    /// [`GIF_DELAY_FLOOR_MS`].
    pub min_encoded_delay_ms: u32,
    /// Allowed relative deviation from the smallest frame, e.g. `0.10`.
    pub tolerance: f64,
}

impl Default for GifConfig {
    fn default() -> Self {
        Self {
            max_frames: 20,
            max_frame_bytes: 10 * 1024 * 1024,
            default_delay_ms: 500,
            min_encoded_delay_ms: GIF_DELAY_FLOOR_MS,
            tolerance: 0.10,
        }
    }
}

/// Target box for `/resize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            width: 350,
            height: 350,
            quality: 80,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of rayon workers for per-frame work.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ServiceConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the service config, merging an optional file over stock defaults.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# framecache configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
# Listen address. `framecache serve --bind` overrides this.
bind = "127.0.0.1:8080"

# ---------------------------------------------------------------------------
# Result cache
# ---------------------------------------------------------------------------
[cache]
# Total payload budget in bytes (300 MiB).
max_bytes = 314572800

# Entry lifetime in seconds (24 hours).
ttl_secs = 86400

# Restart an entry's lifetime on every hit.
refresh_on_access = false

# ---------------------------------------------------------------------------
# Source fetching
# ---------------------------------------------------------------------------
[fetch]
timeout_secs = 15

# Sources larger than this many bytes are rejected (50 MiB).
max_source_bytes = 52428800

# user_agent = "framecache/x.y.z"

# ---------------------------------------------------------------------------
# /thumbnail defaults and limits
# ---------------------------------------------------------------------------
[thumbnail]
default_width = 350
default_height = 350
default_quality = 80
max_dimension = 4000

# ---------------------------------------------------------------------------
# /create-filtered-gif limits
# ---------------------------------------------------------------------------
[gif]
max_frames = 20

# Per-file upload limit in bytes (10 MiB).
max_frame_bytes = 10485760

# Used when the request carries no frameDelay.
default_delay_ms = 500

# Many viewers ignore very short delays; shorter values are raised to this.
# Must be at least 200.
min_encoded_delay_ms = 200

# Frames may exceed the smallest frame's width/height by at most this ratio.
tolerance = 0.10

# ---------------------------------------------------------------------------
# /resize target box
# ---------------------------------------------------------------------------
[resize]
width = 350
height = 350
quality = 80

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"##
}
