use std::path::PathBuf;
use std::time::Duration;

use tilepaint_shared::{MAX_ZOOM, MIN_ZOOM, PAINT_MIN_ZOOM};

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_TILE_UPSTREAM_URL: &str = "https://tile.openstreetmap.org";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const TILE_CACHE_CONTROL: &str = "public, max-age=86400";
pub const USER_AGENT: &str = "tilepaint/0.1";

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

/// Raster tile origin, without a trailing slash.
pub fn tile_upstream_url() -> String {
    std::env::var("TILE_UPSTREAM_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_TILE_UPSTREAM_URL.to_string())
}

pub fn static_dir() -> PathBuf {
    std::env::var("STATIC_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
}

pub fn paint_min_zoom() -> u8 {
    std::env::var("PAINT_MIN_ZOOM")
        .ok()
        .and_then(|value| value.parse::<u8>().ok())
        .filter(|value| (MIN_ZOOM..=MAX_ZOOM).contains(value))
        .unwrap_or(PAINT_MIN_ZOOM)
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}
