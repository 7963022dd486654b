use tilepaint_shared::{GRID_SIZE, MAX_ZOOM, MIN_ZOOM, PAINT_MIN_ZOOM, TILE_SIZE, cell_pixel_size};

/// Mercator's finite latitude bound.
pub const MAX_LATITUDE: f64 = 85.0511;

pub const DEFAULT_CENTER_LAT: f64 = 35.6762;
pub const DEFAULT_CENTER_LNG: f64 = 139.6503;
pub const DEFAULT_ZOOM: f64 = 16.0;
pub const DEFAULT_PAINT_COLOR: &str = "#FF0000";

/// How longitudes outside `[-180, 180]` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LngMode {
    Clamp,
    Wrap,
}

/// What happens to pending selections whose commit POST fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CommitPolicy {
    /// Clear every pending selection once all POSTs are issued.
    ClearAll,
    /// Clear on issue, then put the cells of failed batches back.
    RetainFailed,
}

/// Raster tile source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TileProvider {
    /// Same-origin `/tiles` proxy.
    Proxy,
    OpenStreetMap,
    CartoLight,
}

impl TileProvider {
    pub const ALL: [TileProvider; 3] = [
        TileProvider::Proxy,
        TileProvider::OpenStreetMap,
        TileProvider::CartoLight,
    ];

    pub fn endpoint(self) -> &'static str {
        match self {
            TileProvider::Proxy => "/tiles",
            TileProvider::OpenStreetMap => "https://tile.openstreetmap.org",
            TileProvider::CartoLight => "https://cartodb-basemaps-a.global.ssl.fastly.net/light_all",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TileProvider::Proxy => "Proxy",
            TileProvider::OpenStreetMap => "OSM",
            TileProvider::CartoLight => "CartoDB",
        }
    }

    pub fn tile_url(self, zoom: u8, x: i64, y: i64) -> String {
        format!("{}/{zoom}/{x}/{y}.png", self.endpoint())
    }
}

/// Everything the map engine needs to know that is not view state.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub tile_size: u32,
    pub grid_size: u32,
    pub paint_min_zoom: u8,
    pub zoom_speed: f64,
    pub redraw_min_interval_ms: f64,
    /// Pointer travel (per axis, exclusive) below which a drag counts as a click.
    pub click_threshold_px: f64,
    /// Extra tiles drawn on every edge of the viewport.
    pub overdraw_margin: i64,
    pub lng_mode: LngMode,
    pub placeholder_color: &'static str,
    pub api_base: String,
    pub tile_provider: TileProvider,
    pub commit_policy: CommitPolicy,
    pub dedupe_paint_fetches: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            tile_size: TILE_SIZE,
            grid_size: GRID_SIZE,
            paint_min_zoom: PAINT_MIN_ZOOM,
            zoom_speed: 0.01,
            redraw_min_interval_ms: 80.0,
            click_threshold_px: 5.0,
            overdraw_margin: 1,
            lng_mode: LngMode::Clamp,
            placeholder_color: "#f2f2f2",
            api_base: String::new(),
            tile_provider: TileProvider::Proxy,
            commit_policy: CommitPolicy::ClearAll,
            dedupe_paint_fetches: true,
        }
    }
}

impl MapConfig {
    pub fn tile_size_f64(&self) -> f64 {
        self.tile_size as f64
    }

    pub fn cell_pixel_size(&self) -> f64 {
        cell_pixel_size(self.tile_size, self.grid_size) as f64
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom as f64, self.max_zoom as f64)
    }

    /// Integer zoom tiles are fetched at for a fractional view zoom.
    pub fn base_zoom(&self, zoom: f64) -> u8 {
        let base = zoom.ceil().clamp(self.min_zoom as f64, self.max_zoom as f64);
        base as u8
    }

    pub fn paint_enabled(&self, base_zoom: u8) -> bool {
        base_zoom >= self.paint_min_zoom
    }

    pub fn paint_url(&self) -> String {
        format!("{}/api/paint", self.api_base)
    }
}
