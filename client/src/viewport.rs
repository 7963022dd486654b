use crate::config::{DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_ZOOM, MapConfig};
use crate::projection::{
    LatLng, PixelCoordinate, ScreenTransform, TileCoordinate, clamp_lat, lat_lng_to_pixel,
    normalize_lng, world_pixel_to_lat_lng,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Center and fractional zoom of the map.
///
/// Every mutation goes through [`ViewState::clamped`], so the center stays
/// inside the Mercator bounds and zoom inside the configured range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_ZOOM)
    }
}

impl ViewState {
    pub const fn new(center_lat: f64, center_lng: f64, zoom: f64) -> Self {
        Self {
            center_lat,
            center_lng,
            zoom,
        }
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lng)
    }

    pub fn clamped(self, config: &MapConfig) -> Self {
        Self {
            center_lat: clamp_lat(self.center_lat),
            center_lng: normalize_lng(self.center_lng, config.lng_mode),
            zoom: config.clamp_zoom(self.zoom),
        }
    }

    /// Move the center by a screen-space delta at the current zoom.
    /// Positive `dx` moves the center east, positive `dy` south.
    pub fn pan_pixels(&mut self, dx: f64, dy: f64, config: &MapConfig) {
        let base = config.base_zoom(self.zoom) as f64;
        let scale = 2f64.powf(self.zoom - base);
        let tile_size = config.tile_size_f64();
        let center = lat_lng_to_pixel(self.center_lat, self.center_lng, base, tile_size);
        let moved = PixelCoordinate::new(center.x + dx / scale, center.y + dy / scale);
        let at = world_pixel_to_lat_lng(moved, base, tile_size);
        *self = Self::new(at.lat, at.lng, self.zoom).clamped(config);
    }

    /// Set a new zoom while keeping the coordinate under `(anchor_x, anchor_y)` fixed.
    pub fn zoom_at(
        &mut self,
        zoom: f64,
        anchor_x: f64,
        anchor_y: f64,
        screen: ScreenSize,
        config: &MapConfig,
    ) {
        let anchor =
            ScreenTransform::new(self, screen, config).screen_to_lat_lng(anchor_x, anchor_y);
        let zoom = config.clamp_zoom(zoom);

        let base = config.base_zoom(zoom) as f64;
        let scale = 2f64.powf(zoom - base);
        let tile_size = config.tile_size_f64();
        let anchor_px = lat_lng_to_pixel(anchor.lat, anchor.lng, base, tile_size);
        let center_px = PixelCoordinate::new(
            anchor_px.x - (anchor_x - screen.width / 2.0) / scale,
            anchor_px.y - (anchor_y - screen.height / 2.0) / scale,
        );
        let center = world_pixel_to_lat_lng(center_px, base, tile_size);
        *self = Self::new(center.lat, center.lng, zoom).clamped(config);
    }

    /// Wheel zoom: `delta_y < 0` zooms in.
    pub fn zoom_by_wheel(
        &mut self,
        delta_y: f64,
        cursor_x: f64,
        cursor_y: f64,
        screen: ScreenSize,
        config: &MapConfig,
    ) {
        let zoom = self.zoom - delta_y * config.zoom_speed;
        self.zoom_at(zoom, cursor_x, cursor_y, screen, config);
    }

    /// Step the zoom around the screen center.
    pub fn step_zoom(&mut self, step: f64, config: &MapConfig) {
        *self = Self::new(self.center_lat, self.center_lng, self.zoom + step).clamped(config);
    }
}

/// A culled tile and its unscaled position inside the tile container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub tile: TileCoordinate,
    pub left: f64,
    pub top: f64,
}

/// The rectangle of tiles covering the screen for one frame.
///
/// Iteration is row-major and can be restarted any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub transform: ScreenTransform,
    pub start_x: i64,
    pub start_y: i64,
    pub cols: i64,
    pub rows: i64,
}

impl TileGrid {
    pub fn new(view: &ViewState, screen: ScreenSize, config: &MapConfig) -> Self {
        let transform = ScreenTransform::new(view, screen, config);
        let tile_size = transform.tile_size;
        let span = tile_size * transform.scale;
        let margin = config.overdraw_margin.max(0);

        let start_x = (transform.origin.x / tile_size).floor() as i64 - margin;
        let start_y = (transform.origin.y / tile_size).floor() as i64 - margin;
        let cols = (screen.width.max(0.0) / span).ceil() as i64 + 1 + 2 * margin;
        let rows = (screen.height.max(0.0) / span).ceil() as i64 + 1 + 2 * margin;

        Self {
            transform,
            start_x,
            start_y,
            cols,
            rows,
        }
    }

    pub fn base_zoom(&self) -> u8 {
        self.transform.base_zoom
    }

    /// CSS scale applied to the tile container.
    pub fn scale(&self) -> f64 {
        self.transform.scale
    }

    pub fn len(&self) -> usize {
        (self.cols * self.rows) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, tile: TileCoordinate) -> bool {
        tile.zoom == self.transform.base_zoom
            && (self.start_x..self.start_x + self.cols).contains(&tile.x)
            && (self.start_y..self.start_y + self.rows).contains(&tile.y)
    }

    pub fn place(&self, tile: TileCoordinate) -> PlacedTile {
        let tile_size = self.transform.tile_size;
        PlacedTile {
            tile,
            left: tile.x as f64 * tile_size - self.transform.origin.x,
            top: tile.y as f64 * tile_size - self.transform.origin.y,
        }
    }

    pub fn iter(&self) -> TileGridIter<'_> {
        TileGridIter {
            grid: self,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &'a TileGrid {
    type Item = PlacedTile;
    type IntoIter = TileGridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct TileGridIter<'a> {
    grid: &'a TileGrid,
    index: i64,
}

impl Iterator for TileGridIter<'_> {
    type Item = PlacedTile;

    fn next(&mut self) -> Option<PlacedTile> {
        let grid = self.grid;
        if grid.cols <= 0 || self.index >= grid.cols * grid.rows {
            return None;
        }
        let x = grid.start_x + self.index % grid.cols;
        let y = grid.start_y + self.index / grid.cols;
        self.index += 1;
        Some(grid.place(TileCoordinate::new(grid.transform.base_zoom, x, y)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.grid.cols * self.grid.rows - self.index).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileGridIter<'_> {}
