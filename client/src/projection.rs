//! Web Mercator math: lat/lng, world pixels, tiles and cells.
//!
//! World pixels are measured at an integer zoom `z` where the whole world is
//! `2^z * tile_size` pixels wide. Screen pixels relate to world pixels through
//! a [`ScreenTransform`], which carries the fractional part of the view zoom
//! as a uniform scale.

use std::f64::consts::PI;

use crate::config::{LngMode, MAX_LATITUDE, MapConfig};
use crate::viewport::{ScreenSize, ViewState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCoordinate {
    pub x: f64,
    pub y: f64,
}

impl PixelCoordinate {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A tile address. Also the paint cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoordinate {
    pub zoom: u8,
    pub x: i64,
    pub y: i64,
}

impl TileCoordinate {
    pub const fn new(zoom: u8, x: i64, y: i64) -> Self {
        Self { zoom, x, y }
    }

    pub fn is_valid(self) -> bool {
        tilepaint_shared::tile_in_range(self.zoom, self.x, self.y)
    }

    /// The real tile shown at this layout position, if any.
    ///
    /// Rows past the poles never exist. Columns past the antimeridian exist
    /// only when longitudes wrap.
    pub fn source(self, mode: LngMode) -> Option<TileCoordinate> {
        let n = tilepaint_shared::tiles_per_axis(self.zoom);
        if self.y < 0 || self.y >= n {
            return None;
        }
        match mode {
            LngMode::Clamp => self.is_valid().then_some(self),
            LngMode::Wrap => Some(TileCoordinate {
                x: self.x.rem_euclid(n),
                ..self
            }),
        }
    }

    /// DOM id of the canvas drawing this tile.
    pub fn canvas_id(self) -> String {
        format!("tile-canvas-{}-{}-{}", self.zoom, self.x, self.y)
    }
}

/// A cell inside a tile. Tile coordinates are at the zoom the cell was resolved at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoordinate {
    pub tile_x: i64,
    pub tile_y: i64,
    pub cell_x: u32,
    pub cell_y: u32,
}

pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

pub fn normalize_lng(lng: f64, mode: LngMode) -> f64 {
    match mode {
        LngMode::Clamp => lng.clamp(-180.0, 180.0),
        LngMode::Wrap => {
            let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
            // rem_euclid maps +180 to -180; keep the east edge when it was asked for.
            if wrapped == -180.0 && lng > 0.0 {
                180.0
            } else {
                wrapped
            }
        }
    }
}

/// World size in pixels at `zoom`.
pub fn world_size(zoom: f64, tile_size: f64) -> f64 {
    2f64.powf(zoom) * tile_size
}

/// Project a coordinate to world pixels at `zoom`.
pub fn lat_lng_to_pixel(lat: f64, lng: f64, zoom: f64, tile_size: f64) -> PixelCoordinate {
    let lat_rad = clamp_lat(lat) * PI / 180.0;
    let size = world_size(zoom, tile_size);
    let x = (lng + 180.0) / 360.0 * size;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * size;
    PixelCoordinate::new(x, y)
}

/// Inverse of [`lat_lng_to_pixel`].
pub fn world_pixel_to_lat_lng(pixel: PixelCoordinate, zoom: f64, tile_size: f64) -> LatLng {
    let size = world_size(zoom, tile_size);
    let lng = pixel.x / size * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * pixel.y / size)).sinh().atan();
    LatLng::new(lat_rad * 180.0 / PI, lng)
}

/// Tile containing a world pixel at the same zoom.
pub fn pixel_to_tile(pixel: PixelCoordinate, zoom: u8, tile_size: f64) -> TileCoordinate {
    TileCoordinate::new(
        zoom,
        (pixel.x / tile_size).floor() as i64,
        (pixel.y / tile_size).floor() as i64,
    )
}

/// Tile and cell containing a world pixel.
pub fn pixel_to_cell(pixel: PixelCoordinate, tile_size: f64, cell_size: f64) -> CellCoordinate {
    let tile_x = (pixel.x / tile_size).floor() as i64;
    let tile_y = (pixel.y / tile_size).floor() as i64;
    let cell_x = (pixel.x.rem_euclid(tile_size) / cell_size).floor() as u32;
    let cell_y = (pixel.y.rem_euclid(tile_size) / cell_size).floor() as u32;
    CellCoordinate {
        tile_x,
        tile_y,
        cell_x,
        cell_y,
    }
}

/// Screen ⇄ world mapping for one frame.
///
/// Tiles are laid out at `base_zoom` in unscaled pixels relative to `origin`
/// and the whole container is scaled by `scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    pub base_zoom: u8,
    pub scale: f64,
    /// World pixel (at `base_zoom`) under the top-left screen corner.
    pub origin: PixelCoordinate,
    pub tile_size: f64,
}

impl ScreenTransform {
    pub fn new(view: &ViewState, screen: ScreenSize, config: &MapConfig) -> Self {
        let base_zoom = config.base_zoom(view.zoom);
        let scale = 2f64.powf(view.zoom - base_zoom as f64);
        let tile_size = config.tile_size_f64();
        let center = lat_lng_to_pixel(
            view.center_lat,
            view.center_lng,
            base_zoom as f64,
            tile_size,
        );
        let origin = PixelCoordinate::new(
            center.x - (screen.width / 2.0) / scale,
            center.y - (screen.height / 2.0) / scale,
        );
        Self {
            base_zoom,
            scale,
            origin,
            tile_size,
        }
    }

    pub fn screen_to_world(&self, screen_x: f64, screen_y: f64) -> PixelCoordinate {
        PixelCoordinate::new(
            screen_x / self.scale + self.origin.x,
            screen_y / self.scale + self.origin.y,
        )
    }

    pub fn world_to_screen(&self, pixel: PixelCoordinate) -> (f64, f64) {
        (
            (pixel.x - self.origin.x) * self.scale,
            (pixel.y - self.origin.y) * self.scale,
        )
    }

    pub fn screen_to_lat_lng(&self, screen_x: f64, screen_y: f64) -> LatLng {
        world_pixel_to_lat_lng(
            self.screen_to_world(screen_x, screen_y),
            self.base_zoom as f64,
            self.tile_size,
        )
    }

    pub fn lat_lng_to_screen(&self, at: LatLng) -> (f64, f64) {
        self.world_to_screen(lat_lng_to_pixel(
            at.lat,
            at.lng,
            self.base_zoom as f64,
            self.tile_size,
        ))
    }
}

/// Coordinate under a screen pixel for the given view.
pub fn pixel_to_lat_lng(
    view: &ViewState,
    screen: ScreenSize,
    config: &MapConfig,
    screen_x: f64,
    screen_y: f64,
) -> LatLng {
    ScreenTransform::new(view, screen, config).screen_to_lat_lng(screen_x, screen_y)
}
