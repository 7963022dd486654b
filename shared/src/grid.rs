//! Constants shared by the map client and the paint backend.

/// Edge length of one raster tile, in pixels.
pub const TILE_SIZE: u32 = 256;
/// Cells per tile edge. A tile is a `GRID_SIZE x GRID_SIZE` grid of cells.
pub const GRID_SIZE: u32 = 16;
pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 18;
/// Lowest integer zoom at which cells are fetched, drawn and painted.
pub const PAINT_MIN_ZOOM: u8 = 15;

/// Edge length of one cell in tile pixels.
pub const fn cell_pixel_size(tile_size: u32, grid_size: u32) -> u32 {
    tile_size / grid_size
}

/// Number of tiles along one axis at `zoom`.
pub const fn tiles_per_axis(zoom: u8) -> i64 {
    1i64 << zoom
}

/// Whether `(x, y)` addresses a real tile at `zoom`.
pub const fn tile_in_range(zoom: u8, x: i64, y: i64) -> bool {
    let n = tiles_per_axis(zoom);
    x >= 0 && y >= 0 && x < n && y < n
}
