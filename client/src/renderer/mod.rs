pub mod canvas2d;

use tilepaint_shared::TileCell;

use crate::config::MapConfig;
use crate::paint::{PaintCache, SelectionStore};
use crate::projection::TileCoordinate;

/// Drawing surface of a single tile, in tile-local pixels.
pub trait Renderer {
    type Image;

    fn clear(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);
    fn draw_image(&mut self, image: &Self::Image, x: f64, y: f64, w: f64, h: f64);
}

/// Everything needed to paint one tile's layers.
///
/// `tile` is the source tile (after longitude wrapping); `None` marks a layout
/// slot outside the world, which only ever shows the placeholder.
#[derive(Clone, Copy)]
pub struct TileLayers<'a> {
    pub config: &'a MapConfig,
    pub cache: &'a PaintCache,
    pub selections: &'a SelectionStore,
}

impl TileLayers<'_> {
    fn paint_enabled(&self, tile: Option<TileCoordinate>) -> Option<TileCoordinate> {
        tile.filter(|t| self.config.paint_enabled(t.zoom))
    }

    /// Placeholder, then whatever paint is already known.
    pub fn draw_initial<R: Renderer>(&self, renderer: &mut R, tile: Option<TileCoordinate>) {
        let size = self.config.tile_size_f64();
        renderer.clear(0.0, 0.0, size, size);
        renderer.fill_rect(0.0, 0.0, size, size, self.config.placeholder_color);
        self.draw_overlay(renderer, tile);
    }

    /// Background raster arrived: image first, overlay back on top.
    pub fn draw_loaded<R: Renderer>(
        &self,
        renderer: &mut R,
        tile: Option<TileCoordinate>,
        image: &R::Image,
    ) {
        let size = self.config.tile_size_f64();
        renderer.draw_image(image, 0.0, 0.0, size, size);
        self.draw_overlay(renderer, tile);
    }

    /// Committed cells, then pending selections. Nothing below the paint zoom.
    pub fn draw_overlay<R: Renderer>(&self, renderer: &mut R, tile: Option<TileCoordinate>) {
        let Some(tile) = self.paint_enabled(tile) else {
            return;
        };
        let cell = self.config.cell_pixel_size();
        if let Some(cells) = self.cache.get(tile) {
            draw_cells(renderer, cells, cell);
        }
        for (key, color) in self.selections.for_tile(tile) {
            fill_cell(renderer, key.cell_x, key.cell_y, cell, color);
        }
    }
}

pub fn draw_cells<R: Renderer>(renderer: &mut R, cells: &[TileCell], cell_size: f64) {
    for cell in cells {
        fill_cell(renderer, cell.cell_x, cell.cell_y, cell_size, &cell.color);
    }
}

pub fn fill_cell<R: Renderer>(
    renderer: &mut R,
    cell_x: u32,
    cell_y: u32,
    cell_size: f64,
    color: &str,
) {
    renderer.fill_rect(
        cell_x as f64 * cell_size,
        cell_y as f64 * cell_size,
        cell_size,
        cell_size,
        color,
    );
}

#[cfg(test)]
pub(crate) mod recording {
    use super::Renderer;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Clear,
        Fill { x: f64, y: f64, w: f64, h: f64, color: String },
        Image(&'static str),
    }

    /// Renderer that remembers every call.
    #[derive(Debug, Default)]
    pub struct RecordingRenderer {
        pub ops: Vec<Op>,
    }

    impl RecordingRenderer {
        pub fn fills(&self) -> Vec<(f64, f64, &str)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Fill { x, y, color, .. } => Some((*x, *y, color.as_str())),
                    _ => None,
                })
                .collect()
        }
    }

    impl Renderer for RecordingRenderer {
        type Image = &'static str;

        fn clear(&mut self, _x: f64, _y: f64, _w: f64, _h: f64) {
            self.ops.push(Op::Clear);
        }

        fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
            self.ops.push(Op::Fill {
                x,
                y,
                w,
                h,
                color: color.to_string(),
            });
        }

        fn draw_image(&mut self, image: &&'static str, _x: f64, _y: f64, _w: f64, _h: f64) {
            self.ops.push(Op::Image(*image));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::{Op, RecordingRenderer};
    use super::*;
    use crate::paint::CellKey;

    fn fixtures() -> (MapConfig, PaintCache, SelectionStore, TileCoordinate) {
        let tile = TileCoordinate::new(16, 58_190, 25_807);
        let mut cache = PaintCache::new(true);
        cache.complete_fetch(
            tile,
            vec![TileCell {
                cell_x: 2,
                cell_y: 6,
                color: "#0000FF".into(),
                user_id: "other".into(),
            }],
        );
        let mut selections = SelectionStore::new();
        selections.toggle(
            CellKey {
                zoom: 16,
                tile_x: tile.x,
                tile_y: tile.y,
                cell_x: 2,
                cell_y: 6,
            },
            "#FF0000",
        );
        (MapConfig::default(), cache, selections, tile)
    }

    #[test]
    fn initial_draw_layers_placeholder_cache_then_selection() {
        let (config, cache, selections, tile) = fixtures();
        let layers = TileLayers {
            config: &config,
            cache: &cache,
            selections: &selections,
        };
        let mut renderer = RecordingRenderer::default();
        layers.draw_initial(&mut renderer, Some(tile));

        assert_eq!(renderer.ops[0], Op::Clear);
        assert_eq!(
            renderer.fills(),
            vec![(0.0, 0.0, "#f2f2f2"), (32.0, 96.0, "#0000FF"), (32.0, 96.0, "#FF0000")]
        );
        assert_eq!(
            renderer.ops.last(),
            Some(&Op::Fill {
                x: 32.0,
                y: 96.0,
                w: 16.0,
                h: 16.0,
                color: "#FF0000".into()
            })
        );
    }

    #[test]
    fn loaded_image_is_drawn_under_overlay() {
        let (config, cache, selections, tile) = fixtures();
        let layers = TileLayers {
            config: &config,
            cache: &cache,
            selections: &selections,
        };
        let mut renderer = RecordingRenderer::default();
        layers.draw_loaded(&mut renderer, Some(tile), &"raster");

        assert_eq!(renderer.ops[0], Op::Image("raster"));
        assert_eq!(renderer.fills(), vec![(32.0, 96.0, "#0000FF"), (32.0, 96.0, "#FF0000")]);
    }

    #[test]
    fn below_paint_zoom_only_placeholder_is_drawn() {
        let (config, cache, selections, _) = fixtures();
        let layers = TileLayers {
            config: &config,
            cache: &cache,
            selections: &selections,
        };
        let mut renderer = RecordingRenderer::default();
        layers.draw_initial(&mut renderer, Some(TileCoordinate::new(14, 3, 3)));
        assert_eq!(renderer.fills(), vec![(0.0, 0.0, "#f2f2f2")]);
    }

    #[test]
    fn out_of_world_slot_is_placeholder_only() {
        let (config, cache, selections, _) = fixtures();
        let layers = TileLayers {
            config: &config,
            cache: &cache,
            selections: &selections,
        };
        let mut renderer = RecordingRenderer::default();
        layers.draw_initial(&mut renderer, None);
        assert_eq!(renderer.ops.len(), 2);
    }
}
