//! Browser-independent map state: view, gestures, paint cache and selections.
//!
//! The DOM layer in `canvas.rs` owns one `MapState` behind `Rc<RefCell<_>>`
//! and turns its answers into canvas draws and network calls.

use tilepaint_shared::PaintPostRequest;

use crate::api::PaintError;
use crate::config::{DEFAULT_PAINT_COLOR, MapConfig};
use crate::interaction::{Gesture, InteractionController};
use crate::paint::{
    CellKey, PaintCache, SelectionStore, Toggle, handle_failed_batch, prepare_commit,
};
use crate::projection::{CellCoordinate, LatLng, ScreenTransform, TileCoordinate, pixel_to_cell};
use crate::renderer::TileLayers;
use crate::viewport::{ScreenSize, TileGrid, ViewState};

pub const PAINT_HINT: &str = "Zoom in further to paint!";

/// Numbers transient hints so only the newest one's timer clears the banner.
#[derive(Debug, Default)]
pub struct HintSequence {
    latest: u64,
}

impl HintSequence {
    pub fn issue(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        ticket == self.latest
    }
}

/// Result of clicking on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellToggle {
    Changed { key: CellKey, toggle: Toggle },
    BelowPaintZoom,
    OutsideWorld,
}

pub struct MapState {
    pub config: MapConfig,
    pub view: ViewState,
    pub screen: ScreenSize,
    pub controller: InteractionController,
    pub cache: PaintCache,
    pub selections: SelectionStore,
    pub color: String,
    pub user_id: Option<String>,
    pub hints: HintSequence,
}

impl MapState {
    pub fn new(config: MapConfig) -> Self {
        let cache = PaintCache::new(config.dedupe_paint_fetches);
        Self {
            view: ViewState::default().clamped(&config),
            screen: ScreenSize::new(0.0, 0.0),
            controller: InteractionController::new(),
            cache,
            selections: SelectionStore::new(),
            color: DEFAULT_PAINT_COLOR.to_string(),
            user_id: None,
            hints: HintSequence::default(),
            config,
        }
    }

    pub fn grid(&self) -> TileGrid {
        TileGrid::new(&self.view, self.screen, &self.config)
    }

    pub fn transform(&self) -> ScreenTransform {
        ScreenTransform::new(&self.view, self.screen, &self.config)
    }

    pub fn base_zoom(&self) -> u8 {
        self.config.base_zoom(self.view.zoom)
    }

    pub fn paint_enabled(&self) -> bool {
        self.config.paint_enabled(self.base_zoom())
    }

    pub fn source_tile(&self, layout: TileCoordinate) -> Option<TileCoordinate> {
        layout.source(self.config.lng_mode)
    }

    pub fn layers(&self) -> TileLayers<'_> {
        TileLayers {
            config: &self.config,
            cache: &self.cache,
            selections: &self.selections,
        }
    }

    pub fn center(&self) -> LatLng {
        self.view.center()
    }

    /// Claim paint fetches for every uncached tile in `grid`.
    pub fn claim_paint_fetches(&mut self, grid: &TileGrid) -> Vec<TileCoordinate> {
        if !self.config.paint_enabled(grid.base_zoom()) {
            return Vec::new();
        }
        let mode = self.config.lng_mode;
        grid.iter()
            .filter_map(|placed| placed.tile.source(mode))
            .filter(|tile| self.cache.begin_fetch(*tile))
            .collect()
    }

    /// Tile and cell under a screen pixel at the current base zoom.
    pub fn cell_at(&self, screen_x: f64, screen_y: f64) -> (TileCoordinate, CellCoordinate) {
        let transform = self.transform();
        let world = transform.screen_to_world(screen_x, screen_y);
        let cell = pixel_to_cell(world, transform.tile_size, self.config.cell_pixel_size());
        (
            TileCoordinate::new(transform.base_zoom, cell.tile_x, cell.tile_y),
            cell,
        )
    }

    pub fn toggle_at(&mut self, screen_x: f64, screen_y: f64) -> CellToggle {
        if !self.paint_enabled() {
            return CellToggle::BelowPaintZoom;
        }
        let (layout, cell) = self.cell_at(screen_x, screen_y);
        let Some(tile) = self.source_tile(layout) else {
            return CellToggle::OutsideWorld;
        };
        let key = CellKey::new(
            tile.zoom,
            CellCoordinate {
                tile_x: tile.x,
                tile_y: tile.y,
                ..cell
            },
        );
        let toggle = self.selections.toggle(key, &self.color);
        CellToggle::Changed { key, toggle }
    }

    pub fn prepare_commit(&mut self) -> Result<Vec<PaintPostRequest>, PaintError> {
        prepare_commit(self.user_id.as_deref(), &mut self.selections)
    }

    pub fn commit_failed(&mut self, batch: &PaintPostRequest) -> bool {
        handle_failed_batch(self.config.commit_policy, &mut self.selections, batch)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.controller.pointer_down(x, y, &self.view);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Gesture {
        self.controller.pointer_move(x, y, &mut self.view, &self.config)
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> Gesture {
        self.controller.pointer_up(x, y, &mut self.view, &self.config)
    }

    pub fn pointer_leave(&mut self, x: f64, y: f64) -> Gesture {
        self.controller.pointer_leave(x, y, &mut self.view, &self.config)
    }

    pub fn wheel(&mut self, delta_y: f64, x: f64, y: f64) -> Gesture {
        self.controller
            .wheel(delta_y, x, y, &mut self.view, self.screen, &self.config)
    }

    pub fn pinch_start(&mut self, distance: f64) {
        self.controller.pinch_start(distance);
    }

    pub fn pinch_move(&mut self, distance: f64, mid_x: f64, mid_y: f64) -> Gesture {
        self.controller
            .pinch_move(distance, mid_x, mid_y, &mut self.view, self.screen, &self.config)
    }

    pub fn pinch_end(&mut self) {
        self.controller.pinch_end();
    }

    pub fn step_zoom(&mut self, step: f64) {
        self.view.step_zoom(step, &self.config);
    }
}
