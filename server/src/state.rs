use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tilepaint_shared::{PaintPostRequest, PaintQuery, TileCell};
use tracing::warn;

use crate::config::{
    USER_AGENT, paint_min_zoom, static_dir, tile_upstream_url, upstream_connect_timeout,
    upstream_http_timeout,
};

/// `(zoom, tile_x, tile_y)`.
pub type TileKey = (u8, i64, i64);

/// Committed cells, one ordered map per tile keyed by `(cell_y, cell_x)`.
#[derive(Debug, Default)]
pub struct PaintStore {
    tiles: DashMap<TileKey, BTreeMap<(u32, u32), TileCell>>,
}

impl PaintStore {
    /// Cells of one tile in row-major order. Unknown tiles are empty.
    pub fn cells(&self, query: PaintQuery) -> Vec<TileCell> {
        self.tiles
            .get(&(query.zoom, query.tile_x, query.tile_y))
            .map(|tile| tile.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Store a validated batch. Later writes to the same cell win.
    pub fn upsert(&self, batch: &PaintPostRequest) -> usize {
        let mut tile = self
            .tiles
            .entry((batch.zoom, batch.tile_x, batch.tile_y))
            .or_default();
        for cell in &batch.cells {
            tile.insert(
                (cell.cell_y, cell.cell_x),
                TileCell {
                    cell_x: cell.cell_x,
                    cell_y: cell.cell_y,
                    color: cell.color.clone(),
                    user_id: batch.user_id.clone(),
                },
            );
        }
        batch.cells.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn cell_count(&self) -> usize {
        self.tiles.iter().map(|tile| tile.len()).sum()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub paint: Arc<PaintStore>,
    pub http_client: reqwest::Client,
    /// Raster origin the `/tiles` proxy forwards to.
    pub tile_upstream: Arc<str>,
    pub static_dir: PathBuf,
    pub paint_min_zoom: u8,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    paint_get_requests_total: AtomicU64,
    paint_post_requests_total: AtomicU64,
    paint_rejected_total: AtomicU64,
    cells_painted_total: AtomicU64,
    tile_proxy_requests_total: AtomicU64,
    tile_proxy_upstream_errors_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub paint_get_requests_total: u64,
    pub paint_post_requests_total: u64,
    pub paint_rejected_total: u64,
    pub cells_painted_total: u64,
    pub tile_proxy_requests_total: u64,
    pub tile_proxy_upstream_errors_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            paint_get_requests_total: self.paint_get_requests_total.load(Ordering::Relaxed),
            paint_post_requests_total: self.paint_post_requests_total.load(Ordering::Relaxed),
            paint_rejected_total: self.paint_rejected_total.load(Ordering::Relaxed),
            cells_painted_total: self.cells_painted_total.load(Ordering::Relaxed),
            tile_proxy_requests_total: self.tile_proxy_requests_total.load(Ordering::Relaxed),
            tile_proxy_upstream_errors_total: self
                .tile_proxy_upstream_errors_total
                .load(Ordering::Relaxed),
        }
    }

    pub fn record_paint_get(&self) {
        self.paint_get_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_paint_post(&self) {
        self.paint_post_requests_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_paint_rejected(&self) {
        self.paint_rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cells_painted(&self, count: u64) {
        self.cells_painted_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_tile_proxy_request(&self) {
        self.tile_proxy_requests_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tile_proxy_upstream_error(&self) {
        self.tile_proxy_upstream_errors_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new() -> Self {
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, falling back to defaults"
                );
                reqwest::Client::new()
            });
        Self {
            paint: Arc::new(PaintStore::default()),
            http_client,
            tile_upstream: Arc::from(tile_upstream_url()),
            static_dir: static_dir(),
            paint_min_zoom: paint_min_zoom(),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilepaint_shared::PaintCellPayload;

    fn batch(user: &str, cells: &[(u32, u32, &str)]) -> PaintPostRequest {
        PaintPostRequest {
            user_id: user.into(),
            zoom: 16,
            tile_x: 58_190,
            tile_y: 25_807,
            cells: cells
                .iter()
                .map(|&(cell_x, cell_y, color)| PaintCellPayload {
                    cell_x,
                    cell_y,
                    color: color.into(),
                })
                .collect(),
        }
    }

    const TILE: PaintQuery = PaintQuery {
        zoom: 16,
        tile_x: 58_190,
        tile_y: 25_807,
    };

    #[test]
    fn unknown_tile_has_no_cells() {
        let store = PaintStore::default();
        assert!(store.cells(TILE).is_empty());
        assert_eq!(store.tile_count(), 0);
    }

    #[test]
    fn cells_come_back_row_major() {
        let store = PaintStore::default();
        store.upsert(&batch("a", &[(5, 2, "#FF0000"), (1, 9, "#00FF00"), (0, 2, "#0000FF")]));
        let order: Vec<(u32, u32)> = store
            .cells(TILE)
            .iter()
            .map(|cell| (cell.cell_x, cell.cell_y))
            .collect();
        assert_eq!(order, vec![(0, 2), (5, 2), (1, 9)]);
    }

    #[test]
    fn last_write_wins_per_cell() {
        let store = PaintStore::default();
        store.upsert(&batch("a", &[(3, 3, "#FF0000")]));
        let painted = store.upsert(&batch("b", &[(3, 3, "#00FF00"), (4, 3, "#00FF00")]));
        assert_eq!(painted, 2);

        let cells = store.cells(TILE);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].color, "#00FF00");
        assert_eq!(cells[0].user_id, "b");
        assert_eq!(store.cell_count(), 2);
        assert_eq!(store.tile_count(), 1);
    }

    #[test]
    fn tiles_are_independent() {
        let store = PaintStore::default();
        store.upsert(&batch("a", &[(0, 0, "#FF0000")]));
        let neighbour = PaintQuery {
            tile_x: TILE.tile_x + 1,
            ..TILE
        };
        assert!(store.cells(neighbour).is_empty());
    }

    #[test]
    fn counters_snapshot() {
        let counters = ObservabilityCounters::default();
        counters.record_paint_post();
        counters.record_cells_painted(7);
        counters.record_tile_proxy_upstream_error();
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.paint_post_requests_total, 1);
        assert_eq!(snapshot.cells_painted_total, 7);
        assert_eq!(snapshot.tile_proxy_upstream_errors_total, 1);
        assert_eq!(snapshot.paint_get_requests_total, 0);
    }
}
