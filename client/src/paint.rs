//! Committed paint cache, pending selections and commit batching.

use std::collections::{BTreeMap, HashMap, HashSet};

use tilepaint_shared::{PaintCellPayload, PaintPostRequest, TileCell};

use crate::api::PaintError;
use crate::config::CommitPolicy;
use crate::projection::{CellCoordinate, TileCoordinate};

/// A cell address including the zoom it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub zoom: u8,
    pub tile_x: i64,
    pub tile_y: i64,
    pub cell_x: u32,
    pub cell_y: u32,
}

impl CellKey {
    pub fn new(zoom: u8, cell: CellCoordinate) -> Self {
        Self {
            zoom,
            tile_x: cell.tile_x,
            tile_y: cell.tile_y,
            cell_x: cell.cell_x,
            cell_y: cell.cell_y,
        }
    }

    pub fn tile(&self) -> TileCoordinate {
        TileCoordinate::new(self.zoom, self.tile_x, self.tile_y)
    }
}

/// Per-tile committed cells, fetched on demand and replaced wholesale.
#[derive(Debug, Default)]
pub struct PaintCache {
    entries: HashMap<TileCoordinate, Vec<TileCell>>,
    in_flight: HashSet<TileCoordinate>,
    dedupe: bool,
}

impl PaintCache {
    pub fn new(dedupe: bool) -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            dedupe,
        }
    }

    pub fn get(&self, tile: TileCoordinate) -> Option<&[TileCell]> {
        self.entries.get(&tile).map(Vec::as_slice)
    }

    pub fn contains(&self, tile: TileCoordinate) -> bool {
        self.entries.contains_key(&tile)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_in_flight(&self, tile: TileCoordinate) -> bool {
        self.in_flight.contains(&tile)
    }

    /// Claim a fetch for `tile`. Returns `false` when the tile is cached or,
    /// with deduplication on, already being fetched.
    pub fn begin_fetch(&mut self, tile: TileCoordinate) -> bool {
        if self.entries.contains_key(&tile) {
            return false;
        }
        if !self.in_flight.insert(tile) && self.dedupe {
            return false;
        }
        true
    }

    pub fn complete_fetch(&mut self, tile: TileCoordinate, cells: Vec<TileCell>) {
        self.in_flight.remove(&tile);
        self.entries.insert(tile, cells);
    }

    /// A fetch failed. The tile stays uncached so the next render retries.
    pub fn fail_fetch(&mut self, tile: TileCoordinate) {
        self.in_flight.remove(&tile);
    }

    /// Drop a tile's entry so the next paint-eligible render fetches it again.
    pub fn invalidate(&mut self, tile: TileCoordinate) {
        self.entries.remove(&tile);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
}

/// Pending, uncommitted cell selections. A key is present at most once.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    cells: BTreeMap<CellKey, String>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.cells.contains_key(key)
    }

    pub fn color(&self, key: &CellKey) -> Option<&str> {
        self.cells.get(key).map(String::as_str)
    }

    /// Remove `key` if present, otherwise select it with `color`.
    pub fn toggle(&mut self, key: CellKey, color: &str) -> Toggle {
        if self.cells.remove(&key).is_some() {
            Toggle::Deselected
        } else {
            self.cells.insert(key, color.to_string());
            Toggle::Selected
        }
    }

    /// Pending cells of one tile, in key order.
    pub fn for_tile(&self, tile: TileCoordinate) -> impl Iterator<Item = (&CellKey, &str)> {
        let lo = CellKey {
            zoom: tile.zoom,
            tile_x: tile.x,
            tile_y: tile.y,
            cell_x: 0,
            cell_y: 0,
        };
        let hi = CellKey {
            cell_x: u32::MAX,
            cell_y: u32::MAX,
            ..lo
        };
        self.cells
            .range(lo..=hi)
            .map(|(key, color)| (key, color.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &str)> {
        self.cells.iter().map(|(key, color)| (key, color.as_str()))
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// One commit request per tile, in tile order.
    pub fn batches(&self, user_id: &str) -> Vec<PaintPostRequest> {
        let mut batches: Vec<PaintPostRequest> = Vec::new();
        for (key, color) in &self.cells {
            let cell = PaintCellPayload {
                cell_x: key.cell_x,
                cell_y: key.cell_y,
                color: color.clone(),
            };
            match batches.last_mut() {
                Some(batch)
                    if batch.zoom == key.zoom
                        && batch.tile_x == key.tile_x
                        && batch.tile_y == key.tile_y =>
                {
                    batch.cells.push(cell);
                }
                _ => batches.push(PaintPostRequest {
                    user_id: user_id.to_string(),
                    zoom: key.zoom,
                    tile_x: key.tile_x,
                    tile_y: key.tile_y,
                    cells: vec![cell],
                }),
            }
        }
        batches
    }

    /// Put the cells of a failed batch back, skipping keys selected again since.
    pub fn restore(&mut self, batch: &PaintPostRequest) -> usize {
        let mut restored = 0;
        for cell in &batch.cells {
            let key = CellKey {
                zoom: batch.zoom,
                tile_x: batch.tile_x,
                tile_y: batch.tile_y,
                cell_x: cell.cell_x,
                cell_y: cell.cell_y,
            };
            if let std::collections::btree_map::Entry::Vacant(slot) = self.cells.entry(key) {
                slot.insert(cell.color.clone());
                restored += 1;
            }
        }
        restored
    }
}

/// Turn the pending selections into commit requests and clear the store.
///
/// A blank user id aborts before anything is touched.
pub fn prepare_commit(
    user_id: Option<&str>,
    store: &mut SelectionStore,
) -> Result<Vec<PaintPostRequest>, PaintError> {
    if store.is_empty() {
        return Ok(Vec::new());
    }
    let user_id = user_id.map(str::trim).unwrap_or_default();
    if user_id.is_empty() {
        return Err(PaintError::NotAuthenticated);
    }
    let batches = store.batches(user_id);
    store.clear();
    Ok(batches)
}

/// Apply the commit policy to a batch whose POST failed.
/// Returns whether the store changed.
pub fn handle_failed_batch(
    policy: CommitPolicy,
    store: &mut SelectionStore,
    batch: &PaintPostRequest,
) -> bool {
    match policy {
        CommitPolicy::ClearAll => false,
        CommitPolicy::RetainFailed => store.restore(batch) > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tile_x: i64, cell_x: u32, cell_y: u32) -> CellKey {
        CellKey {
            zoom: 16,
            tile_x,
            tile_y: 25_807,
            cell_x,
            cell_y,
        }
    }

    fn cell(cell_x: u32, cell_y: u32, color: &str) -> TileCell {
        TileCell {
            cell_x,
            cell_y,
            color: color.into(),
            user_id: "u".into(),
        }
    }

    #[test]
    fn toggling_twice_restores_prior_state() {
        let mut store = SelectionStore::new();
        store.toggle(key(1, 0, 0), "#00FF00");
        let before: Vec<_> = store.iter().map(|(k, c)| (*k, c.to_string())).collect();

        assert_eq!(store.toggle(key(1, 2, 6), "#FF0000"), Toggle::Selected);
        assert_eq!(store.len(), 2);
        assert_eq!(store.toggle(key(1, 2, 6), "#0000FF"), Toggle::Deselected);

        let after: Vec<_> = store.iter().map(|(k, c)| (*k, c.to_string())).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn a_key_is_stored_once() {
        let mut store = SelectionStore::new();
        store.toggle(key(1, 3, 3), "#FF0000");
        assert_eq!(store.color(&key(1, 3, 3)), Some("#FF0000"));
        store.toggle(key(1, 3, 3), "#FF0000");
        store.toggle(key(1, 3, 3), "#00FF00");
        assert_eq!(store.len(), 1);
        assert_eq!(store.color(&key(1, 3, 3)), Some("#00FF00"));
    }

    #[test]
    fn same_cell_at_other_zoom_is_a_different_key() {
        let mut store = SelectionStore::new();
        store.toggle(key(1, 3, 3), "#FF0000");
        let other = CellKey { zoom: 17, ..key(1, 3, 3) };
        assert_eq!(store.toggle(other, "#FF0000"), Toggle::Selected);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn for_tile_only_yields_that_tile() {
        let mut store = SelectionStore::new();
        store.toggle(key(1, 15, 15), "#111111");
        store.toggle(key(2, 0, 0), "#222222");
        store.toggle(key(2, 4, 1), "#333333");
        store.toggle(CellKey { zoom: 17, ..key(2, 5, 5) }, "#444444");

        let tile = TileCoordinate::new(16, 2, 25_807);
        let colors: Vec<_> = store.for_tile(tile).map(|(_, c)| c).collect();
        assert_eq!(colors, vec!["#222222", "#333333"]);
    }

    #[test]
    fn batches_group_by_tile() {
        let mut store = SelectionStore::new();
        store.toggle(key(7, 1, 1), "#FF0000");
        store.toggle(key(3, 0, 0), "#00FF00");
        store.toggle(key(7, 2, 2), "#0000FF");

        let batches = store.batches("user-1");
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].tile_x, 3);
        assert_eq!(batches[0].cells.len(), 1);
        assert_eq!(batches[1].tile_x, 7);
        assert_eq!(batches[1].cells.len(), 2);
        assert!(batches.iter().all(|b| b.user_id == "user-1" && b.zoom == 16));
        let total: usize = batches.iter().map(|b| b.cells.len()).sum();
        assert_eq!(total, store.len());
    }

    #[test]
    fn commit_without_user_leaves_store_untouched() {
        let mut store = SelectionStore::new();
        store.toggle(key(1, 1, 1), "#FF0000");
        assert_eq!(prepare_commit(None, &mut store), Err(PaintError::NotAuthenticated));
        assert_eq!(
            prepare_commit(Some("   "), &mut store),
            Err(PaintError::NotAuthenticated)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_commit_is_quiet_even_without_user() {
        let mut store = SelectionStore::new();
        assert_eq!(prepare_commit(None, &mut store), Ok(Vec::new()));
        assert_eq!(prepare_commit(Some("user-1"), &mut store), Ok(Vec::new()));
    }

    #[test]
    fn commit_clears_store_regardless_of_outcome() {
        let mut store = SelectionStore::new();
        store.toggle(key(1, 1, 1), "#FF0000");
        store.toggle(key(2, 1, 1), "#FF0000");
        let batches = prepare_commit(Some("user-1"), &mut store).expect("user present");
        assert_eq!(batches.len(), 2);
        assert!(store.is_empty());

        // Every POST failed; the default policy still leaves the store empty.
        for batch in &batches {
            assert!(!handle_failed_batch(CommitPolicy::ClearAll, &mut store, batch));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn retain_failed_requeues_free_keys_only() {
        let mut store = SelectionStore::new();
        store.toggle(key(1, 1, 1), "#FF0000");
        store.toggle(key(1, 2, 2), "#FF0000");
        let batches = prepare_commit(Some("user-1"), &mut store).expect("user present");

        // The user re-selected one of the cells with a new color meanwhile.
        store.toggle(key(1, 2, 2), "#00FF00");
        assert!(handle_failed_batch(CommitPolicy::RetainFailed, &mut store, &batches[0]));
        assert_eq!(store.len(), 2);
        assert_eq!(store.color(&key(1, 1, 1)), Some("#FF0000"));
        assert_eq!(store.color(&key(1, 2, 2)), Some("#00FF00"));
    }

    #[test]
    fn cache_entries_are_replaced_wholesale() {
        let mut cache = PaintCache::new(true);
        let tile = TileCoordinate::new(16, 1, 2);
        assert!(cache.begin_fetch(tile));
        cache.complete_fetch(tile, vec![cell(0, 0, "#FF0000"), cell(1, 0, "#FF0000")]);
        assert_eq!(cache.get(tile).map(<[_]>::len), Some(2));

        cache.complete_fetch(tile, vec![cell(5, 5, "#00FF00")]);
        assert_eq!(cache.get(tile), Some(&[cell(5, 5, "#00FF00")][..]));
        assert!(!cache.begin_fetch(tile));
    }

    #[test]
    fn in_flight_fetches_are_deduplicated() {
        let tile = TileCoordinate::new(16, 1, 2);
        let mut cache = PaintCache::new(true);
        assert!(cache.begin_fetch(tile));
        assert!(cache.is_in_flight(tile));
        assert!(!cache.begin_fetch(tile));
        cache.fail_fetch(tile);
        assert!(!cache.contains(tile));
        assert!(cache.begin_fetch(tile));

        cache.complete_fetch(tile, Vec::new());
        cache.invalidate(tile);
        assert!(cache.begin_fetch(tile));

        let mut eager = PaintCache::new(false);
        assert!(eager.begin_fetch(tile));
        assert!(eager.begin_fetch(tile));
    }
}
