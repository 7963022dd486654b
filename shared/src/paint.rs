use std::fmt;

use serde::{Deserialize, Serialize};

use crate::colors::is_paint_color;
use crate::grid::{GRID_SIZE, MAX_ZOOM, tile_in_range};

/// A committed cell as returned by `GET /api/paint`.
///
/// The response uses camelCase for cell fields while the request bodies use
/// snake_case; both shapes are fixed by the deployed API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCell {
    #[serde(rename = "cellX")]
    pub cell_x: u32,
    #[serde(rename = "cellY")]
    pub cell_y: u32,
    pub color: String,
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

/// Response body of `GET /api/paint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintGetResponse {
    pub zoom: u8,
    pub tile_x: i64,
    pub tile_y: i64,
    #[serde(default)]
    pub cells: Vec<TileCell>,
}

/// Query parameters of `GET /api/paint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaintQuery {
    pub zoom: u8,
    pub tile_x: i64,
    pub tile_y: i64,
}

impl PaintQuery {
    pub fn to_query_string(self) -> String {
        format!(
            "zoom={}&tile_x={}&tile_y={}",
            self.zoom, self.tile_x, self.tile_y
        )
    }
}

/// One cell inside a commit batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintCellPayload {
    pub cell_x: u32,
    pub cell_y: u32,
    pub color: String,
}

/// Body of `POST /api/paint`: every cell of one tile painted by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintPostRequest {
    pub user_id: String,
    pub zoom: u8,
    pub tile_x: i64,
    pub tile_y: i64,
    pub cells: Vec<PaintCellPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintValidationError {
    MissingUser,
    ZoomOutOfRange { zoom: u8, min: u8 },
    TileOutOfRange { zoom: u8, tile_x: i64, tile_y: i64 },
    NoCells,
    CellOutOfRange { cell_x: u32, cell_y: u32 },
    InvalidColor(String),
}

impl fmt::Display for PaintValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUser => write!(f, "user_id is required"),
            Self::ZoomOutOfRange { zoom, min } => {
                write!(f, "zoom {zoom} outside paintable range {min}..={MAX_ZOOM}")
            }
            Self::TileOutOfRange {
                zoom,
                tile_x,
                tile_y,
            } => write!(f, "tile ({tile_x}, {tile_y}) does not exist at zoom {zoom}"),
            Self::NoCells => write!(f, "cells must not be empty"),
            Self::CellOutOfRange { cell_x, cell_y } => {
                write!(f, "cell ({cell_x}, {cell_y}) outside {GRID_SIZE}x{GRID_SIZE} grid")
            }
            Self::InvalidColor(color) => write!(f, "unsupported color {color:?}"),
        }
    }
}

impl std::error::Error for PaintValidationError {}

impl PaintPostRequest {
    /// Check a batch against the grid and zoom limits before it is stored.
    pub fn validate(&self, paint_min_zoom: u8) -> Result<(), PaintValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(PaintValidationError::MissingUser);
        }
        if self.zoom < paint_min_zoom || self.zoom > MAX_ZOOM {
            return Err(PaintValidationError::ZoomOutOfRange {
                zoom: self.zoom,
                min: paint_min_zoom,
            });
        }
        if !tile_in_range(self.zoom, self.tile_x, self.tile_y) {
            return Err(PaintValidationError::TileOutOfRange {
                zoom: self.zoom,
                tile_x: self.tile_x,
                tile_y: self.tile_y,
            });
        }
        if self.cells.is_empty() {
            return Err(PaintValidationError::NoCells);
        }
        for cell in &self.cells {
            if cell.cell_x >= GRID_SIZE || cell.cell_y >= GRID_SIZE {
                return Err(PaintValidationError::CellOutOfRange {
                    cell_x: cell.cell_x,
                    cell_y: cell.cell_y,
                });
            }
            if !is_paint_color(&cell.color) {
                return Err(PaintValidationError::InvalidColor(cell.color.clone()));
            }
        }
        Ok(())
    }
}
