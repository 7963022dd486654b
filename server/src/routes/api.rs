use std::fmt::Write as _;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "tiles": state.paint.tile_count(),
        "cells": state.paint.cell_count(),
        "paint_min_zoom": state.paint_min_zoom,
        "observability": {
            "paint_get_requests_total": observability.paint_get_requests_total,
            "paint_post_requests_total": observability.paint_post_requests_total,
            "paint_rejected_total": observability.paint_rejected_total,
            "cells_painted_total": observability.cells_painted_total,
            "tile_proxy_requests_total": observability.tile_proxy_requests_total,
            "tile_proxy_upstream_errors_total": observability.tile_proxy_upstream_errors_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(
        state.paint.tile_count(),
        state.paint.cell_count(),
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn write_metric(body: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    let _ = writeln!(body, "# HELP {name} {help}");
    let _ = writeln!(body, "# TYPE {name} {kind}");
    let _ = writeln!(body, "{name} {value}");
}

fn render_prometheus_metrics(
    tile_count: usize,
    cell_count: usize,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    write_metric(
        &mut body,
        "tilepaint_painted_tiles",
        "gauge",
        "Tiles holding at least one committed cell.",
        tile_count as u64,
    );
    write_metric(
        &mut body,
        "tilepaint_painted_cells",
        "gauge",
        "Committed cells across all tiles.",
        cell_count as u64,
    );
    write_metric(
        &mut body,
        "tilepaint_paint_get_requests_total",
        "counter",
        "Total GET /api/paint requests.",
        observability.paint_get_requests_total,
    );
    write_metric(
        &mut body,
        "tilepaint_paint_post_requests_total",
        "counter",
        "Total POST /api/paint requests.",
        observability.paint_post_requests_total,
    );
    write_metric(
        &mut body,
        "tilepaint_paint_rejected_total",
        "counter",
        "Paint requests rejected by validation.",
        observability.paint_rejected_total,
    );
    write_metric(
        &mut body,
        "tilepaint_cells_painted_total",
        "counter",
        "Cells written by accepted commits.",
        observability.cells_painted_total,
    );
    write_metric(
        &mut body,
        "tilepaint_tile_proxy_requests_total",
        "counter",
        "Total raster tile proxy requests.",
        observability.tile_proxy_requests_total,
    );
    write_metric(
        &mut body,
        "tilepaint_tile_proxy_upstream_errors_total",
        "counter",
        "Tile proxy requests that failed upstream.",
        observability.tile_proxy_upstream_errors_total,
    );
    body
}
