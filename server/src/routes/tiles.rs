use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use tilepaint_shared::{MAX_ZOOM, tile_in_range};
use tracing::warn;

use super::ApiError;
use crate::config::TILE_CACHE_CONTROL;
use crate::state::AppState;

/// Proxy one raster tile from the configured upstream.
pub async fn get_tile(
    State(state): State<AppState>,
    Path((zoom, tile_x, file)): Path<(u8, i64, String)>,
) -> Result<Response, ApiError> {
    state.observability.record_tile_proxy_request();
    let tile_y = parse_tile_file(&file)
        .ok_or_else(|| ApiError::BadTile(format!("expected <y>.png, got {file:?}")))?;
    if zoom > MAX_ZOOM || !tile_in_range(zoom, tile_x, tile_y) {
        return Err(ApiError::BadTile(format!(
            "tile {zoom}/{tile_x}/{tile_y} does not exist"
        )));
    }

    let url = upstream_tile_url(&state.tile_upstream, zoom, tile_x, tile_y);
    let upstream = state.http_client.get(&url).send().await.map_err(|e| {
        state.observability.record_tile_proxy_upstream_error();
        warn!(error = %e, %url, "tile upstream request failed");
        ApiError::Upstream(format!("tile upstream unreachable: {e}"))
    })?;
    if !upstream.status().is_success() {
        state.observability.record_tile_proxy_upstream_error();
        warn!(status = %upstream.status(), %url, "tile upstream returned error status");
        return Err(ApiError::Upstream(format!(
            "tile upstream returned {}",
            upstream.status()
        )));
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("image/png"));
    let body = upstream.bytes().await.map_err(|e| {
        state.observability.record_tile_proxy_upstream_error();
        warn!(error = %e, %url, "tile upstream body failed");
        ApiError::Upstream(format!("tile upstream body failed: {e}"))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static(TILE_CACHE_CONTROL),
            ),
        ],
        body,
    )
        .into_response())
}

fn parse_tile_file(file: &str) -> Option<i64> {
    file.strip_suffix(".png")?.parse().ok()
}

fn upstream_tile_url(upstream: &str, zoom: u8, tile_x: i64, tile_y: i64) -> String {
    format!("{upstream}/{zoom}/{tile_x}/{tile_y}.png")
}
