use axum::Json;
use axum::extract::{Query, State};
use serde::Serialize;
use tilepaint_shared::{MAX_ZOOM, PaintGetResponse, PaintPostRequest, PaintQuery, tile_in_range};
use tracing::{debug, info};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaintPostResponse {
    pub ok: bool,
    pub painted: usize,
}

pub async fn get_paint(
    State(state): State<AppState>,
    Query(query): Query<PaintQuery>,
) -> Result<Json<PaintGetResponse>, ApiError> {
    state.observability.record_paint_get();
    if query.zoom > MAX_ZOOM || !tile_in_range(query.zoom, query.tile_x, query.tile_y) {
        state.observability.record_paint_rejected();
        return Err(ApiError::BadTile(format!(
            "tile {}/{}/{} does not exist",
            query.zoom, query.tile_x, query.tile_y
        )));
    }

    let cells = state.paint.cells(query);
    debug!(
        zoom = query.zoom,
        tile_x = query.tile_x,
        tile_y = query.tile_y,
        cells = cells.len(),
        "served paint"
    );
    Ok(Json(PaintGetResponse {
        zoom: query.zoom,
        tile_x: query.tile_x,
        tile_y: query.tile_y,
        cells,
    }))
}

pub async fn post_paint(
    State(state): State<AppState>,
    Json(batch): Json<PaintPostRequest>,
) -> Result<Json<PaintPostResponse>, ApiError> {
    state.observability.record_paint_post();
    if let Err(e) = batch.validate(state.paint_min_zoom) {
        state.observability.record_paint_rejected();
        info!(error = %e, user_id = %batch.user_id, "rejected paint batch");
        return Err(e.into());
    }

    let painted = state.paint.upsert(&batch);
    state.observability.record_cells_painted(painted as u64);
    info!(
        user_id = %batch.user_id,
        zoom = batch.zoom,
        tile_x = batch.tile_x,
        tile_y = batch.tile_y,
        painted,
        "stored paint batch"
    );
    Ok(Json(PaintPostResponse { ok: true, painted }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tilepaint_shared::PaintGetResponse;

    use crate::test_support::{spawn_test_server, test_state};

    fn batch(user_id: &str, zoom: u8, cells: serde_json::Value) -> serde_json::Value {
        json!({
            "user_id": user_id,
            "zoom": zoom,
            "tile_x": 58_190,
            "tile_y": 25_807,
            "cells": cells,
        })
    }

    #[tokio::test]
    async fn committed_cells_are_served_back() {
        let (base_url, server_handle) = spawn_test_server(test_state()).await;
        let client = reqwest::Client::new();

        let committed = client
            .post(format!("{base_url}/api/paint"))
            .json(&batch(
                "user-1",
                16,
                json!([
                    {"cell_x": 8, "cell_y": 12, "color": "#FF0000"},
                    {"cell_x": 2, "cell_y": 3, "color": "#00FF00"},
                ]),
            ))
            .send()
            .await
            .expect("post request")
            .error_for_status()
            .expect("post status")
            .json::<serde_json::Value>()
            .await
            .expect("parse post body");
        assert_eq!(committed, json!({"ok": true, "painted": 2}));

        let raw = client
            .get(format!("{base_url}/api/paint?zoom=16&tile_x=58190&tile_y=25807"))
            .send()
            .await
            .expect("get request")
            .error_for_status()
            .expect("get status")
            .json::<serde_json::Value>()
            .await
            .expect("parse get body");
        assert_eq!(raw["cells"][0]["cellX"], 2);
        assert_eq!(raw["cells"][0]["userId"], "user-1");

        let body: PaintGetResponse = serde_json::from_value(raw).expect("typed body");
        assert_eq!((body.zoom, body.tile_x, body.tile_y), (16, 58_190, 25_807));
        let cells: Vec<(u32, u32)> = body.cells.iter().map(|c| (c.cell_x, c.cell_y)).collect();
        assert_eq!(cells, vec![(2, 3), (8, 12)]);

        server_handle.abort();
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn invalid_batches_are_rejected_with_json_errors() {
        let (base_url, server_handle) = spawn_test_server(test_state()).await;
        let client = reqwest::Client::new();
        let cell = json!([{"cell_x": 1, "cell_y": 1, "color": "#FF0000"}]);

        for body in [
            batch("  ", 16, cell.clone()),
            batch("user-1", 14, cell.clone()),
            batch("user-1", 16, json!([])),
            batch("user-1", 16, json!([{"cell_x": 16, "cell_y": 0, "color": "#FF0000"}])),
            batch("user-1", 16, json!([{"cell_x": 0, "cell_y": 0, "color": ""}])),
        ] {
            let resp = client
                .post(format!("{base_url}/api/paint"))
                .json(&body)
                .send()
                .await
                .expect("post request");
            assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "{body}");
            let error = resp.json::<serde_json::Value>().await.expect("error body");
            assert!(error.get("error").and_then(|v| v.as_str()).is_some());
        }

        let health = client
            .get(format!("{base_url}/api/health"))
            .send()
            .await
            .expect("health request")
            .json::<serde_json::Value>()
            .await
            .expect("parse health");
        assert_eq!(health["cells"], 0);
        assert_eq!(health["observability"]["paint_rejected_total"], 5);

        server_handle.abort();
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn unknown_tile_is_empty_and_missing_tile_is_rejected() {
        let (base_url, server_handle) = spawn_test_server(test_state()).await;
        let client = reqwest::Client::new();

        let body = client
            .get(format!("{base_url}/api/paint?zoom=15&tile_x=3&tile_y=4"))
            .send()
            .await
            .expect("get request")
            .error_for_status()
            .expect("get status")
            .json::<PaintGetResponse>()
            .await
            .expect("parse get body");
        assert!(body.cells.is_empty());

        let resp = client
            .get(format!("{base_url}/api/paint?zoom=2&tile_x=4&tile_y=0"))
            .send()
            .await
            .expect("get request");
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        server_handle.abort();
        let _ = server_handle.await;
    }
}
