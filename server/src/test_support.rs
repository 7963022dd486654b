use std::sync::Arc;

use tilepaint_shared::PAINT_MIN_ZOOM;

use crate::state::AppState;

/// State with the default paint threshold, whatever the environment says.
pub fn test_state() -> AppState {
    let mut state = AppState::new();
    state.paint_min_zoom = PAINT_MIN_ZOOM;
    state
}

pub fn test_state_with_upstream(upstream: &str) -> AppState {
    let mut state = test_state();
    state.tile_upstream = Arc::from(upstream);
    state
}

/// Serve the full router on an ephemeral port; returns its base URL.
pub async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let app = crate::app::build_app(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    (format!("http://{addr}"), handle)
}
