pub mod api;
pub mod paint;
pub mod tiles;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tilepaint_shared::PaintValidationError;

/// Handler failure rendered as `{"error": …}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    Invalid(PaintValidationError),
    BadTile(String),
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) | Self::BadTile(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Invalid(e) => e.to_string(),
            Self::BadTile(msg) | Self::Upstream(msg) => msg.clone(),
        }
    }
}

impl From<PaintValidationError> for ApiError {
    fn from(e: PaintValidationError) -> Self {
        Self::Invalid(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}
