use std::fmt;

use tilepaint_shared::{PaintGetResponse, PaintPostRequest, PaintQuery};

/// Failure of a paint API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintError {
    /// The request never produced a response.
    Network(String),
    /// The server answered with a non-2xx status.
    Status(u16),
    /// The body was not the expected JSON.
    Decode(String),
    /// The request body could not be serialized.
    Encode(String),
    /// Commit attempted without a user id.
    NotAuthenticated,
}

impl fmt::Display for PaintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "fetch error: {e}"),
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Decode(e) => write!(f, "parse error: {e}"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::NotAuthenticated => write!(f, "no user id; log in before committing"),
        }
    }
}

impl std::error::Error for PaintError {}

pub fn paint_query_url(paint_url: &str, query: PaintQuery) -> String {
    format!("{paint_url}?{}", query.to_query_string())
}

/// Committed cells of one tile.
pub async fn fetch_paint(
    paint_url: &str,
    query: PaintQuery,
) -> Result<PaintGetResponse, PaintError> {
    let url = paint_query_url(paint_url, query);
    let resp = gloo_net::http::Request::get(&url)
        .send()
        .await
        .map_err(|e| PaintError::Network(e.to_string()))?;
    if !resp.ok() {
        return Err(PaintError::Status(resp.status()));
    }
    let body = resp
        .json::<PaintGetResponse>()
        .await
        .map_err(|e| PaintError::Decode(e.to_string()))?;
    check_response_tile(query, &body)?;
    Ok(body)
}

/// POST one tile's batch. Only the status matters.
pub async fn post_paint(paint_url: &str, batch: &PaintPostRequest) -> Result<(), PaintError> {
    let resp = gloo_net::http::Request::post(paint_url)
        .json(batch)
        .map_err(|e| PaintError::Encode(e.to_string()))?
        .send()
        .await
        .map_err(|e| PaintError::Network(e.to_string()))?;
    if !resp.ok() {
        return Err(PaintError::Status(resp.status()));
    }
    Ok(())
}

/// A response for a different tile than requested is treated as malformed.
fn check_response_tile(query: PaintQuery, body: &PaintGetResponse) -> Result<(), PaintError> {
    if body.zoom != query.zoom || body.tile_x != query.tile_x || body.tile_y != query.tile_y {
        return Err(PaintError::Decode(format!(
            "asked for tile {}/{}/{}, got {}/{}/{}",
            query.zoom, query.tile_x, query.tile_y, body.zoom, body.tile_x, body.tile_y
        )));
    }
    Ok(())
}
