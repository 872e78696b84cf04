//! Document sync endpoints
//!
//! - `GET /doc` returns the authoritative document
//! - `POST /sync` merges a client document and returns the merged one

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::state::AppState;
use crate::sync::DocPayload;

/// Create the sync router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/doc", get(get_doc))
        .route("/sync", post(sync_doc))
}

/// Current authoritative document
async fn get_doc(State(state): State<AppState>) -> Json<DocPayload> {
    Json(DocPayload::new(state.sync().handle_get_doc()))
}

/// Merge a client's document into the authoritative one
async fn sync_doc(
    State(state): State<AppState>,
    Json(req): Json<DocPayload>,
) -> Result<Json<DocPayload>> {
    let merged = state.sync().handle_sync(&req.doc).await?;
    Ok(Json(DocPayload::new(merged)))
}
