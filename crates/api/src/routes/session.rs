//! Session teardown.

use axum::extract::State;
use axum::routing::delete;
use axum::{Json, Router};
use serde_json::json;

use hrdesk_common::error::AppError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/session", delete(end_session))
}

/// DELETE /api/session: Stop polling for the caller and drop their feed.
async fn end_session(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let ended = state.sessions.end(auth.caller.user_id()).await;
    Ok(Json(json!({ "ended": ended })))
}
