//! Feed routes: the consumer surface of the caller's session.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use hrdesk_common::error::AppError;
use hrdesk_common::types::FeedSnapshot;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(get_feed))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/refresh", post(refresh))
        .route("/api/notifications/{id}/read", post(mark_as_read))
}

/// GET /api/notifications: Current snapshot. The first request opens the
/// session, so its snapshot is typically still loading.
async fn get_feed(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<FeedSnapshot>, AppError> {
    let feed = state.sessions.feed_for(&auth.caller).await;
    Ok(Json(feed.snapshot()))
}

/// POST /api/notifications/:id/read: Mark one item read.
async fn mark_as_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FeedSnapshot>, AppError> {
    if id.trim().is_empty() {
        return Err(AppError::Validation("Notification id is empty".to_string()));
    }

    let feed = state.sessions.feed_for(&auth.caller).await;
    feed.mark_as_read(&id).await;
    Ok(Json(feed.snapshot()))
}

/// POST /api/notifications/read-all: Mark every visible item read.
async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<FeedSnapshot>, AppError> {
    let feed = state.sessions.feed_for(&auth.caller).await;
    feed.mark_all_read().await;
    Ok(Json(feed.snapshot()))
}

/// POST /api/notifications/refresh: Run a pass now and return its result.
async fn refresh(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<FeedSnapshot>, AppError> {
    let feed = state.sessions.feed_for(&auth.caller).await;
    feed.refresh().await;
    Ok(Json(feed.snapshot()))
}
