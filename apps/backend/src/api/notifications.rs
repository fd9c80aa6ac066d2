//! Notification inbox endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::db::{models::Notification, queries};
use crate::error::{AppError, Result};
use crate::services::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    /// Only unread notifications.
    #[serde(default)]
    pub unread: bool,
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<Notification>>> {
    let db = state.db.lock().await;
    Ok(Json(queries::list_notifications(
        &db,
        claims.sub,
        query.unread,
    )?))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<i64>,
) -> Result<Json<Notification>> {
    let db = state.db.lock().await;
    queries::mark_notification_read(&db, notification_id, claims.sub)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
}
