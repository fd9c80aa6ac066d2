//! Track request API endpoints.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use super::upload::read_form;
use crate::db::models::{TrackRequest, TrackRequestStatus};
use crate::error::Result;
use crate::services::Claims;
use crate::AppState;

/// Query parameters for request listings.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<TrackRequestStatus>,
}

/// POST /api/tracks/:track_id/requests
///
/// Multipart form with an `audio` file, submitted against an open slot.
pub async fn submit_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(track_id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<TrackRequest>)> {
    let upload = read_form(multipart).await?.require_audio()?;
    let request = state
        .track_requests
        .submit(claims.sub, track_id, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/track-requests
///
/// Requests against the caller's songs.
pub async fn list_incoming(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<TrackRequest>>> {
    let requests = state
        .track_requests
        .list_incoming(claims.sub, query.status)
        .await?;
    Ok(Json(requests))
}

/// GET /api/users/:username/contributions
///
/// Only requests the caller could also open one by one are listed.
pub async fn list_contributions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<TrackRequest>>> {
    let requests = state
        .track_requests
        .list_contributions(claims.sub, &username, query.status)
        .await?;
    Ok(Json(requests))
}

/// GET /api/track-requests/:id
pub async fn get_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<i64>,
) -> Result<Json<TrackRequest>> {
    Ok(Json(state.track_requests.get(claims.sub, request_id).await?))
}

/// POST /api/track-requests/:id/approve
pub async fn approve_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<i64>,
) -> Result<Json<TrackRequest>> {
    Ok(Json(
        state.track_requests.approve(claims.sub, request_id).await?,
    ))
}

/// POST /api/track-requests/:id/decline
pub async fn decline_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<i64>,
) -> Result<Json<TrackRequest>> {
    Ok(Json(
        state.track_requests.decline(claims.sub, request_id).await?,
    ))
}
