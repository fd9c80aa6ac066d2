//! Song API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{paginate, PaginatedResponse};
use crate::db::models::{License, Song, SongStats, Track};
use crate::db::queries::{self, NewSong, SongFilter};
use crate::error::{AppError, Result};
use crate::middleware::ensure_song_owner;
use crate::services::Claims;
use crate::AppState;

const MAX_TITLE_LEN: usize = 200;

/// Query parameters for listing songs.
#[derive(Debug, Deserialize)]
pub struct ListSongsQuery {
    /// Only songs with an open slot that the caller does not own.
    #[serde(default)]
    pub accepting_contributions: bool,
    /// Case-insensitive title substring.
    pub title: Option<String>,
    /// Page number (1-indexed, default: 1).
    pub page: Option<u32>,
    /// Items per page (default: 20, max: 100).
    pub limit: Option<u32>,
}

/// Query parameters for a user's songs.
#[derive(Debug, Deserialize)]
pub struct UserSongsQuery {
    pub title: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSongRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: License,
    #[serde(default)]
    pub published: bool,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateSongRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub license: Option<License>,
    pub published: Option<bool>,
}

/// Song with its counters and tracks.
#[derive(Debug, Serialize)]
pub struct SongDetail {
    #[serde(flatten)]
    pub song: Song,
    pub stats: SongStats,
    pub tracks: Vec<Track>,
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

/// Loads a song the caller may see. Unpublished songs exist only for their owner.
pub(crate) fn visible_song(
    conn: &rusqlite::Connection,
    song_id: i64,
    viewer: Option<&Claims>,
) -> Result<Song> {
    let song = queries::get_song(conn, song_id)?;
    if !song.published && viewer.map(|c| c.sub) != Some(song.created_by) {
        return Err(AppError::NotFound("Song not found".to_string()));
    }
    Ok(song)
}

/// GET /api/songs
pub async fn list_songs(
    State(state): State<AppState>,
    viewer: Option<Extension<Claims>>,
    Query(query): Query<ListSongsQuery>,
) -> Result<Json<PaginatedResponse<Song>>> {
    let (page, limit, offset) = paginate(query.page, query.limit);
    let filter = SongFilter {
        accepting_contributions: query.accepting_contributions,
        owner_id: None,
        title: query.title.filter(|t| !t.trim().is_empty()),
        viewer_id: viewer.map(|Extension(c)| c.sub),
    };

    let db = state.db.lock().await;
    let (songs, total) = queries::list_songs(&db, &filter, limit, offset)?;

    Ok(Json(PaginatedResponse::new(songs, total, page, limit)))
}

/// GET /api/users/:username/songs
pub async fn list_user_songs(
    State(state): State<AppState>,
    viewer: Option<Extension<Claims>>,
    Path(username): Path<String>,
    Query(query): Query<UserSongsQuery>,
) -> Result<Json<PaginatedResponse<Song>>> {
    let (page, limit, offset) = paginate(query.page, query.limit);

    let db = state.db.lock().await;
    let owner_id = queries::find_user_id(&db, &username)?;
    let filter = SongFilter {
        accepting_contributions: false,
        owner_id: Some(owner_id),
        title: query.title.filter(|t| !t.trim().is_empty()),
        viewer_id: viewer.map(|Extension(c)| c.sub),
    };
    let (songs, total) = queries::list_songs(&db, &filter, limit, offset)?;

    Ok(Json(PaginatedResponse::new(songs, total, page, limit)))
}

/// POST /api/songs
pub async fn create_song(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateSongRequest>,
) -> Result<(StatusCode, Json<SongDetail>)> {
    let title = validate_title(&body.title)?;
    let uuid = uuid::Uuid::new_v4().to_string();

    let db = state.db.lock().await;
    let song_id = queries::insert_song(
        &db,
        &NewSong {
            uuid: &uuid,
            title: &title,
            description: body.description.trim(),
            license: body.license,
            published: body.published,
            created_by: claims.sub,
        },
    )?;

    tracing::info!(song_id, user_id = claims.sub, title = %title, "Song created");

    let detail = SongDetail {
        song: queries::get_song(&db, song_id)?,
        stats: queries::song_stats(&db, song_id)?,
        tracks: Vec::new(),
    };
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/songs/:id
///
/// Counts as a view.
pub async fn get_song(
    State(state): State<AppState>,
    viewer: Option<Extension<Claims>>,
    Path(song_id): Path<i64>,
) -> Result<Json<SongDetail>> {
    let viewer = viewer.map(|Extension(c)| c);

    let db = state.db.lock().await;
    let song = visible_song(&db, song_id, viewer.as_ref())?;
    let stats = queries::increment_views(&db, song_id)?;
    let tracks = queries::list_tracks(&db, song_id, None)?;

    Ok(Json(SongDetail {
        song,
        stats,
        tracks,
    }))
}

/// PUT /api/songs/:id
pub async fn update_song(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(song_id): Path<i64>,
    Json(body): Json<UpdateSongRequest>,
) -> Result<Json<Song>> {
    let db = state.db.lock().await;
    let song = queries::get_song(&db, song_id)?;
    ensure_song_owner(&claims, &song)?;

    let title = match &body.title {
        Some(title) => validate_title(title)?,
        None => song.title.clone(),
    };
    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or(song.description.as_str());

    queries::update_song(
        &db,
        song_id,
        &title,
        description,
        body.license.unwrap_or(song.license),
        body.published.unwrap_or(song.published),
    )?;

    tracing::info!(song_id, user_id = claims.sub, "Song updated");

    Ok(Json(queries::get_song(&db, song_id)?))
}

/// DELETE /api/songs/:id
///
/// Removes the song with its tracks and requests, then its stored audio.
pub async fn delete_song(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(song_id): Path<i64>,
) -> Result<StatusCode> {
    let urls = {
        let db = state.db.lock().await;
        let song = queries::get_song(&db, song_id)?;
        ensure_song_owner(&claims, &song)?;

        let urls = queries::song_audio_urls(&db, song_id)?;
        queries::delete_song(&db, song_id)?;
        urls
    };

    tracing::info!(song_id, user_id = claims.sub, objects = urls.len(), "Song deleted");

    for url in &urls {
        state.storage.delete_url_best_effort(url).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/songs/:id/like
pub async fn like_song(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(song_id): Path<i64>,
) -> Result<Json<SongStats>> {
    let db = state.db.lock().await;
    visible_song(&db, song_id, Some(&claims))?;
    let stats = queries::increment_likes(&db, song_id)?;

    tracing::debug!(song_id, user_id = claims.sub, likes = stats.likes, "Song liked");

    Ok(Json(stats))
}

/// GET /api/songs/:id/download
///
/// Zip of every filled track's audio.
pub async fn download_song(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(song_id): Path<i64>,
) -> Result<Response> {
    let archive = state.archives.build(claims.sub, song_id).await?;

    let disposition = format!("attachment; filename=\"{}\"", archive.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive.bytes,
    )
        .into_response())
}
