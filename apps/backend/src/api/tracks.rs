//! Track API endpoints.
//!
//! Only the song owner mutates tracks. Audio is uploaded before the database
//! lock is taken, and objects that end up unreferenced are removed after it is
//! released.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use rusqlite::Connection;
use serde::Deserialize;

use super::songs::visible_song;
use super::upload::read_form;
use crate::db::models::{AudioRef, Song, Track};
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::middleware::ensure_song_owner;
use crate::services::storage::{ObjectKind, SongScope};
use crate::services::{AudioUpload, Claims};
use crate::AppState;

const MAX_INSTRUMENT_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub instrument: String,
}

fn validate_instrument(instrument: Option<&str>) -> Result<String> {
    let instrument = instrument
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .ok_or_else(|| AppError::BadRequest("Instrument is required".to_string()))?;
    if instrument.chars().count() > MAX_INSTRUMENT_LEN {
        return Err(AppError::BadRequest(format!(
            "Instrument must be at most {} characters",
            MAX_INSTRUMENT_LEN
        )));
    }
    Ok(instrument.to_string())
}

fn owned_song(conn: &Connection, claims: &Claims, song_id: i64) -> Result<Song> {
    let song = queries::get_song(conn, song_id)?;
    ensure_song_owner(claims, &song)?;
    Ok(song)
}

fn owned_track(conn: &Connection, claims: &Claims, song_id: i64, track_id: i64) -> Result<Track> {
    owned_song(conn, claims, song_id)?;
    queries::get_song_track(conn, song_id, track_id)
}

/// Uploads owner audio for a track under the song's key prefix.
async fn store_track_audio(
    state: &AppState,
    song: &Song,
    track_uuid: &str,
    upload: &AudioUpload,
) -> Result<AudioRef> {
    state
        .storage
        .store_audio(
            SongScope {
                owner: &song.owner,
                song_uuid: &song.uuid,
            },
            ObjectKind::Tracks,
            track_uuid,
            upload,
        )
        .await
        .map_err(AppError::UploadFailed)
}

/// Returns `url` if nothing in the database points at it any more.
fn orphaned(conn: &Connection, url: Option<String>, current: Option<&str>) -> Result<Option<String>> {
    match url {
        Some(url) if Some(url.as_str()) != current => {
            if queries::request_references_url(conn, &url)? {
                Ok(None)
            } else {
                Ok(Some(url))
            }
        }
        _ => Ok(None),
    }
}

/// GET /api/songs/:id/tracks
pub async fn list_tracks(
    State(state): State<AppState>,
    viewer: Option<Extension<Claims>>,
    Path(song_id): Path<i64>,
) -> Result<Json<Vec<Track>>> {
    let viewer = viewer.map(|Extension(c)| c);

    let db = state.db.lock().await;
    visible_song(&db, song_id, viewer.as_ref())?;
    Ok(Json(queries::list_tracks(&db, song_id, None)?))
}

/// POST /api/songs/:id/tracks
///
/// Multipart form with `instrument` and an `audio` file. The track is created
/// filled (private).
pub async fn create_track(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(song_id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Track>)> {
    let song = {
        let db = state.db.lock().await;
        owned_song(&db, &claims, song_id)?
    };

    let form = read_form(multipart).await?;
    let instrument = validate_instrument(form.text("instrument"))?;
    let upload = form.require_audio()?;

    let uuid = uuid::Uuid::new_v4().to_string();
    let audio = store_track_audio(&state, &song, &uuid, &upload).await?;

    let inserted = {
        let db = state.db.lock().await;
        queries::insert_track(&db, &uuid, song_id, &instrument, Some(&audio), claims.sub)
    };
    let track = match inserted {
        Ok(track) => track,
        Err(e) => {
            state.storage.delete_url_best_effort(&audio.url).await;
            return Err(e);
        }
    };

    tracing::info!(
        track_id = track.id,
        song_id,
        instrument = %track.instrument,
        size = audio.size,
        "Track created"
    );

    Ok((StatusCode::CREATED, Json(track)))
}

/// POST /api/songs/:id/slots
///
/// Opens a slot other users can submit audio to.
pub async fn create_slot(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(song_id): Path<i64>,
    Json(body): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<Track>)> {
    let instrument = validate_instrument(Some(&body.instrument))?;
    let uuid = uuid::Uuid::new_v4().to_string();

    let db = state.db.lock().await;
    owned_song(&db, &claims, song_id)?;
    let track = queries::insert_track(&db, &uuid, song_id, &instrument, None, claims.sub)?;

    tracing::info!(track_id = track.id, song_id, instrument = %instrument, "Slot opened");

    Ok((StatusCode::CREATED, Json(track)))
}

/// PUT /api/songs/:id/tracks/:track_id
///
/// Multipart form with an optional `instrument` and an optional `audio` file.
/// New audio makes the track private and clears contributor attribution.
pub async fn update_track(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((song_id, track_id)): Path<(i64, i64)>,
    multipart: Multipart,
) -> Result<Json<Track>> {
    let (song, track) = {
        let db = state.db.lock().await;
        let track = owned_track(&db, &claims, song_id, track_id)?;
        (queries::get_song(&db, song_id)?, track)
    };

    let form = read_form(multipart).await?;
    let instrument = match form.text("instrument") {
        Some(value) => Some(validate_instrument(Some(value))?),
        None => None,
    };
    let upload = form.audio;
    if instrument.is_none() && upload.is_none() {
        return Err(AppError::BadRequest(
            "Nothing to update: provide instrument and/or audio".to_string(),
        ));
    }

    // Replacements get their own key so the live object is never overwritten
    // before the new reference is committed.
    let audio = match &upload {
        Some(upload) => {
            let object_id = uuid::Uuid::new_v4().to_string();
            Some(store_track_audio(&state, &song, &object_id, upload).await?)
        }
        None => None,
    };

    let updated = apply_track_update(
        &state,
        song_id,
        track.id,
        instrument.as_deref(),
        audio.as_ref(),
    )
    .await?;

    tracing::info!(
        track_id,
        song_id,
        audio_replaced = audio.is_some(),
        "Track updated"
    );

    Ok(Json(updated))
}

/// Records an update whose audio, if any, is already stored.
///
/// On failure the freshly stored object is removed; on success the object the
/// track used to point at is removed unless a track request still uses it.
async fn apply_track_update(
    state: &AppState,
    song_id: i64,
    track_id: i64,
    instrument: Option<&str>,
    audio: Option<&AudioRef>,
) -> Result<Track> {
    let written = {
        let db = state.db.lock().await;
        write_track_update(&db, song_id, track_id, instrument, audio)
    };

    match written {
        Ok((track, stale)) => {
            if let Some(url) = stale {
                state.storage.delete_url_best_effort(&url).await;
            }
            Ok(track)
        }
        Err(e) => {
            if let Some(audio) = audio {
                tracing::warn!(track_id, url = %audio.url, "Track update failed, removing new audio");
                state.storage.delete_url_best_effort(&audio.url).await;
            }
            Err(e)
        }
    }
}

fn write_track_update(
    conn: &Connection,
    song_id: i64,
    track_id: i64,
    instrument: Option<&str>,
    audio: Option<&AudioRef>,
) -> Result<(Track, Option<String>)> {
    let current = queries::get_song_track(conn, song_id, track_id)?;

    let tx = conn.unchecked_transaction()?;
    if let Some(instrument) = instrument {
        queries::rename_track(&tx, track_id, instrument)?;
    }
    if let Some(audio) = audio {
        queries::set_track_audio(&tx, track_id, audio, None)?;
    }
    let stale = match audio {
        Some(audio) => orphaned(
            &tx,
            current.audio.map(|a| a.url),
            Some(audio.url.as_str()),
        )?,
        None => None,
    };
    let track = queries::get_track(&tx, track_id)?;
    tx.commit()?;

    Ok((track, stale))
}

/// POST /api/songs/:id/tracks/:track_id/reopen
///
/// Turns the track back into an open slot.
pub async fn reopen_track(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((song_id, track_id)): Path<(i64, i64)>,
) -> Result<Json<Track>> {
    let (reopened, stale) = {
        let db = state.db.lock().await;
        let track = owned_track(&db, &claims, song_id, track_id)?;
        queries::reopen_track(&db, track_id)?;
        let stale = orphaned(&db, track.audio.map(|a| a.url), None)?;
        (queries::get_track(&db, track_id)?, stale)
    };

    if let Some(url) = stale {
        state.storage.delete_url_best_effort(&url).await;
    }

    tracing::info!(track_id, song_id, "Track reopened as slot");

    Ok(Json(reopened))
}

/// DELETE /api/songs/:id/tracks/:track_id
pub async fn delete_track(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((song_id, track_id)): Path<(i64, i64)>,
) -> Result<StatusCode> {
    let urls = {
        let db = state.db.lock().await;
        owned_track(&db, &claims, song_id, track_id)?;
        let urls = queries::track_audio_urls(&db, track_id)?;
        queries::delete_track(&db, track_id)?;
        urls
    };

    for url in &urls {
        state.storage.delete_url_best_effort(url).await;
    }

    tracing::info!(track_id, song_id, objects = urls.len(), "Track deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_state;
    use crate::db::models::License;
    use bytes::Bytes;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        objects: std::path::PathBuf,
        state: AppState,
        song: Song,
        track: Track,
    }

    fn upload(name: &str, data: &'static [u8]) -> AudioUpload {
        AudioUpload {
            file_name: name.to_string(),
            content_type: "audio/mpeg".to_string(),
            data: Bytes::from_static(data),
        }
    }

    fn object_path(objects: &std::path::Path, url: &str) -> std::path::PathBuf {
        objects.join(url.strip_prefix("local://").unwrap())
    }

    /// Alice's song with one track holding `take1.mp3`.
    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let objects = dir.path().join("objects");
        let state = test_state(dir.path());

        let song = {
            let db = state.db.lock().await;
            db.execute(
                "INSERT INTO users (username, password_hash) VALUES ('alice', 'x')",
                [],
            )
            .unwrap();
            let owner = db.last_insert_rowid();
            let song_id = queries::insert_song(
                &db,
                &queries::NewSong {
                    uuid: "song-uuid",
                    title: "Song",
                    description: "",
                    license: License::CcBy,
                    published: true,
                    created_by: owner,
                },
            )
            .unwrap();
            queries::get_song(&db, song_id).unwrap()
        };

        let audio = store_track_audio(&state, &song, "track-uuid", &upload("take1.mp3", b"one"))
            .await
            .unwrap();
        let track = {
            let db = state.db.lock().await;
            queries::insert_track(&db, "track-uuid", song.id, "drums", Some(&audio), song.created_by)
                .unwrap()
        };

        Fixture {
            _dir: dir,
            objects,
            state,
            song,
            track,
        }
    }

    #[tokio::test]
    async fn test_replacement_keeps_live_object_until_committed() {
        let fx = fixture().await;
        let old_url = fx.track.audio.clone().unwrap().url;

        let staged = store_track_audio(
            &fx.state,
            &fx.song,
            &uuid::Uuid::new_v4().to_string(),
            &upload("take2.mp3", b"two"),
        )
        .await
        .unwrap();
        assert_ne!(staged.url, old_url);
        assert_eq!(
            std::fs::read(object_path(&fx.objects, &old_url)).unwrap(),
            b"one"
        );

        let updated = apply_track_update(&fx.state, fx.song.id, fx.track.id, None, Some(&staged))
            .await
            .unwrap();

        assert_eq!(updated.audio.unwrap().url, staged.url);
        assert!(!object_path(&fx.objects, &old_url).exists());
        assert_eq!(
            std::fs::read(object_path(&fx.objects, &staged.url)).unwrap(),
            b"two"
        );
    }

    #[tokio::test]
    async fn test_track_deleted_before_commit_removes_new_audio() {
        let fx = fixture().await;

        let staged = store_track_audio(
            &fx.state,
            &fx.song,
            &uuid::Uuid::new_v4().to_string(),
            &upload("take2.mp3", b"two"),
        )
        .await
        .unwrap();
        assert!(object_path(&fx.objects, &staged.url).exists());

        {
            let db = fx.state.db.lock().await;
            queries::delete_track(&db, fx.track.id).unwrap();
        }

        let result = apply_track_update(
            &fx.state,
            fx.song.id,
            fx.track.id,
            Some("percussion"),
            Some(&staged),
        )
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(!object_path(&fx.objects, &staged.url).exists());
    }

    #[tokio::test]
    async fn test_rename_only_leaves_audio_alone() {
        let fx = fixture().await;
        let old_url = fx.track.audio.clone().unwrap().url;

        let updated = apply_track_update(&fx.state, fx.song.id, fx.track.id, Some("percussion"), None)
            .await
            .unwrap();

        assert_eq!(updated.instrument, "percussion");
        assert_eq!(updated.audio.unwrap().url, old_url);
        assert!(object_path(&fx.objects, &old_url).exists());
    }
}
