//! Track request workflow.
//!
//! A contributor submits audio against an open track; the song owner approves
//! or declines it. `pending` is the only state a request can leave, and it
//! leaves it exactly once.

use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::models::{NotificationVerb, Song, Track, TrackRequest, TrackRequestStatus};
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::services::notifications::{self, NotificationEvent, Notifier};
use crate::services::storage::{AudioUpload, ObjectKind, SongScope, StorageClient};

pub struct TrackRequestService {
    db: Arc<Mutex<Connection>>,
    storage: Arc<StorageClient>,
    notifier: Arc<dyn Notifier>,
}

impl TrackRequestService {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        storage: Arc<StorageClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            storage,
            notifier,
        }
    }

    /// Stages the audio, records a pending request and notifies the song owner.
    ///
    /// Nothing is persisted when the upload fails. If the record cannot be
    /// written after a successful upload, the staged object is removed.
    pub async fn submit(
        &self,
        caller_id: i64,
        track_id: i64,
        upload: AudioUpload,
    ) -> Result<TrackRequest> {
        let (track, song) = {
            let conn = self.db.lock().await;
            let (track, song) = load_track_and_song(&conn, track_id)?;
            // Unpublished songs do not exist for anyone but their owner
            if !song.published && song.created_by != caller_id {
                return Err(AppError::NotFound("Track not found".to_string()));
            }
            ensure_open(&track)?;
            (track, song)
        };

        let uuid = uuid::Uuid::new_v4().to_string();
        let scope = SongScope {
            owner: &song.owner,
            song_uuid: &song.uuid,
        };
        let audio = self
            .storage
            .store_audio(scope, ObjectKind::TrackRequests, &uuid, &upload)
            .await
            .map_err(AppError::UploadFailed)?;

        let inserted = {
            let conn = self.db.lock().await;
            // The slot may have been filled while the upload was in flight
            queries::get_track(&conn, track.id)
                .and_then(|current| ensure_open(&current))
                .and_then(|_| {
                    queries::insert_track_request(&conn, &uuid, track.id, caller_id, &audio)
                })
        };

        let request = match inserted {
            Ok(request) => request,
            Err(e) => {
                self.storage.delete_url_best_effort(&audio.url).await;
                return Err(e);
            }
        };

        tracing::info!(
            request_id = request.id,
            track_id = track.id,
            song_id = song.id,
            submitted_by = caller_id,
            size = request.audio.size,
            "Track request submitted"
        );

        notifications::dispatch(
            self.notifier.as_ref(),
            NotificationEvent {
                actor_id: caller_id,
                recipient_id: song.created_by,
                verb: NotificationVerb::TrackRequestPending,
                action_object_id: request.id,
                target_id: song.id,
            },
        )
        .await;

        Ok(request)
    }

    /// Approves a pending request, copying its audio onto the track.
    pub async fn approve(&self, caller_id: i64, request_id: i64) -> Result<TrackRequest> {
        self.resolve(caller_id, request_id, TrackRequestStatus::Approved)
            .await
    }

    /// Declines a pending request. The track is left untouched.
    pub async fn decline(&self, caller_id: i64, request_id: i64) -> Result<TrackRequest> {
        self.resolve(caller_id, request_id, TrackRequestStatus::Declined)
            .await
    }

    async fn resolve(
        &self,
        caller_id: i64,
        request_id: i64,
        to: TrackRequestStatus,
    ) -> Result<TrackRequest> {
        let (request, song) = {
            let conn = self.db.lock().await;
            let request = queries::get_track_request(&conn, request_id)?;
            let (track, song) = load_track_and_song(&conn, request.track_id)?;

            if song.created_by != caller_id {
                tracing::debug!(
                    request_id,
                    user_id = caller_id,
                    "Rejected track request resolution by non-owner"
                );
                return Err(AppError::NotAuthorized);
            }

            let tx = conn.unchecked_transaction()?;
            if !queries::transition_track_request(&tx, request_id, to)? {
                let from = queries::get_track_request(&tx, request_id)?.status;
                return Err(AppError::InvalidStateTransition { from, to });
            }
            if to == TrackRequestStatus::Approved {
                queries::set_track_audio(&tx, track.id, &request.audio, Some(request.created_by))?;
            }
            tx.commit()?;

            (queries::get_track_request(&conn, request_id)?, song)
        };

        tracing::info!(
            request_id,
            track_id = request.track_id,
            song_id = song.id,
            status = %request.status,
            "Track request resolved"
        );

        let verb = match to {
            TrackRequestStatus::Approved => NotificationVerb::TrackRequestApproved,
            _ => NotificationVerb::TrackRequestDeclined,
        };
        notifications::dispatch(
            self.notifier.as_ref(),
            NotificationEvent {
                actor_id: caller_id,
                recipient_id: request.created_by,
                verb,
                action_object_id: request.id,
                target_id: song.id,
            },
        )
        .await;

        Ok(request)
    }

    /// Request detail, visible to the submitter and the song owner.
    pub async fn get(&self, caller_id: i64, request_id: i64) -> Result<TrackRequest> {
        let conn = self.db.lock().await;
        let request = queries::get_track_request(&conn, request_id)?;
        if request.created_by == caller_id {
            return Ok(request);
        }
        let (_, song) = load_track_and_song(&conn, request.track_id)?;
        if song.created_by != caller_id {
            return Err(AppError::NotAuthorized);
        }
        Ok(request)
    }

    /// Requests against songs owned by `owner_id`.
    pub async fn list_incoming(
        &self,
        owner_id: i64,
        status: Option<TrackRequestStatus>,
    ) -> Result<Vec<TrackRequest>> {
        let conn = self.db.lock().await;
        queries::list_incoming_requests(&conn, owner_id, status)
    }

    /// Requests submitted by `username` that `caller_id` may read.
    ///
    /// The submitter sees all of them; anyone else only those against songs
    /// they own, the same rule [`TrackRequestService::get`] applies.
    pub async fn list_contributions(
        &self,
        caller_id: i64,
        username: &str,
        status: Option<TrackRequestStatus>,
    ) -> Result<Vec<TrackRequest>> {
        let conn = self.db.lock().await;
        let user_id = queries::find_user_id(&conn, username)?;
        queries::list_submitted_requests(&conn, user_id, caller_id, status)
    }
}

fn load_track_and_song(conn: &Connection, track_id: i64) -> Result<(Track, Song)> {
    let track = queries::get_track(conn, track_id)?;
    let song = queries::get_song(conn, track.song_id)?;
    Ok((track, song))
}

fn ensure_open(track: &Track) -> Result<()> {
    if track.public {
        Ok(())
    } else {
        Err(AppError::TrackNotOpen)
    }
}
