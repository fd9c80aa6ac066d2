//! API endpoint handlers for the SongHub backend.

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_mw,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;

use crate::middleware::{auth_middleware, optional_auth_middleware};
use crate::AppState;

pub mod auth;
pub mod notifications;
pub mod songs;
pub mod track_requests;
pub mod tracks;
pub mod upload;
pub mod users;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// Items in the current page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page number (1-indexed).
    pub page: u32,
    /// Total number of pages.
    pub pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let pages = total.div_ceil(limit.max(1) as u64) as u32;
        Self {
            items,
            total,
            page,
            pages,
        }
    }
}

/// Normalizes page/limit query values into `(page, limit, offset)`.
pub fn paginate(page: Option<u32>, limit: Option<u32>) -> (u32, u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1).saturating_mul(limit))
}

/// Builds the complete application router.
///
/// Song and profile reads are open to anonymous callers; everything else
/// requires a bearer token.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let read_routes = Router::new()
        .route("/api/songs", get(songs::list_songs))
        .route("/api/songs/:id", get(songs::get_song))
        .route("/api/songs/:id/tracks", get(tracks::list_tracks))
        .route("/api/users/:username", get(users::get_profile))
        .route("/api/users/:username/songs", get(songs::list_user_songs))
        .route("/api/users/:username/skills", get(users::list_skills))
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/songs", post(songs::create_song))
        .route(
            "/api/songs/:id",
            put(songs::update_song).delete(songs::delete_song),
        )
        .route("/api/songs/:id/like", post(songs::like_song))
        .route("/api/songs/:id/download", get(songs::download_song))
        .route("/api/songs/:id/tracks", post(tracks::create_track))
        .route("/api/songs/:id/slots", post(tracks::create_slot))
        .route(
            "/api/songs/:id/tracks/:track_id",
            put(tracks::update_track).delete(tracks::delete_track),
        )
        .route(
            "/api/songs/:id/tracks/:track_id/reopen",
            post(tracks::reopen_track),
        )
        .route(
            "/api/tracks/:track_id/requests",
            post(track_requests::submit_request),
        )
        .route("/api/track-requests", get(track_requests::list_incoming))
        .route("/api/track-requests/:id", get(track_requests::get_request))
        .route(
            "/api/track-requests/:id/approve",
            post(track_requests::approve_request),
        )
        .route(
            "/api/track-requests/:id/decline",
            post(track_requests::decline_request),
        )
        .route(
            "/api/users/:username/contributions",
            get(track_requests::list_contributions),
        )
        .route("/api/users/:username/skills", post(users::add_skill))
        .route(
            "/api/users/:username/skills/:skill_id",
            delete(users::delete_skill),
        )
        .route(
            "/api/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/notifications/:id/read",
            post(notifications::mark_read),
        )
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(crate::health_check))
        .merge(public_routes)
        .merge(read_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// State over an in-memory database and a local object store under `root`.
#[cfg(test)]
pub(crate) fn test_state(root: &std::path::Path) -> AppState {
    use crate::config::{ArchiveConfig, Config, DatabaseConfig, ServerConfig, StorageConfig};
    use crate::services::storage::LocalStore;
    use crate::services::{AuthService, StorageClient};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: Some("secret".to_string()),
            max_upload_bytes: 1024,
        },
        database: DatabaseConfig {
            path: ":memory:".into(),
        },
        storage: StorageConfig {
            local_root: root.join("objects"),
            ..Default::default()
        },
        archive: ArchiveConfig {
            work_dir: root.join("work"),
        },
    };
    let db = Arc::new(Mutex::new(crate::db::init_db_memory().unwrap()));
    let storage = StorageClient::new_shared(
        Arc::new(LocalStore::new(root.join("objects"))),
        Duration::from_secs(1),
    );
    AppState::new(
        Arc::new(config),
        db,
        Arc::new(AuthService::new("secret".to_string())),
        storage,
    )
}
