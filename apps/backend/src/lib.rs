//! SongHub Backend Library
//!
//! Collaborative music backend: songs split into instrument tracks, open slots
//! that other users contribute audio to, and an owner approval workflow.
//! This library exposes modules for use in integration tests.

use axum::response::Json;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod services;

use config::Config;
use services::{
    ArchiveBuilder, AuthService, DbNotifier, Notifier, StorageClient, TrackRequestService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<Mutex<Connection>>,
    pub auth_service: Arc<AuthService>,
    pub storage: Arc<StorageClient>,
    pub track_requests: Arc<TrackRequestService>,
    pub archives: Arc<ArchiveBuilder>,
}

impl AppState {
    /// Wires the services together, persisting notifications to the database.
    pub fn new(
        config: Arc<Config>,
        db: Arc<Mutex<Connection>>,
        auth_service: Arc<AuthService>,
        storage: Arc<StorageClient>,
    ) -> Self {
        let notifier: Arc<dyn Notifier> = Arc::new(DbNotifier::new(Arc::clone(&db)));
        Self::with_notifier(config, db, auth_service, storage, notifier)
    }

    pub fn with_notifier(
        config: Arc<Config>,
        db: Arc<Mutex<Connection>>,
        auth_service: Arc<AuthService>,
        storage: Arc<StorageClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let track_requests = Arc::new(TrackRequestService::new(
            Arc::clone(&db),
            Arc::clone(&storage),
            notifier,
        ));
        let archives = Arc::new(ArchiveBuilder::new(
            Arc::clone(&db),
            Arc::clone(&storage),
            config.archive.work_dir.clone(),
        ));

        Self {
            config,
            db,
            auth_service,
            storage,
            track_requests,
            archives,
        }
    }

    /// Get a reference to the auth service.
    pub fn auth_service(&self) -> &AuthService {
        &self.auth_service
    }
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub message: String,
    pub version: String,
}

pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "SongHub Backend is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
