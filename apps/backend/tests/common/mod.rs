//! Test infrastructure for SongHub backend integration tests.
//!
//! Provides a `TestApp` wrapper around `axum_test::TestServer` with helper methods
//! for creating users, generating auth tokens, and seeding songs and tracks.

#![allow(dead_code)]

use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

use songhub::config::{
    ArchiveConfig, Config, DatabaseConfig, ServerConfig, StorageBackend, StorageConfig,
};
use songhub::db::models::User;
use songhub::services::storage::LocalStore;
use songhub::services::{AuthService, StorageClient};
use songhub::{api, db, AppState};

const TEST_JWT_SECRET: &str = "test-jwt-secret-for-integration-tests";

/// Test application wrapper around axum_test::TestServer.
///
/// Each instance owns an in-memory database, a temporary object store root and
/// a temporary archive work directory.
pub struct TestApp {
    server: TestServer,
    db: Arc<Mutex<Connection>>,
    auth_service: Arc<AuthService>,
    objects: TempDir,
    work_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let conn = db::init_db_memory().expect("Failed to initialize test database");
        let db = Arc::new(Mutex::new(conn));

        let objects = TempDir::new().expect("Failed to create object store dir");
        let work_dir = TempDir::new().expect("Failed to create archive work dir");

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                jwt_secret: Some(TEST_JWT_SECRET.to_string()),
                max_upload_bytes: 10 * 1024 * 1024,
            },
            database: DatabaseConfig {
                path: ":memory:".into(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                local_root: objects.path().to_path_buf(),
                ..Default::default()
            },
            archive: ArchiveConfig {
                work_dir: work_dir.path().to_path_buf(),
            },
        };

        let auth_service = Arc::new(AuthService::new(TEST_JWT_SECRET.to_string()));
        let storage = StorageClient::new_shared(
            Arc::new(LocalStore::new(objects.path().to_path_buf())),
            Duration::from_secs(5),
        );

        let state = AppState::new(
            Arc::new(config),
            Arc::clone(&db),
            Arc::clone(&auth_service),
            storage,
        );

        let server = TestServer::new(api::router(state)).expect("Failed to create test server");

        Self {
            server,
            db,
            auth_service,
            objects,
            work_dir,
        }
    }

    pub fn server(&self) -> &TestServer {
        &self.server
    }

    /// Get a reference to the database connection.
    ///
    /// Useful for seeding test data or verifying database state.
    pub fn db(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }

    pub fn objects_root(&self) -> &Path {
        self.objects.path()
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    /// Create a test user in the database and return its id.
    pub async fn create_test_user(&self, username: &str, password: &str) -> i64 {
        let registration = self
            .auth_service
            .prepare_registration(username, password)
            .expect("Invalid test credentials");

        let db = self.db.lock().await;
        db::queries::insert_user(&db, &registration)
            .expect("Failed to create test user")
            .id
    }

    pub fn get_auth_token(&self, user_id: i64, username: &str) -> String {
        let user = User {
            id: user_id,
            username: username.to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        self.auth_service
            .issue_token(&user)
            .expect("Failed to create token")
    }

    /// Create an Authorization header tuple for use with HTTP requests.
    pub fn auth_header(&self, token: &str) -> (HeaderName, HeaderValue) {
        (
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid token format"),
        )
    }

    /// Creates a user and returns its id with an Authorization header.
    pub async fn create_user(&self, username: &str) -> (i64, (HeaderName, HeaderValue)) {
        let user_id = self.create_test_user(username, "password123").await;
        let token = self.get_auth_token(user_id, username);
        (user_id, self.auth_header(&token))
    }

    /// Creates a published song through the API and returns its id.
    pub async fn create_song(&self, auth: &(HeaderName, HeaderValue), title: &str) -> i64 {
        let response = self
            .server
            .post("/api/songs")
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&serde_json::json!({ "title": title, "published": true }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<serde_json::Value>()["id"]
            .as_i64()
            .expect("song id")
    }

    /// Opens a contributor slot and returns the track id.
    pub async fn create_slot(
        &self,
        auth: &(HeaderName, HeaderValue),
        song_id: i64,
        instrument: &str,
    ) -> i64 {
        let response = self
            .server
            .post(&format!("/api/songs/{}/slots", song_id))
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&serde_json::json!({ "instrument": instrument }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<serde_json::Value>()["id"]
            .as_i64()
            .expect("track id")
    }

    /// Creates an owner track with audio and returns the track id.
    pub async fn create_track(
        &self,
        auth: &(HeaderName, HeaderValue),
        song_id: i64,
        instrument: &str,
        file_name: &str,
        data: &'static [u8],
    ) -> i64 {
        let form = MultipartForm::new()
            .add_text("instrument", instrument)
            .add_part("audio", audio_part(file_name, data));
        let response = self
            .server
            .post(&format!("/api/songs/{}/tracks", song_id))
            .add_header(auth.0.clone(), auth.1.clone())
            .multipart(form)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<serde_json::Value>()["id"]
            .as_i64()
            .expect("track id")
    }

    /// Submits a track request and returns the raw response.
    pub async fn submit_request(
        &self,
        auth: &(HeaderName, HeaderValue),
        track_id: i64,
        file_name: &str,
        data: &'static [u8],
    ) -> axum_test::TestResponse {
        let form = MultipartForm::new().add_part("audio", audio_part(file_name, data));
        self.server
            .post(&format!("/api/tracks/{}/requests", track_id))
            .add_header(auth.0.clone(), auth.1.clone())
            .multipart(form)
            .await
    }

    pub async fn count(&self, table: &str) -> i64 {
        let db = self.db.lock().await;
        db.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .expect("count query")
    }
}

/// Multipart part carrying an audio file.
pub fn audio_part(file_name: &str, data: &'static [u8]) -> Part {
    Part::bytes(data)
        .file_name(file_name)
        .mime_type("audio/mpeg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        let response = app.server().get("/health").await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_auth_header_format() {
        let app = TestApp::new().await;
        let (_, (name, value)) = app.create_user("alice").await;

        assert_eq!(name, AUTHORIZATION);
        assert!(value.to_str().unwrap().starts_with("Bearer "));
    }
}
