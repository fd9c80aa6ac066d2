//! HTTP middleware for the SongHub backend.

pub mod auth;

pub use auth::{auth_middleware, ensure_song_owner, optional_auth_middleware};
