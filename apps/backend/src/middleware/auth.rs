//! Authentication middleware for SongHub.
//!
//! Provides JWT validation and song ownership guards.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};

use crate::db::models::Song;
use crate::error::{AppError, Result};
use crate::services::auth::Claims;
use crate::AppState;

/// Extracts the Bearer token from the Authorization header.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Authentication middleware that validates JWT tokens.
///
/// Extracts the Bearer token from the Authorization header, validates it,
/// and adds the claims to the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(&request).ok_or(AppError::Unauthenticated)?;

    let auth_service = state.auth_service();
    let claims = auth_service.verify_token(token)?;

    // Add claims to request extensions for downstream handlers
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Like [`auth_middleware`], but lets anonymous requests through.
///
/// A present but invalid token is still rejected, so a client with an expired
/// session finds out instead of silently seeing the public view.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    if let Some(token) = extract_bearer_token(&request) {
        let claims = state.auth_service().verify_token(token)?;
        request.extensions_mut().insert(claims);
    }

    Ok(next.run(request).await)
}

/// Ensures the caller owns the song a mutation targets.
pub fn ensure_song_owner(claims: &Claims, song: &Song) -> Result<()> {
    if song.created_by != claims.sub {
        tracing::debug!(
            user_id = claims.sub,
            song_id = song.id,
            "Rejected mutation by non-owner"
        );
        return Err(AppError::NotAuthorized);
    }
    Ok(())
}
