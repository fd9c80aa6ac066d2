//! Authentication API endpoints.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::db::{models::User, queries};
use crate::error::{AppError, Result};
use crate::services::Claims;
use crate::AppState;

/// Login and registration request body.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Login response with JWT token.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Generic success response.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// POST /api/auth/register
///
/// Creates an account and returns a token for it.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<LoginResponse>)> {
    let auth_service = state.auth_service();
    let registration = auth_service.prepare_registration(&body.username, &body.password)?;

    let user = {
        let db = state.db.lock().await;
        queries::insert_user(&db, &registration)?
    };
    let token = auth_service.issue_token(&user)?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(LoginResponse { token, user })))
}

/// POST /api/auth/login
///
/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>> {
    if body.username.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let db = state.db.lock().await;
    let auth_service = state.auth_service();

    let credentials = queries::find_credentials(&db, body.username.trim())?;
    auth_service.authenticate(
        &body.password,
        credentials.as_ref().map(|(_, hash)| hash.as_str()),
    )?;
    let user_id = credentials
        .map(|(id, _)| id)
        .ok_or(AppError::Unauthenticated)?;

    let user = queries::get_user(&db, user_id)?;
    let token = auth_service.issue_token(&user)?;

    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    Ok(Json(LoginResponse { token, user }))
}

/// POST /api/auth/logout
///
/// Logs out the user. Since we use stateless JWT tokens, this is a no-op
/// on the server side. The client should discard the token.
pub async fn logout(Extension(claims): Extension<Claims>) -> Result<Json<SuccessResponse>> {
    tracing::info!(user_id = claims.sub, "User logged out");

    Ok(Json(SuccessResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// GET /api/auth/me
///
/// Returns the current authenticated user's information.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>> {
    let db = state.db.lock().await;
    let user = queries::get_user(&db, claims.sub)?;
    Ok(Json(user))
}
