//! User profile and skills endpoints.
//!
//! Profiles and skill lists are public. Only the user themselves edits their
//! skills.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::db::{models::Skill, queries};
use crate::error::{AppError, Result};
use crate::services::Claims;
use crate::AppState;

const MAX_SKILL_LEN: usize = 50;

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub created_at: String,
    pub published_songs: i64,
    pub approved_contributions: i64,
}

#[derive(Debug, Deserialize)]
pub struct SkillsQuery {
    /// Case-insensitive substring of the skill name.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddSkillRequest {
    pub name: String,
}

fn validate_skill(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Skill name is required".to_string()));
    }
    if name.chars().count() > MAX_SKILL_LEN {
        return Err(AppError::BadRequest(format!(
            "Skill name must be at most {} characters",
            MAX_SKILL_LEN
        )));
    }
    Ok(name)
}

/// Resolves the path user and checks the caller is that user.
fn own_user_id(conn: &rusqlite::Connection, claims: &Claims, username: &str) -> Result<i64> {
    let user_id = queries::find_user_id(conn, username)?;
    if user_id != claims.sub {
        return Err(AppError::NotAuthorized);
    }
    Ok(user_id)
}

/// GET /api/users/:username
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>> {
    let db = state.db.lock().await;
    let user = queries::get_user_by_username(&db, &username)?;
    let (published_songs, approved_contributions) = queries::profile_counts(&db, user.id)?;

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
        published_songs,
        approved_contributions,
    }))
}

/// GET /api/users/:username/skills
pub async fn list_skills(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<SkillsQuery>,
) -> Result<Json<Vec<Skill>>> {
    let db = state.db.lock().await;
    let user_id = queries::find_user_id(&db, &username)?;
    Ok(Json(queries::list_skills(
        &db,
        user_id,
        query.name.as_deref(),
    )?))
}

/// POST /api/users/:username/skills
pub async fn add_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    Json(body): Json<AddSkillRequest>,
) -> Result<(StatusCode, Json<Skill>)> {
    let name = validate_skill(&body.name)?;

    let db = state.db.lock().await;
    let user_id = own_user_id(&db, &claims, &username)?;
    let skill = queries::insert_skill(&db, user_id, name)?;

    tracing::info!(user_id, skill_id = skill.id, name = %skill.name, "Skill added");

    Ok((StatusCode::CREATED, Json(skill)))
}

/// DELETE /api/users/:username/skills/:skill_id
pub async fn delete_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((username, skill_id)): Path<(String, i64)>,
) -> Result<StatusCode> {
    let db = state.db.lock().await;
    let user_id = own_user_id(&db, &claims, &username)?;
    queries::delete_skill(&db, user_id, skill_id)?;

    tracing::info!(user_id, skill_id, "Skill removed");

    Ok(StatusCode::NO_CONTENT)
}
