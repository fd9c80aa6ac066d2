//! SQL helpers shared by the API handlers and workflow services.
//!
//! Every helper takes a plain `&Connection` so callers decide whether it runs
//! inside a transaction.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{
    AudioRef, License, Notification, NotificationVerb, Skill, Song, SongStats, Track,
    TrackRequest, TrackRequestStatus, User,
};
use crate::error::{AppError, Result};
use crate::services::auth::Registration;

// =============================================================================
// Row mapping
// =============================================================================

const SONG_SELECT: &str = r#"
    SELECT s.id, s.uuid, s.title, s.description, s.license, s.published,
           s.created_by, u.username, s.created_at, s.updated_at
    FROM songs s
    JOIN users u ON u.id = s.created_by
"#;

const TRACK_COLUMNS: &str = r#"
    id, uuid, song_id, instrument, public, audio_url, audio_name,
    audio_content_type, audio_size, created_by, contributed_by,
    created_at, updated_at
"#;

const TRACK_REQUEST_COLUMNS: &str = r#"
    r.id, r.uuid, r.track_id, r.created_by, r.audio_url, r.audio_name,
    r.audio_content_type, r.audio_size, r.status, r.created_at, r.updated_at
"#;

fn text_conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

pub fn map_song_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    let license: String = row.get(4)?;
    Ok(Song {
        id: row.get(0)?,
        uuid: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        license: license
            .parse::<License>()
            .map_err(|e| text_conversion_error(4, e))?,
        published: row.get(5)?,
        created_by: row.get(6)?,
        owner: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn map_track_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        uuid: row.get(1)?,
        song_id: row.get(2)?,
        instrument: row.get(3)?,
        public: row.get(4)?,
        audio: AudioRef::from_columns(row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?),
        created_by: row.get(9)?,
        contributed_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub fn map_track_request_row(row: &Row<'_>) -> rusqlite::Result<TrackRequest> {
    let status: String = row.get(8)?;
    Ok(TrackRequest {
        id: row.get(0)?,
        uuid: row.get(1)?,
        track_id: row.get(2)?,
        created_by: row.get(3)?,
        audio: AudioRef {
            url: row.get(4)?,
            name: row.get(5)?,
            content_type: row.get(6)?,
            size: row.get(7)?,
        },
        status: status
            .parse::<TrackRequestStatus>()
            .map_err(|e| text_conversion_error(8, e))?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_notification_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let verb: String = row.get(3)?;
    Ok(Notification {
        id: row.get(0)?,
        actor_id: row.get(1)?,
        recipient_id: row.get(2)?,
        verb: verb
            .parse::<NotificationVerb>()
            .map_err(|e| text_conversion_error(3, e))?,
        action_object_id: row.get(4)?,
        target_id: row.get(5)?,
        unread: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn not_found(what: &str) -> impl FnOnce(rusqlite::Error) -> AppError + '_ {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("{} not found", what)),
        _ => AppError::Sqlite(e),
    }
}

// =============================================================================
// Users
// =============================================================================

pub fn get_user(conn: &Connection, user_id: i64) -> Result<User> {
    conn.query_row(
        "SELECT id, username, created_at, updated_at FROM users WHERE id = ?1",
        [user_id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        },
    )
    .map_err(not_found("User"))
}

pub fn find_user_id(conn: &Connection, username: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM users WHERE username = ?1",
        [username],
        |row| row.get(0),
    )
    .map_err(not_found("User"))
}

/// Inserts a checked registration; a taken username is a bad request.
pub fn insert_user(conn: &Connection, registration: &Registration) -> Result<User> {
    let inserted = conn.execute(
        "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
        params![registration.username, registration.password_hash],
    );
    match inserted {
        Ok(_) => get_user(conn, conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(AppError::BadRequest(format!(
                "Username '{}' is already taken",
                registration.username
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Id and password hash for a login, `None` for an unknown username.
pub fn find_credentials(conn: &Connection, username: &str) -> Result<Option<(i64, String)>> {
    Ok(conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE username = ?1",
            [username],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<User> {
    conn.query_row(
        "SELECT id, username, created_at, updated_at FROM users WHERE username = ?1",
        [username],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        },
    )
    .map_err(not_found("User"))
}

/// Published songs and approved contributions, as shown on a profile.
pub fn profile_counts(conn: &Connection, user_id: i64) -> Result<(i64, i64)> {
    let counts = conn.query_row(
        r#"
        SELECT
            (SELECT COUNT(*) FROM songs WHERE created_by = ?1 AND published = 1),
            (SELECT COUNT(*) FROM track_requests WHERE created_by = ?1 AND status = 'approved')
        "#,
        [user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

// =============================================================================
// Skills
// =============================================================================

fn map_skill_row(row: &Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// A user's skills, optionally narrowed to names containing `name` (any case).
pub fn list_skills(conn: &Connection, user_id: i64, name: Option<&str>) -> Result<Vec<Skill>> {
    let pattern = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| contains_pattern(&n.to_lowercase()));

    let mut stmt = conn.prepare(
        r#"
        SELECT id, user_id, name, created_at FROM skills
        WHERE user_id = ?1 AND (?2 IS NULL OR lower(name) LIKE ?2 ESCAPE '\')
        ORDER BY name, id
        "#,
    )?;
    let skills = stmt
        .query_map(params![user_id, pattern], map_skill_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(skills)
}

pub fn insert_skill(conn: &Connection, user_id: i64, name: &str) -> Result<Skill> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM skills WHERE user_id = ?1 AND name = ?2)",
        params![user_id, name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(AppError::BadRequest(format!("Skill '{}' is already listed", name)));
    }

    conn.execute(
        "INSERT INTO skills (user_id, name) VALUES (?1, ?2)",
        params![user_id, name],
    )?;
    let skill = conn.query_row(
        "SELECT id, user_id, name, created_at FROM skills WHERE id = ?1",
        [conn.last_insert_rowid()],
        map_skill_row,
    )?;
    Ok(skill)
}

/// Removes one of the user's skills; another user's skill id is not found.
pub fn delete_skill(conn: &Connection, user_id: i64, skill_id: i64) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM skills WHERE id = ?1 AND user_id = ?2",
        [skill_id, user_id],
    )?;
    if deleted == 0 {
        return Err(AppError::NotFound("Skill not found".to_string()));
    }
    Ok(())
}

// =============================================================================
// Songs
// =============================================================================

/// Fields accepted when creating a song.
#[derive(Debug, Clone)]
pub struct NewSong<'a> {
    pub uuid: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub license: License,
    pub published: bool,
    pub created_by: i64,
}

/// Filters for song listings.
#[derive(Debug, Default, Clone)]
pub struct SongFilter {
    /// Only songs with at least one open slot, excluding the viewer's own songs.
    pub accepting_contributions: bool,
    /// Only songs owned by this user.
    pub owner_id: Option<i64>,
    /// Case-insensitive title substring.
    pub title: Option<String>,
    /// Include unpublished songs owned by this user.
    pub viewer_id: Option<i64>,
}

pub fn get_song(conn: &Connection, song_id: i64) -> Result<Song> {
    conn.query_row(
        &format!("{} WHERE s.id = ?1", SONG_SELECT),
        [song_id],
        map_song_row,
    )
    .map_err(not_found("Song"))
}

/// Inserts a song together with its stats row.
pub fn insert_song(conn: &Connection, song: &NewSong<'_>) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        r#"
        INSERT INTO songs (uuid, title, description, license, published, created_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            song.uuid,
            song.title,
            song.description,
            song.license.to_string(),
            song.published,
            song.created_by
        ],
    )?;
    let song_id = tx.last_insert_rowid();
    tx.execute("INSERT INTO song_stats (song_id) VALUES (?1)", [song_id])?;
    tx.commit()?;
    Ok(song_id)
}

pub fn update_song(
    conn: &Connection,
    song_id: i64,
    title: &str,
    description: &str,
    license: License,
    published: bool,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE songs
        SET title = ?1, description = ?2, license = ?3, published = ?4,
            updated_at = datetime('now')
        WHERE id = ?5
        "#,
        params![title, description, license.to_string(), published, song_id],
    )?;
    Ok(())
}

pub fn delete_song(conn: &Connection, song_id: i64) -> Result<()> {
    conn.execute("DELETE FROM songs WHERE id = ?1", [song_id])?;
    Ok(())
}

/// `LIKE` pattern matching `needle` anywhere, with wildcards in `needle`
/// taken literally. Use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn list_songs(
    conn: &Connection,
    filter: &SongFilter,
    limit: u32,
    offset: u32,
) -> Result<(Vec<Song>, u64)> {
    let title_pattern = filter
        .title
        .as_ref()
        .map(|t| contains_pattern(&t.to_lowercase()));

    let where_clause = r#"
        WHERE (?1 = 0 OR ((?4 IS NULL OR s.created_by != ?4) AND EXISTS (
                  SELECT 1 FROM tracks t WHERE t.song_id = s.id AND t.public = 1)))
          AND (?2 IS NULL OR s.created_by = ?2)
          AND (?3 IS NULL OR lower(s.title) LIKE ?3 ESCAPE '\')
          AND (s.published = 1 OR s.created_by = ?4)
    "#;

    let total: u64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM songs s {}",
            where_clause
        ),
        params![
            filter.accepting_contributions,
            filter.owner_id,
            title_pattern,
            filter.viewer_id
        ],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} {} ORDER BY s.created_at DESC, s.id DESC LIMIT ?5 OFFSET ?6",
        SONG_SELECT, where_clause
    ))?;
    let songs = stmt
        .query_map(
            params![
                filter.accepting_contributions,
                filter.owner_id,
                title_pattern,
                filter.viewer_id,
                limit,
                offset
            ],
            map_song_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((songs, total))
}

pub fn song_stats(conn: &Connection, song_id: i64) -> Result<SongStats> {
    conn.query_row(
        "SELECT views, likes FROM song_stats WHERE song_id = ?1",
        [song_id],
        |row| {
            Ok(SongStats {
                views: row.get(0)?,
                likes: row.get(1)?,
            })
        },
    )
    .map_err(not_found("Song stats"))
}

pub fn increment_views(conn: &Connection, song_id: i64) -> Result<SongStats> {
    conn.execute(
        "UPDATE song_stats SET views = views + 1 WHERE song_id = ?1",
        [song_id],
    )?;
    song_stats(conn, song_id)
}

pub fn increment_likes(conn: &Connection, song_id: i64) -> Result<SongStats> {
    conn.execute(
        "UPDATE song_stats SET likes = likes + 1 WHERE song_id = ?1",
        [song_id],
    )?;
    song_stats(conn, song_id)
}

// =============================================================================
// Tracks
// =============================================================================

pub fn get_track(conn: &Connection, track_id: i64) -> Result<Track> {
    conn.query_row(
        &format!("SELECT {} FROM tracks WHERE id = ?1", TRACK_COLUMNS),
        [track_id],
        map_track_row,
    )
    .map_err(not_found("Track"))
}

/// Looks up a track scoped to its song, so `/songs/1/tracks/7` cannot reach
/// a track of another song.
pub fn get_song_track(conn: &Connection, song_id: i64, track_id: i64) -> Result<Track> {
    conn.query_row(
        &format!(
            "SELECT {} FROM tracks WHERE id = ?1 AND song_id = ?2",
            TRACK_COLUMNS
        ),
        [track_id, song_id],
        map_track_row,
    )
    .map_err(not_found("Track"))
}

pub fn list_tracks(conn: &Connection, song_id: i64, public: Option<bool>) -> Result<Vec<Track>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tracks WHERE song_id = ?1 AND (?2 IS NULL OR public = ?2) ORDER BY id",
        TRACK_COLUMNS
    ))?;
    let tracks = stmt
        .query_map(params![song_id, public], map_track_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tracks)
}

/// Inserts a track. Tracks with audio are private, tracks without are open slots.
pub fn insert_track(
    conn: &Connection,
    uuid: &str,
    song_id: i64,
    instrument: &str,
    audio: Option<&AudioRef>,
    created_by: i64,
) -> Result<Track> {
    conn.execute(
        r#"
        INSERT INTO tracks (uuid, song_id, instrument, public, audio_url, audio_name,
                            audio_content_type, audio_size, created_by)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            uuid,
            song_id,
            instrument,
            audio.is_none(),
            audio.map(|a| a.url.as_str()),
            audio.map(|a| a.name.as_str()),
            audio.map(|a| a.content_type.as_str()),
            audio.map(|a| a.size),
            created_by
        ],
    )?;
    get_track(conn, conn.last_insert_rowid())
}

/// Fills a track with audio and marks it private.
pub fn set_track_audio(
    conn: &Connection,
    track_id: i64,
    audio: &AudioRef,
    contributed_by: Option<i64>,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE tracks
        SET public = 0, audio_url = ?1, audio_name = ?2, audio_content_type = ?3,
            audio_size = ?4, contributed_by = ?5, updated_at = datetime('now')
        WHERE id = ?6
        "#,
        params![
            audio.url,
            audio.name,
            audio.content_type,
            audio.size,
            contributed_by,
            track_id
        ],
    )?;
    Ok(())
}

/// Turns a track back into an open slot, dropping its audio.
pub fn reopen_track(conn: &Connection, track_id: i64) -> Result<()> {
    conn.execute(
        r#"
        UPDATE tracks
        SET public = 1, audio_url = NULL, audio_name = NULL, audio_content_type = NULL,
            audio_size = NULL, contributed_by = NULL, updated_at = datetime('now')
        WHERE id = ?1
        "#,
        [track_id],
    )?;
    Ok(())
}

pub fn rename_track(conn: &Connection, track_id: i64, instrument: &str) -> Result<()> {
    conn.execute(
        "UPDATE tracks SET instrument = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![instrument, track_id],
    )?;
    Ok(())
}

pub fn delete_track(conn: &Connection, track_id: i64) -> Result<()> {
    conn.execute("DELETE FROM tracks WHERE id = ?1", [track_id])?;
    Ok(())
}

/// Audio URLs referenced by a song's tracks and track requests.
pub fn song_audio_urls(conn: &Connection, song_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT audio_url FROM tracks WHERE song_id = ?1 AND audio_url IS NOT NULL
        UNION
        SELECT r.audio_url FROM track_requests r
        JOIN tracks t ON t.id = r.track_id
        WHERE t.song_id = ?1
        "#,
    )?;
    let urls = stmt
        .query_map([song_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(urls)
}

/// Audio URLs referenced by one track and the requests against it.
pub fn track_audio_urls(conn: &Connection, track_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT audio_url FROM tracks WHERE id = ?1 AND audio_url IS NOT NULL
        UNION
        SELECT audio_url FROM track_requests WHERE track_id = ?1
        "#,
    )?;
    let urls = stmt
        .query_map([track_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(urls)
}

/// Whether any track request still points at `url`.
pub fn request_references_url(conn: &Connection, url: &str) -> Result<bool> {
    let referenced = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM track_requests WHERE audio_url = ?1)",
        [url],
        |row| row.get(0),
    )?;
    Ok(referenced)
}

// =============================================================================
// Track requests
// =============================================================================

pub fn get_track_request(conn: &Connection, request_id: i64) -> Result<TrackRequest> {
    conn.query_row(
        &format!(
            "SELECT {} FROM track_requests r WHERE r.id = ?1",
            TRACK_REQUEST_COLUMNS
        ),
        [request_id],
        map_track_request_row,
    )
    .map_err(not_found("Track request"))
}

pub fn insert_track_request(
    conn: &Connection,
    uuid: &str,
    track_id: i64,
    created_by: i64,
    audio: &AudioRef,
) -> Result<TrackRequest> {
    conn.execute(
        r#"
        INSERT INTO track_requests (uuid, track_id, created_by, audio_url, audio_name,
                                    audio_content_type, audio_size, status)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending')
        "#,
        params![
            uuid,
            track_id,
            created_by,
            audio.url,
            audio.name,
            audio.content_type,
            audio.size
        ],
    )?;
    get_track_request(conn, conn.last_insert_rowid())
}

/// Moves a pending request to `to` in a single conditional statement.
///
/// Returns `false` when the request was no longer pending, leaving it untouched.
pub fn transition_track_request(
    conn: &Connection,
    request_id: i64,
    to: TrackRequestStatus,
) -> Result<bool> {
    let changed = conn.execute(
        r#"
        UPDATE track_requests SET status = ?1, updated_at = datetime('now')
        WHERE id = ?2 AND status = 'pending'
        "#,
        params![to.to_string(), request_id],
    )?;
    Ok(changed == 1)
}

/// Requests against tracks of songs owned by `owner_id`.
pub fn list_incoming_requests(
    conn: &Connection,
    owner_id: i64,
    status: Option<TrackRequestStatus>,
) -> Result<Vec<TrackRequest>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {} FROM track_requests r
        JOIN tracks t ON t.id = r.track_id
        JOIN songs s ON s.id = t.song_id
        WHERE s.created_by = ?1 AND (?2 IS NULL OR r.status = ?2)
        ORDER BY r.id DESC
        "#,
        TRACK_REQUEST_COLUMNS
    ))?;
    let requests = stmt
        .query_map(
            params![owner_id, status.map(|s| s.to_string())],
            map_track_request_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(requests)
}

/// Requests submitted by `user_id` that `viewer_id` may read: all of them for
/// the submitter, otherwise those against songs the viewer owns.
pub fn list_submitted_requests(
    conn: &Connection,
    user_id: i64,
    viewer_id: i64,
    status: Option<TrackRequestStatus>,
) -> Result<Vec<TrackRequest>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {} FROM track_requests r
        JOIN tracks t ON t.id = r.track_id
        JOIN songs s ON s.id = t.song_id
        WHERE r.created_by = ?1 AND (?2 IS NULL OR r.status = ?2)
          AND (r.created_by = ?3 OR s.created_by = ?3)
        ORDER BY r.id DESC
        "#,
        TRACK_REQUEST_COLUMNS
    ))?;
    let requests = stmt
        .query_map(
            params![user_id, status.map(|s| s.to_string()), viewer_id],
            map_track_request_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(requests)
}

// =============================================================================
// Notifications
// =============================================================================

pub fn insert_notification(
    conn: &Connection,
    actor_id: i64,
    recipient_id: i64,
    verb: NotificationVerb,
    action_object_id: Option<i64>,
    target_id: Option<i64>,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO notifications (actor_id, recipient_id, verb, action_object_id, target_id)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            actor_id,
            recipient_id,
            verb.to_string(),
            action_object_id,
            target_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_notifications(
    conn: &Connection,
    recipient_id: i64,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, actor_id, recipient_id, verb, action_object_id, target_id, unread, created_at
        FROM notifications
        WHERE recipient_id = ?1 AND (?2 = 0 OR unread = 1)
        ORDER BY id DESC
        "#,
    )?;
    let notifications = stmt
        .query_map(params![recipient_id, unread_only], map_notification_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(notifications)
}

/// Marks a notification read. Returns `None` when it does not belong to the recipient.
pub fn mark_notification_read(
    conn: &Connection,
    notification_id: i64,
    recipient_id: i64,
) -> Result<Option<Notification>> {
    conn.execute(
        "UPDATE notifications SET unread = 0 WHERE id = ?1 AND recipient_id = ?2",
        [notification_id, recipient_id],
    )?;
    let notification = conn
        .query_row(
            r#"
            SELECT id, actor_id, recipient_id, verb, action_object_id, target_id, unread, created_at
            FROM notifications WHERE id = ?1 AND recipient_id = ?2
            "#,
            [notification_id, recipient_id],
            map_notification_row,
        )
        .optional()?;
    Ok(notification)
}
