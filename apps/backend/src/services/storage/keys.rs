//! Object key layout for song audio.
//!
//! Keys follow `{owner}/songs/{song_uuid}/{kind}/{identifier}{.ext}`, where the
//! identifier is a UUID used for no other object: the track request's own UUID, or
//! a fresh one for each track audio upload.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Characters that are unsafe in filenames across platforms.
    static ref UNSAFE_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap();

    /// Characters allowed in a single key segment.
    static ref UNSAFE_SEGMENT_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]").unwrap();
}

const MAX_FILE_NAME_LEN: usize = 200;
const MAX_EXTENSION_LEN: usize = 10;

/// Kind of audio object, also the key segment it lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Tracks,
    TrackRequests,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Tracks => "tracks",
            ObjectKind::TrackRequests => "track_requests",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The song an object belongs to.
#[derive(Debug, Clone, Copy)]
pub struct SongScope<'a> {
    pub owner: &'a str,
    pub song_uuid: &'a str,
}

/// Builds the object key for one track or track request.
///
/// Two distinct identifiers never map to the same key, whatever the uploaded
/// file names are; the original name only contributes its extension.
pub fn object_key(
    scope: SongScope<'_>,
    kind: ObjectKind,
    identifier: &str,
    file_name: &str,
) -> String {
    let mut key = format!(
        "{}/songs/{}/{}/{}",
        key_segment(scope.owner),
        key_segment(scope.song_uuid),
        kind,
        key_segment(identifier)
    );
    if let Some(ext) = extension(file_name) {
        key.push('.');
        key.push_str(&ext);
    }
    key
}

fn key_segment(value: &str) -> String {
    let segment = UNSAFE_SEGMENT_CHARS.replace_all(value, "_");
    let segment = segment.trim_matches('.');
    if segment.is_empty() {
        "_".to_string()
    } else {
        segment.to_string()
    }
}

/// Lowercased extension of `file_name`, if it looks like one.
fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Sanitizes an uploaded file name so it is safe as a single path component
/// and as a zip entry name.
pub fn sanitize_file_name(name: &str) -> String {
    // Browsers on some platforms send the full client path
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);

    let mut result = UNSAFE_CHARS.replace_all(base, "_").to_string();

    while result.contains("__") {
        result = result.replace("__", "_");
    }

    result = result
        .trim_matches(|c| c == ' ' || c == '_' || c == '.')
        .to_string();

    if result.len() > MAX_FILE_NAME_LEN {
        let mut cut = MAX_FILE_NAME_LEN;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
    }

    if result.is_empty() {
        "audio".to_string()
    } else {
        result
    }
}
