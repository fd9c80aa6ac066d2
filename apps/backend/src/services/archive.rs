//! Zip archives of a song's filled tracks.
//!
//! Objects are downloaded one by one into a scoped temporary directory under
//! the configured work root, then zipped in memory. The directory is removed
//! when the guard drops, on success and on every error path.

use rusqlite::Connection;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::services::storage::{sanitize_file_name, StorageClient};

/// A finished archive, ready to be sent as an attachment.
#[derive(Debug)]
pub struct SongArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct ArchiveBuilder {
    db: Arc<Mutex<Connection>>,
    storage: Arc<StorageClient>,
    work_dir: PathBuf,
}

impl ArchiveBuilder {
    pub fn new(db: Arc<Mutex<Connection>>, storage: Arc<StorageClient>, work_dir: PathBuf) -> Self {
        Self {
            db,
            storage,
            work_dir,
        }
    }

    /// Builds the archive for `song_id`. Only the song owner may download it.
    pub async fn build(&self, caller_id: i64, song_id: i64) -> Result<SongArchive> {
        let (song, tracks) = {
            let conn = self.db.lock().await;
            let song = queries::get_song(&conn, song_id)?;
            if song.created_by != caller_id {
                return Err(AppError::NotAuthorized);
            }
            let tracks = queries::list_tracks(&conn, song_id, Some(false))?;
            (song, tracks)
        };

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| {
                AppError::Internal(format!(
                    "Failed to create archive work dir {:?}: {}",
                    self.work_dir, e
                ))
            })?;
        let scratch = tempfile::Builder::new()
            .prefix("songhub-archive-")
            .tempdir_in(&self.work_dir)
            .map_err(|e| AppError::Internal(format!("Failed to create scratch dir: {}", e)))?;

        // Entry order follows the first appearance of each name; a repeated
        // name overwrites the earlier download on disk.
        let mut entries: Vec<String> = Vec::new();
        for track in &tracks {
            let Some(audio) = &track.audio else {
                continue;
            };
            let name = sanitize_file_name(&audio.name);
            self.storage
                .download_url(&audio.url, &scratch.path().join(&name))
                .await?;
            if !entries.contains(&name) {
                entries.push(name);
            }
        }

        let dir = scratch.path().to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || write_zip(&dir, &entries))
            .await
            .map_err(|e| AppError::Internal(format!("Archive task failed: {}", e)))??;

        tracing::info!(
            song_id,
            tracks = tracks.len(),
            size = bytes.len(),
            "Song archive built"
        );

        Ok(SongArchive {
            file_name: format!("{}.zip", sanitize_file_name(&song.title)),
            bytes,
        })
    }
}

fn write_zip(dir: &Path, entries: &[String]) -> Result<Vec<u8>> {
    let zip_error = |e: zip::result::ZipError| AppError::Internal(format!("Zip error: {}", e));
    let io_error = |e: std::io::Error| AppError::Internal(format!("Archive I/O error: {}", e));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for name in entries {
        let data = std::fs::read(dir.join(name)).map_err(io_error)?;
        writer.start_file(name.as_str(), options).map_err(zip_error)?;
        writer.write_all(&data).map_err(io_error)?;
    }

    Ok(writer.finish().map_err(zip_error)?.into_inner())
}
