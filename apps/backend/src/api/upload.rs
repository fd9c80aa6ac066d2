//! Multipart form parsing for audio uploads.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::services::AudioUpload;

/// Name of the multipart field carrying the audio file.
pub const AUDIO_FIELD: &str = "audio";

/// Text fields and the optional audio file of a multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub audio: Option<AudioUpload>,
}

impl UploadForm {
    /// Trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_audio(self) -> Result<AudioUpload> {
        self.audio.ok_or_else(|| {
            AppError::BadRequest(format!("Missing '{}' file field", AUDIO_FIELD))
        })
    }
}

/// Reads every field of a multipart body.
pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == AUDIO_FIELD {
            let file_name = field
                .file_name()
                .map(str::to_string)
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| AppError::BadRequest("Audio file name is missing".to_string()))?;
            let content_type = field
                .content_type()
                .map(str::to_string)
                .filter(|ct| ct != "application/octet-stream")
                .unwrap_or_else(|| guess_content_type(&file_name));
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read audio: {}", e)))?;

            if data.is_empty() {
                return Err(AppError::BadRequest("Audio file is empty".to_string()));
            }

            form.audio = Some(AudioUpload {
                file_name,
                content_type,
                data,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid field '{}': {}", name, e)))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
