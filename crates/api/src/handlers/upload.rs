//! Shared multipart parsing for manuscript and proof uploads.

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{AppError, AppResult};

/// A parsed upload form: a required `file` part and an optional `notes` part.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
    pub notes: Option<String>,
}

/// Drain `multipart`, keeping the `file` and `notes` fields.
///
/// Unknown fields are ignored. A second `file` part replaces the first.
pub async fn read_upload(mut multipart: Multipart) -> AppResult<Upload> {
    let mut file: Option<(String, Bytes)> = None;
    let mut notes: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some((file_name, data));
            }
            "notes" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let text = text.trim();
                notes = (!text.is_empty()).then(|| text.to_string());
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    if file_name.trim().is_empty() {
        return Err(AppError::BadRequest("The 'file' field needs a file name".into()));
    }

    Ok(Upload {
        file_name,
        bytes,
        notes,
    })
}
