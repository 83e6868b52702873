//! Signed file downloads.
//!
//! `GET /api/v1/files/{*key}` takes no bearer token. The `expires` and
//! `signature` query parameters produced by the `.../url` endpoints are the
//! only credential.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use imprint_core::files::{content_type_for, extension};
use imprint_core::signing::verify;
use tokio_util::io::ReaderStream;

use crate::error::AppResult;
use crate::query::SignedLinkParams;
use crate::state::AppState;

/// GET /api/v1/files/{*key}
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<SignedLinkParams>,
) -> AppResult<Response> {
    verify(
        state.config.file_signing_secret.as_bytes(),
        &key,
        params.expires,
        &params.signature,
        chrono::Utc::now().timestamp(),
    )?;

    let stored = state.file_store.open(&key).await?;
    let content_type = extension(&key)
        .map(|ext| content_type_for(&ext))
        .unwrap_or("application/octet-stream");
    let file_name = key.rsplit('/').next().unwrap_or("download");

    tracing::debug!(key, size = stored.size, "Serving signed download");

    let body = Body::from_stream(ReaderStream::new(stored.reader));
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, stored.size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}
