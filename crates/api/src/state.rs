use std::sync::Arc;

use imprint_core::tax::TaxCipher;
use imprint_mail::Mailer;

use crate::config::ServerConfig;
use crate::storage::FileStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc` or is itself a handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: imprint_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Manuscript and proof storage.
    pub file_store: Arc<dyn FileStore>,
    /// Outgoing email (SMTP, or a logging stand-in when SMTP is not configured).
    pub mailer: Arc<dyn Mailer>,
    pub tax_cipher: Arc<TaxCipher>,
}
