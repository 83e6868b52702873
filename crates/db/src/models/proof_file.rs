//! Versioned proof file model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use imprint_core::production::ProofStatus;
use imprint_core::types::{DbId, Timestamp};

/// A row from `proof_files`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProofFile {
    pub id: DbId,
    pub tenant_id: DbId,
    pub project_id: DbId,
    pub version: i32,
    pub file_name: String,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[sqlx(try_from = "String")]
    pub status: ProofStatus,
    pub notes: Option<String>,
    pub review_notes: Option<String>,
    pub uploaded_by: Option<DbId>,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Insert data for a new proof version. The version number is assigned by
/// the repository.
#[derive(Debug, Clone)]
pub struct NewProofFile {
    pub file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub notes: Option<String>,
    pub uploaded_by: Option<DbId>,
}

/// Request body for approve / request-corrections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewProof {
    pub notes: Option<String>,
}
