//! Encrypted tax identifier model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use imprint_core::tax::{self, TaxIdType};
use imprint_core::types::{DbId, Timestamp};

/// A row from `contact_tax_info`. Holds ciphertext only; never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct ContactTaxInfo {
    pub id: DbId,
    pub tenant_id: DbId,
    pub contact_id: DbId,
    #[sqlx(try_from = "String")]
    pub tax_id_type: TaxIdType,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub last_four: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Masked view returned by contact reads.
#[derive(Debug, Clone, Serialize)]
pub struct TaxInfoSummary {
    pub tax_id_type: TaxIdType,
    pub masked: String,
    pub updated_at: Timestamp,
}

impl From<&ContactTaxInfo> for TaxInfoSummary {
    fn from(row: &ContactTaxInfo) -> Self {
        Self {
            tax_id_type: row.tax_id_type,
            masked: tax::mask(&row.last_four),
            updated_at: row.updated_at,
        }
    }
}

/// Request body for `PUT /contacts/{id}/tax-info`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetTaxInfo {
    pub tax_id_type: TaxIdType,
    pub tax_id: String,
}

/// Encrypted values ready for storage.
#[derive(Debug, Clone)]
pub struct UpsertTaxInfo {
    pub tax_id_type: TaxIdType,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub last_four: String,
}

/// Plaintext response of the reveal endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RevealedTaxInfo {
    pub tax_id_type: TaxIdType,
    pub tax_id: String,
}
