//! Tax identifier normalization and at-rest encryption.
//!
//! Tax ids (SSN, EIN, ...) are encrypted with AES-256-GCM before they reach
//! the database. Each ciphertext is bound to its contact through the AEAD
//! associated data, so a row copied onto another contact fails to decrypt.
//! Reads show only [`mask`]ed output; plaintext leaves the server only through
//! the audited reveal endpoint.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::CoreError;
use crate::types::{text_enum, DbId};

text_enum! {
    /// Kind of tax identifier held for a contact.
    TaxIdType, "tax id type" {
        Ssn => "ssn",
        Ein => "ein",
        Itin => "itin",
        Vat => "vat",
        Other => "other",
    }
}

/// Length in bytes of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Length in bytes of an AES-GCM nonce.
pub const NONCE_LEN: usize = 12;

/// Bullets shown in place of the hidden digits.
const MASK_PREFIX: &str = "•••••";

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Strip whitespace and dashes, then check the shape expected for `kind`.
///
/// - `ssn`, `ein`, `itin`: exactly 9 digits
/// - `vat`: 4 to 20 ASCII letters or digits (upper-cased)
/// - `other`: 1 to 32 printable characters
pub fn normalize_tax_id(kind: TaxIdType, raw: &str) -> Result<String, CoreError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let ok = match kind {
        TaxIdType::Ssn | TaxIdType::Ein | TaxIdType::Itin => {
            compact.len() == 9 && compact.chars().all(|c| c.is_ascii_digit())
        }
        TaxIdType::Vat => {
            (4..=20).contains(&compact.len()) && compact.chars().all(|c| c.is_ascii_alphanumeric())
        }
        TaxIdType::Other => {
            (1..=32).contains(&compact.chars().count()) && !compact.chars().any(char::is_control)
        }
    };

    if !ok {
        return Err(CoreError::Validation(format!(
            "Value is not a valid {kind} identifier"
        )));
    }

    Ok(match kind {
        TaxIdType::Vat => compact.to_ascii_uppercase(),
        _ => compact,
    })
}

/// Last four characters of a normalized id (fewer if the id is shorter).
pub fn last_four(normalized: &str) -> String {
    let chars: Vec<char> = normalized.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

/// Render the masked form shown in contact reads.
pub fn mask(last_four: &str) -> String {
    format!("{MASK_PREFIX}{last_four}")
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TaxCryptoError {
    #[error("Tax encryption key must be the base64 encoding of 32 bytes")]
    InvalidKey,

    #[error("Stored nonce has the wrong length")]
    InvalidNonce,

    #[error("Encryption failed")]
    Encrypt,

    /// Wrong key, tampered ciphertext or mismatched contact.
    #[error("Decryption failed")]
    Decrypt,
}

impl From<TaxCryptoError> for CoreError {
    fn from(err: TaxCryptoError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

/// Ciphertext and the nonce it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedTaxId {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// AES-256-GCM cipher for tax identifiers.
#[derive(Clone)]
pub struct TaxCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for TaxCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaxCipher").finish_non_exhaustive()
    }
}

impl TaxCipher {
    /// Build a cipher from a base64-encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> Result<Self, TaxCryptoError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| TaxCryptoError::InvalidKey)?;
        Self::from_key_bytes(&bytes)
    }

    pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, TaxCryptoError> {
        if bytes.len() != KEY_LEN {
            return Err(TaxCryptoError::InvalidKey);
        }
        let cipher = Aes256Gcm::new_from_slice(bytes).map_err(|_| TaxCryptoError::InvalidKey)?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext` for `contact_id` under a fresh random nonce.
    pub fn seal(&self, contact_id: DbId, plaintext: &str) -> Result<SealedTaxId, TaxCryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let aad = associated_data(contact_id);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| TaxCryptoError::Encrypt)?;
        Ok(SealedTaxId {
            ciphertext,
            nonce: nonce.to_vec(),
        })
    }

    /// Decrypt a value previously produced by [`seal`](Self::seal).
    pub fn open(
        &self,
        contact_id: DbId,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<String, TaxCryptoError> {
        if nonce.len() != NONCE_LEN {
            return Err(TaxCryptoError::InvalidNonce);
        }
        let aad = associated_data(contact_id);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| TaxCryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| TaxCryptoError::Decrypt)
    }
}

fn associated_data(contact_id: DbId) -> String {
    format!("imprint:contact-tax-id:{contact_id}")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn cipher() -> TaxCipher {
        TaxCipher::from_key_bytes(&[7u8; KEY_LEN]).unwrap()
    }

    #[test]
    fn ssn_normalization() {
        assert_eq!(normalize_tax_id(TaxIdType::Ssn, "123-45-6789").unwrap(), "123456789");
        assert!(normalize_tax_id(TaxIdType::Ssn, "123-45-678").is_err());
        assert!(normalize_tax_id(TaxIdType::Ein, "12-345678A").is_err());
    }

    #[test]
    fn only_whitespace_and_dashes_are_separators() {
        assert_eq!(normalize_tax_id(TaxIdType::Ein, " 12 3456789 ").unwrap(), "123456789");
        assert!(normalize_tax_id(TaxIdType::Ein, "12.3456789").is_err());
        assert_eq!(normalize_tax_id(TaxIdType::Other, "AB.99").unwrap(), "AB.99");
    }

    #[test]
    fn vat_is_uppercased() {
        assert_eq!(normalize_tax_id(TaxIdType::Vat, "de 123 456 789").unwrap(), "DE123456789");
        assert!(normalize_tax_id(TaxIdType::Vat, "DE1").is_err());
    }

    #[test]
    fn other_accepts_free_form() {
        assert_eq!(normalize_tax_id(TaxIdType::Other, "AB/99").unwrap(), "AB/99");
        assert!(normalize_tax_id(TaxIdType::Other, "   ").is_err());
    }

    #[test]
    fn masking() {
        assert_eq!(last_four("123456789"), "6789");
        assert_eq!(last_four("AB"), "AB");
        assert_eq!(mask("6789"), "•••••6789");
    }

    #[test]
    fn seal_then_open() {
        let c = cipher();
        let sealed = c.seal(42, "123456789").unwrap();
        assert_eq!(sealed.nonce.len(), NONCE_LEN);
        assert_ne!(sealed.ciphertext, b"123456789".to_vec());
        assert_eq!(c.open(42, &sealed.ciphertext, &sealed.nonce).unwrap(), "123456789");
    }

    #[test]
    fn nonces_are_fresh() {
        let c = cipher();
        let a = c.seal(1, "123456789").unwrap();
        let b = c.seal(1, "123456789").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn ciphertext_is_bound_to_contact() {
        let c = cipher();
        let sealed = c.seal(1, "123456789").unwrap();
        assert_matches!(
            c.open(2, &sealed.ciphertext, &sealed.nonce),
            Err(TaxCryptoError::Decrypt)
        );
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = cipher().seal(1, "123456789").unwrap();
        let other = TaxCipher::from_key_bytes(&[9u8; KEY_LEN]).unwrap();
        assert!(other.open(1, &sealed.ciphertext, &sealed.nonce).is_err());
    }

    #[test]
    fn key_parsing() {
        let encoded = STANDARD.encode([1u8; KEY_LEN]);
        assert!(TaxCipher::from_base64(&encoded).is_ok());
        assert_matches!(
            TaxCipher::from_base64(&STANDARD.encode([1u8; 16])),
            Err(TaxCryptoError::InvalidKey)
        );
        assert_matches!(TaxCipher::from_base64("not base64!"), Err(TaxCryptoError::InvalidKey));
    }

    #[test]
    fn bad_nonce_length() {
        assert_matches!(
            cipher().open(1, b"xx", b"short"),
            Err(TaxCryptoError::InvalidNonce)
        );
    }
}
