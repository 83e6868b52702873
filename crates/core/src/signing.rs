//! HMAC-signed, expiring download links for stored files.
//!
//! A link carries the storage key, an expiry (Unix seconds) and a URL-safe
//! base64 HMAC-SHA256 over `key|expires`. Anyone holding the link can fetch
//! the file until it expires, without a bearer token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CoreError;

type HmacSha256 = Hmac<Sha256>;

/// Default link lifetime in seconds.
pub const DEFAULT_TTL_SECS: i64 = 15 * 60;

fn mac(secret: &[u8], key: &str, expires: i64) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(key.as_bytes());
    mac.update(b"|");
    mac.update(expires.to_string().as_bytes());
    mac
}

/// Signature for `key` valid until `expires`.
pub fn sign(secret: &[u8], key: &str, expires: i64) -> String {
    URL_SAFE_NO_PAD.encode(mac(secret, key, expires).finalize().into_bytes())
}

/// Verify a signature in constant time and reject expired links.
pub fn verify(
    secret: &[u8],
    key: &str,
    expires: i64,
    signature: &str,
    now: i64,
) -> Result<(), CoreError> {
    let provided = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| CoreError::Forbidden("Malformed download signature".into()))?;
    mac(secret, key, expires)
        .verify_slice(&provided)
        .map_err(|_| CoreError::Forbidden("Invalid download signature".into()))?;
    if now > expires {
        return Err(CoreError::Forbidden("Download link has expired".into()));
    }
    Ok(())
}

/// A signed link ready to hand to a client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: i64,
}

/// Build `{base_url}/api/v1/files/{key}?expires=..&signature=..`.
pub fn signed_url(base_url: &str, secret: &[u8], key: &str, now: i64, ttl_secs: i64) -> SignedUrl {
    let expires = now + ttl_secs;
    let signature = sign(secret, key, expires);
    SignedUrl {
        url: format!(
            "{}/api/v1/files/{key}?expires={expires}&signature={signature}",
            base_url.trim_end_matches('/')
        ),
        expires_at: expires,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SECRET: &[u8] = b"file-signing-secret";
    const KEY: &str = "tenants/1/projects/2/proofs/v1-proof.pdf";

    #[test]
    fn valid_signature_verifies() {
        let sig = sign(SECRET, KEY, 1_000);
        assert!(verify(SECRET, KEY, 1_000, &sig, 999).is_ok());
        assert!(verify(SECRET, KEY, 1_000, &sig, 1_000).is_ok());
    }

    #[test]
    fn expired_link_rejected() {
        let sig = sign(SECRET, KEY, 1_000);
        assert_matches!(
            verify(SECRET, KEY, 1_000, &sig, 1_001),
            Err(CoreError::Forbidden(msg)) if msg.contains("expired")
        );
    }

    #[test]
    fn tampering_rejected() {
        let sig = sign(SECRET, KEY, 1_000);
        assert!(verify(SECRET, KEY, 2_000, &sig, 0).is_err());
        assert!(verify(SECRET, "tenants/1/other", 1_000, &sig, 0).is_err());
        assert!(verify(b"other-secret", KEY, 1_000, &sig, 0).is_err());
        assert!(verify(SECRET, KEY, 1_000, "%%%", 0).is_err());
    }

    #[test]
    fn url_shape() {
        let url = signed_url("https://erp.example.com/", SECRET, KEY, 100, 60);
        assert_eq!(url.expires_at, 160);
        assert!(url
            .url
            .starts_with("https://erp.example.com/api/v1/files/tenants/1/projects/2/proofs/v1-proof.pdf?expires=160&signature="));
    }
}
