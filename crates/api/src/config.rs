use std::path::PathBuf;
use std::str::FromStr;

use imprint_core::signing::DEFAULT_TTL_SECS;
use imprint_core::tax::TaxCipher;

use crate::auth::jwt::JwtConfig;

/// Startup configuration problems. The server refuses to start on any of them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Server configuration loaded from environment variables.
///
/// Everything except the three secrets has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Directory the local file store writes under.
    pub storage_root: PathBuf,
    /// HMAC key for signed download links.
    pub file_signing_secret: String,
    /// Lifetime of signed download links in seconds.
    pub signed_url_ttl_secs: i64,
    /// Base64 of the 32-byte AES key protecting tax identifiers.
    pub tax_encryption_key: String,
    /// Externally reachable origin used when building download links.
    pub public_base_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                | Required | Default                  |
    /// |------------------------|----------|--------------------------|
    /// | `HOST`                 | no       | `0.0.0.0`                |
    /// | `PORT`                 | no       | `3000`                   |
    /// | `CORS_ORIGINS`         | no       | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS` | no       | `30`                     |
    /// | `JWT_*`                | see [`JwtConfig::from_env`]         |
    /// | `STORAGE_ROOT`         | no       | `./storage`              |
    /// | `FILE_SIGNING_SECRET`  | **yes**  | --                       |
    /// | `SIGNED_URL_TTL_SECS`  | no       | `900`                    |
    /// | `TAX_ENCRYPTION_KEY`   | **yes**  | --                       |
    /// | `PUBLIC_BASE_URL`      | no       | `http://localhost:3000`  |
    ///
    /// `DATABASE_URL` and the `SMTP_*` variables are read by the binary and
    /// the mail crate respectively.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_env("PORT", 3000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_env("REQUEST_TIMEOUT_SECS", 30)?;
        let jwt = JwtConfig::from_env()?;

        let storage_root =
            PathBuf::from(std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".into()));

        let file_signing_secret = required_env("FILE_SIGNING_SECRET")?;
        let signed_url_ttl_secs: i64 = parse_env("SIGNED_URL_TTL_SECS", DEFAULT_TTL_SECS)?;
        if signed_url_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "SIGNED_URL_TTL_SECS",
                reason: "must be positive".into(),
            });
        }

        let tax_encryption_key = required_env("TAX_ENCRYPTION_KEY")?;
        TaxCipher::from_base64(&tax_encryption_key).map_err(|e| ConfigError::Invalid {
            var: "TAX_ENCRYPTION_KEY",
            reason: e.to_string(),
        })?;

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            storage_root,
            file_signing_secret,
            signed_url_ttl_secs,
            tax_encryption_key,
            public_base_url,
        })
    }
}

/// Read a mandatory, non-empty variable.
pub(crate) fn required_env(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(var)),
    }
}

/// Parse an optional variable, falling back to `default` when unset.
pub(crate) fn parse_env<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("'{raw}': {e}"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn unset_variable_uses_default() {
        let value: u64 = parse_env("IMPRINT_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn missing_required_variable() {
        assert_matches!(
            required_env("IMPRINT_TEST_UNSET_SECRET"),
            Err(ConfigError::Missing("IMPRINT_TEST_UNSET_SECRET"))
        );
    }
}
