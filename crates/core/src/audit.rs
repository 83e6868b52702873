//! Audit logging constants and utility functions.
//!
//! Every mutating action writes one audit row. This module owns the action
//! vocabulary, the entity-type names and the redaction applied to the
//! free-form details before they are stored.

// ---------------------------------------------------------------------------
// Action type constants
// ---------------------------------------------------------------------------

/// Known action types for audit log entries.
pub mod action_types {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const STATUS_CHANGE: &str = "status_change";
    pub const STAGE_MOVE: &str = "stage_move";
    pub const ASSIGN: &str = "assign";
    pub const UPLOAD: &str = "upload";
    pub const APPROVE: &str = "approve";
    pub const REQUEST_CORRECTIONS: &str = "request_corrections";
    pub const PAYMENT: &str = "payment";
    pub const REVEAL: &str = "reveal";
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
}

/// Entity type names recorded in `audit_logs.entity_type`.
pub mod entity_types {
    pub const TENANT: &str = "tenant";
    pub const USER: &str = "user";
    pub const CONTACT: &str = "contact";
    pub const CONTACT_ROLE: &str = "contact_role";
    pub const CONTACT_TAX_INFO: &str = "contact_tax_info";
    pub const PRODUCTION_PROJECT: &str = "production_project";
    pub const PRODUCTION_TASK: &str = "production_task";
    pub const PROOF_FILE: &str = "proof_file";
    pub const INVOICE: &str = "invoice";
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Key fragments whose values are never written to the audit log.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "authorization",
    "tax_id",
    "ssn",
    "ein",
    "ciphertext",
];

const REDACTED: &str = "[REDACTED]";

/// Redact sensitive fields from a JSON value, recursing into nested objects
/// and arrays.
///
/// Replaces the value of any key containing one of [`SENSITIVE_FIELDS`]
/// (case-insensitive) with `"[REDACTED]"`.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(
                        key.clone(),
                        serde_json::Value::String(REDACTED.to_string()),
                    );
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

/// Details payload for a status-like change.
pub fn transition_details(from: &str, to: &str) -> serde_json::Value {
    serde_json::json!({ "from": from, "to": to })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn redacts_top_level_keys() {
        let input = json!({"email": "a@b.c", "password": "hunter2"});
        let out = redact_sensitive_fields(&input);
        assert_eq!(out["email"], "a@b.c");
        assert_eq!(out["password"], REDACTED);
    }

    #[test]
    fn redacts_nested_and_case_insensitive() {
        let input = json!({
            "contact": {"Tax_ID": "123456789", "name": "Ada"},
            "items": [{"refresh_token": "x"}]
        });
        let out = redact_sensitive_fields(&input);
        assert_eq!(out["contact"]["Tax_ID"], REDACTED);
        assert_eq!(out["contact"]["name"], "Ada");
        assert_eq!(out["items"][0]["refresh_token"], REDACTED);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(redact_sensitive_fields(&json!(5)), json!(5));
        assert_eq!(redact_sensitive_fields(&json!(null)), json!(null));
    }

    #[test]
    fn transition_payload() {
        assert_eq!(
            transition_details("draft", "sent"),
            json!({"from": "draft", "to": "sent"})
        );
    }
}
