//! Request-body validation helpers built on the `validator` crate.
//!
//! DTOs derive [`validator::Validate`]; handlers call [`validate_input`]
//! before any permission-gated write so schema errors surface as
//! [`CoreError::Validation`] with every failing field listed.

use std::sync::LazyLock;

use regex::Regex;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::CoreError;

/// ISO 4217 style currency code: three upper-case ASCII letters.
pub static CURRENCY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid regex"));

/// Tenant slugs: lower-case words joined by single dashes.
pub static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"));

/// ISBN-10 or ISBN-13 once spaces and dashes are removed.
static ISBN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{9}[\dX]|97[89]\d{10})$").expect("valid regex"));

/// Run `validator` on a DTO and flatten the errors into one message.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(flatten_errors(&errors)))
}

/// Render validation errors as `field: message; field: message`, sorted by
/// field name so the output is stable.
pub fn flatten_errors(errors: &ValidationErrors) -> String {
    let mut parts = Vec::new();
    collect_errors("", errors, &mut parts);
    parts.sort();
    parts.join("; ")
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", err.code));
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    collect_errors(&format!("{path}[{idx}]"), nested, out);
                }
            }
        }
    }
}

/// Normalize and check an ISBN. Returns the digits-only form.
pub fn normalize_isbn(raw: &str) -> Result<String, CoreError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if ISBN.is_match(&compact) {
        Ok(compact)
    } else {
        Err(CoreError::Validation(format!(
            "'{raw}' is not a valid ISBN-10 or ISBN-13"
        )))
    }
}

/// Reject `end` dates that fall before `start`.
pub fn validate_date_order(
    start_label: &str,
    start: Option<chrono::NaiveDate>,
    end_label: &str,
    end: Option<chrono::NaiveDate>,
) -> Result<(), CoreError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(CoreError::Validation(format!(
            "{end_label} ({e}) must not be before {start_label} ({s})"
        ))),
        _ => Ok(()),
    }
}
