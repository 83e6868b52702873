//! Contact role kinds and their `role_specific_data` schemas.
//!
//! A contact can carry any subset of the four roles. Each role stores a small
//! JSON object whose keys are checked here against a per-role field table;
//! unknown keys and wrongly-typed values are rejected.

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::text_enum;

// ---------------------------------------------------------------------------
// Role kinds
// ---------------------------------------------------------------------------

text_enum! {
    /// Capability attached to a contact record.
    ContactRoleKind, "contact role" {
        Author => "author",
        Customer => "customer",
        Vendor => "vendor",
        Distributor => "distributor",
    }
}

impl ContactRoleKind {
    /// Whether a contact with this role may be billed on an invoice.
    pub fn is_billable(self) -> bool {
        matches!(self, Self::Customer | Self::Distributor)
    }

    /// Whether a contact with this role may be assigned production tasks.
    pub fn is_assignable(self) -> bool {
        matches!(self, Self::Vendor | Self::Author)
    }

    fn schema(self) -> &'static [FieldSpec] {
        match self {
            Self::Author => AUTHOR_FIELDS,
            Self::Customer => CUSTOMER_FIELDS,
            Self::Vendor => VENDOR_FIELDS,
            Self::Distributor => DISTRIBUTOR_FIELDS,
        }
    }
}

// ---------------------------------------------------------------------------
// Field schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text { max_len: usize },
    OneOf(&'static [&'static str]),
    Integer { min: i64, max: i64 },
    Bool,
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
}

const fn text(name: &'static str, max_len: usize) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text { max_len },
    }
}

const fn int(name: &'static str, min: i64, max: i64) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Integer { min, max },
    }
}

/// Upper bound for rates expressed in basis points (100%).
pub const MAX_BASIS_POINTS: i64 = 10_000;

/// Longest payment term accepted, in days.
pub const MAX_PAYMENT_TERMS_DAYS: i64 = 365;

pub const CUSTOMER_TYPES: &[&str] = &["retail", "library", "school", "wholesale", "individual"];

pub const VENDOR_TYPES: &[&str] = &[
    "editor",
    "designer",
    "proofreader",
    "printer",
    "typesetter",
    "illustrator",
    "translator",
    "other",
];

const AUTHOR_FIELDS: &[FieldSpec] = &[
    text("pen_name", 200),
    text("bio", 5_000),
    text("website", 500),
    text("agent_name", 200),
    int("royalty_rate_bps", 0, MAX_BASIS_POINTS),
];

const CUSTOMER_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "customer_type",
        kind: FieldKind::OneOf(CUSTOMER_TYPES),
    },
    int("payment_terms_days", 0, MAX_PAYMENT_TERMS_DAYS),
    int("credit_limit_cents", 0, i64::MAX),
    FieldSpec {
        name: "tax_exempt",
        kind: FieldKind::Bool,
    },
];

const VENDOR_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "vendor_type",
        kind: FieldKind::OneOf(VENDOR_TYPES),
    },
    int("hourly_rate_cents", 0, i64::MAX),
    int("payment_terms_days", 0, MAX_PAYMENT_TERMS_DAYS),
];

const DISTRIBUTOR_FIELDS: &[FieldSpec] = &[
    text("territory", 200),
    int("discount_rate_bps", 0, MAX_BASIS_POINTS),
    int("payment_terms_days", 0, MAX_PAYMENT_TERMS_DAYS),
];

/// Key fragments that indicate a tax identifier. These belong in the
/// encrypted tax-info record, never in plain JSON.
const TAX_KEY_FRAGMENTS: &[&str] = &["tax_id", "ssn", "ein", "itin", "tin"];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate `data` against the schema for `kind`.
///
/// `null` is accepted and normalized to an empty object. Returns the value to
/// persist.
pub fn validate_role_data(kind: ContactRoleKind, data: Option<&Value>) -> Result<Value, CoreError> {
    let obj = match data {
        None | Some(Value::Null) => return Ok(Value::Object(Map::new())),
        Some(Value::Object(obj)) => obj,
        Some(_) => {
            return Err(CoreError::Validation(format!(
                "role_specific_data for '{kind}' must be a JSON object"
            )))
        }
    };

    let schema = kind.schema();
    let mut cleaned = Map::new();

    for (key, value) in obj {
        if is_tax_key(key) {
            return Err(CoreError::Validation(format!(
                "'{key}' looks like a tax identifier; store it through the contact tax-info endpoint"
            )));
        }

        let spec = schema.iter().find(|f| f.name == key.as_str()).ok_or_else(|| {
            CoreError::Validation(format!("Unknown field '{key}' for role '{kind}'"))
        })?;

        if value.is_null() {
            continue;
        }
        check_field(kind, spec, value)?;
        cleaned.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(cleaned))
}

fn is_tax_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    TAX_KEY_FRAGMENTS.iter().any(|frag| {
        lower == *frag
            || lower.starts_with(&format!("{frag}_"))
            || lower.ends_with(&format!("_{frag}"))
    })
}

fn check_field(kind: ContactRoleKind, spec: &FieldSpec, value: &Value) -> Result<(), CoreError> {
    let name = spec.name;
    let bad = |expected: &str| {
        CoreError::Validation(format!("Field '{name}' for role '{kind}' must be {expected}"))
    };

    match spec.kind {
        FieldKind::Text { max_len } => {
            let s = value.as_str().ok_or_else(|| bad("a string"))?;
            if s.chars().count() > max_len {
                return Err(bad(&format!("at most {max_len} characters")));
            }
        }
        FieldKind::OneOf(options) => {
            let s = value.as_str().ok_or_else(|| bad("a string"))?;
            if !options.contains(&s) {
                return Err(bad(&format!("one of {options:?}")));
            }
        }
        FieldKind::Integer { min, max } => {
            let n = value.as_i64().ok_or_else(|| bad("an integer"))?;
            if n < min || n > max {
                return Err(bad(&format!("between {min} and {max}")));
            }
        }
        FieldKind::Bool => {
            if !value.is_boolean() {
                return Err(bad("true or false"));
            }
        }
    }
    Ok(())
}

/// Merge a partial update into existing role data and re-validate.
///
/// Keys set to `null` in `patch` are removed.
pub fn merge_role_data(
    kind: ContactRoleKind,
    existing: &Value,
    patch: &Value,
) -> Result<Value, CoreError> {
    let patch_obj = patch.as_object().ok_or_else(|| {
        CoreError::Validation(format!("role_specific_data for '{kind}' must be a JSON object"))
    })?;

    let mut merged = existing.as_object().cloned().unwrap_or_default();
    for (key, value) in patch_obj {
        if value.is_null() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    validate_role_data(kind, Some(&Value::Object(merged)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_round_trips_names() {
        for &kind in ContactRoleKind::ALL {
            assert_eq!(kind.as_str().parse::<ContactRoleKind>().unwrap(), kind);
        }
        assert!("agent".parse::<ContactRoleKind>().is_err());
    }

    #[test]
    fn null_data_becomes_empty_object() {
        let v = validate_role_data(ContactRoleKind::Author, None).unwrap();
        assert_eq!(v, json!({}));
        let v = validate_role_data(ContactRoleKind::Author, Some(&Value::Null)).unwrap();
        assert_eq!(v, json!({}));
    }

    #[test]
    fn author_fields_accepted() {
        let data = json!({"pen_name": "Q. Quill", "royalty_rate_bps": 1250});
        let v = validate_role_data(ContactRoleKind::Author, Some(&data)).unwrap();
        assert_eq!(v["royalty_rate_bps"], 1250);
    }

    #[test]
    fn royalty_rate_out_of_range() {
        let data = json!({"royalty_rate_bps": 12_000});
        assert_matches!(
            validate_role_data(ContactRoleKind::Author, Some(&data)),
            Err(CoreError::Validation(msg)) if msg.contains("between 0 and 10000")
        );
    }

    #[test]
    fn unknown_field_rejected() {
        let data = json!({"favourite_colour": "blue"});
        assert!(validate_role_data(ContactRoleKind::Vendor, Some(&data)).is_err());
    }

    #[test]
    fn field_from_other_role_rejected() {
        let data = json!({"pen_name": "nope"});
        assert!(validate_role_data(ContactRoleKind::Customer, Some(&data)).is_err());
    }

    #[test]
    fn enumerated_values_checked() {
        let ok = json!({"vendor_type": "printer"});
        assert!(validate_role_data(ContactRoleKind::Vendor, Some(&ok)).is_ok());
        let bad = json!({"vendor_type": "astronaut"});
        assert!(validate_role_data(ContactRoleKind::Vendor, Some(&bad)).is_err());
    }

    #[test]
    fn tax_ids_are_refused_in_plain_json() {
        for key in ["tax_id", "ssn", "vendor_ein", "tax_id_number"] {
            let data = json!({ key: "123456789" });
            assert_matches!(
                validate_role_data(ContactRoleKind::Vendor, Some(&data)),
                Err(CoreError::Validation(msg)) if msg.contains("tax-info")
            );
        }
    }

    #[test]
    fn non_object_rejected() {
        let data = json!(["a"]);
        assert!(validate_role_data(ContactRoleKind::Distributor, Some(&data)).is_err());
    }

    #[test]
    fn wrong_types_rejected() {
        let kind = ContactRoleKind::Customer;
        assert!(validate_role_data(kind, Some(&json!({"tax_exempt": "yes"}))).is_err());
        assert!(validate_role_data(kind, Some(&json!({"payment_terms_days": 1.5}))).is_err());
    }

    #[test]
    fn merge_removes_nulls_and_revalidates() {
        let existing = json!({"territory": "EU", "discount_rate_bps": 4000});
        let patch = json!({"territory": null, "payment_terms_days": 60});
        let merged = merge_role_data(ContactRoleKind::Distributor, &existing, &patch).unwrap();
        assert_eq!(merged, json!({"discount_rate_bps": 4000, "payment_terms_days": 60}));

        let bad = json!({"discount_rate_bps": -1});
        assert!(merge_role_data(ContactRoleKind::Distributor, &existing, &bad).is_err());
    }

    #[test]
    fn billable_and_assignable() {
        assert!(ContactRoleKind::Customer.is_billable());
        assert!(ContactRoleKind::Distributor.is_billable());
        assert!(!ContactRoleKind::Vendor.is_billable());
        assert!(ContactRoleKind::Vendor.is_assignable());
        assert!(!ContactRoleKind::Customer.is_assignable());
    }
}
