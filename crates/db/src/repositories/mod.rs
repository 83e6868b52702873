//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Every tenant-owned table is
//! filtered by `tenant_id` in every query.

pub mod audit_repo;
pub mod contact_repo;
pub mod contact_role_repo;
pub mod invoice_repo;
pub mod production_project_repo;
pub mod production_task_repo;
pub mod proof_file_repo;
pub mod session_repo;
pub mod tax_info_repo;
pub mod tenant_repo;
pub mod user_repo;

pub use audit_repo::AuditLogRepo;
pub use contact_repo::ContactRepo;
pub use contact_role_repo::ContactRoleRepo;
pub use invoice_repo::InvoiceRepo;
pub use production_project_repo::ProductionProjectRepo;
pub use production_task_repo::ProductionTaskRepo;
pub use proof_file_repo::ProofFileRepo;
pub use session_repo::SessionRepo;
pub use tax_info_repo::TaxInfoRepo;
pub use tenant_repo::TenantRepo;
pub use user_repo::UserRepo;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page size a caller may request.
pub const MAX_LIMIT: i64 = 500;

/// Clamp caller-supplied pagination to `(limit, offset)`.
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        offset.unwrap_or(0).max(0),
    )
}

/// Build an `ILIKE` substring pattern, escaping the LIKE wildcards in
/// `term`. Returns `None` for blank input.
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term?.trim();
    if term.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}
