//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller identified by a JWT Bearer token.
//! - [`rbac::RequireAuditReader`] -- requires `audit.read`.

pub mod auth;
pub mod rbac;
