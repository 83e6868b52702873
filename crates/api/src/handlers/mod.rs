//! HTTP handlers, one module per resource.
//!
//! Mutating handlers follow the same order: validate the body, check the
//! caller's permission, read/write through the repositories, then write the
//! audit entry.

pub mod audit;
pub mod auth;
pub mod contacts;
pub mod files;
pub mod invoices;
pub mod projects;
pub mod proofs;
pub mod tasks;
pub mod tax_info;
pub mod upload;
pub mod users;
