//! Domain rules for the Imprint publishing ERP.
//!
//! This crate performs no I/O. Everything here is a pure function or a
//! static lookup table shared by the repository layer and the HTTP API.

pub mod audit;
pub mod contact_roles;
pub mod error;
pub mod files;
pub mod invoice;
pub mod permissions;
pub mod production;
pub mod roles;
pub mod signing;
pub mod tax;
pub mod types;
pub mod validation;
