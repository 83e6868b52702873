//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts (with `validator` rules)
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod audit;
pub mod contact;
pub mod contact_role;
pub mod invoice;
pub mod production_project;
pub mod production_task;
pub mod proof_file;
pub mod session;
pub mod tax_info;
pub mod tenant;
pub mod user;
