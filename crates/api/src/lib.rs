//! Imprint API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes, file
//! storage) so integration tests and the binary entrypoint share them.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod storage;
