//! Route definitions for the `/contacts` resource, its roles and tax info.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{contacts, tax_info};
use crate::state::AppState;

/// Routes mounted at `/contacts`.
///
/// ```text
/// GET    /                        -> list_contacts
/// POST   /                        -> create_contact
/// GET    /{id}                    -> get_contact
/// PUT    /{id}                    -> update_contact
/// DELETE /{id}                    -> delete_contact (soft)
///
/// POST   /{id}/roles              -> add_role
/// PUT    /{id}/roles/{role}       -> update_role
/// DELETE /{id}/roles/{role}       -> remove_role
///
/// GET    /{id}/tax-info           -> get_tax_info (masked)
/// PUT    /{id}/tax-info           -> set_tax_info
/// DELETE /{id}/tax-info           -> delete_tax_info
/// POST   /{id}/tax-info/reveal    -> reveal_tax_info
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route(
            "/{id}",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .route("/{id}/roles", post(contacts::add_role))
        .route(
            "/{id}/roles/{role}",
            put(contacts::update_role).delete(contacts::remove_role),
        )
        .route(
            "/{id}/tax-info",
            get(tax_info::get_tax_info)
                .put(tax_info::set_tax_info)
                .delete(tax_info::delete_tax_info),
        )
        .route("/{id}/tax-info/reveal", post(tax_info::reveal_tax_info))
}
