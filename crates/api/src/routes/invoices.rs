//! Route definitions for the `/invoices` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::invoices;
use crate::state::AppState;

/// Routes mounted at `/invoices`.
///
/// ```text
/// GET    /                 -> list_invoices
/// POST   /                 -> create_invoice
/// POST   /mark-overdue     -> mark_overdue
/// GET    /{id}             -> get_invoice
/// PUT    /{id}             -> update_invoice (draft only)
/// DELETE /{id}             -> delete_invoice (draft only)
/// POST   /{id}/status      -> transition_status
/// POST   /{id}/payments    -> record_payment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/mark-overdue", post(invoices::mark_overdue))
        .route(
            "/{id}",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route("/{id}/status", post(invoices::transition_status))
        .route("/{id}/payments", post(invoices::record_payment))
}
