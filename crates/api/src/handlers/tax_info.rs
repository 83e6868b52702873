//! Handlers for a contact's encrypted tax identifier.
//!
//! The identifier is sealed with the server's tax key before it reaches the
//! database. Reads return the masked form; the plaintext only leaves through
//! the reveal endpoint, which is audited on every call.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use imprint_core::audit::{action_types, entity_types};
use imprint_core::error::CoreError;
use imprint_core::permissions::Permission;
use imprint_core::tax::{last_four, normalize_tax_id};
use imprint_core::types::DbId;
use imprint_db::models::tax_info::{RevealedTaxInfo, SetTaxInfo, TaxInfoSummary, UpsertTaxInfo};
use imprint_db::repositories::TaxInfoRepo;
use serde_json::json;

use super::contacts::find_contact;
use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/v1/contacts/{id}/tax-info
///
/// Create or replace the contact's tax identifier.
pub async fn set_tax_info(
    State(state): State<AppState>,
    user: AuthUser,
    Path(contact_id): Path<DbId>,
    Json(input): Json<SetTaxInfo>,
) -> AppResult<Json<DataResponse<TaxInfoSummary>>> {
    let normalized = normalize_tax_id(input.tax_id_type, &input.tax_id)?;
    user.require(Permission::TaxInfoManage)?;
    find_contact(&state, user.tenant_id, contact_id).await?;

    let sealed = state
        .tax_cipher
        .seal(contact_id, &normalized)
        .map_err(CoreError::from)?;
    let upsert = UpsertTaxInfo {
        tax_id_type: input.tax_id_type,
        ciphertext: sealed.ciphertext,
        nonce: sealed.nonce,
        last_four: last_four(&normalized),
    };
    let row = TaxInfoRepo::upsert(&state.pool, user.tenant_id, contact_id, &upsert).await?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPDATE, entity_types::CONTACT_TAX_INFO, contact_id)
            .with_details(json!({ "type": row.tax_id_type })),
    )
    .await;

    Ok(Json(DataResponse::new(TaxInfoSummary::from(&row))))
}

/// GET /api/v1/contacts/{id}/tax-info
pub async fn get_tax_info(
    State(state): State<AppState>,
    user: AuthUser,
    Path(contact_id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaxInfoSummary>>> {
    user.require(Permission::ContactsRead)?;
    find_contact(&state, user.tenant_id, contact_id).await?;

    let row = TaxInfoRepo::find_for_contact(&state.pool, user.tenant_id, contact_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tax info for contact", contact_id))?;
    Ok(Json(DataResponse::new(TaxInfoSummary::from(&row))))
}

/// POST /api/v1/contacts/{id}/tax-info/reveal
pub async fn reveal_tax_info(
    State(state): State<AppState>,
    user: AuthUser,
    Path(contact_id): Path<DbId>,
) -> AppResult<Json<DataResponse<RevealedTaxInfo>>> {
    user.require(Permission::TaxInfoManage)?;
    find_contact(&state, user.tenant_id, contact_id).await?;

    let row = TaxInfoRepo::find_for_contact(&state.pool, user.tenant_id, contact_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tax info for contact", contact_id))?;

    let tax_id = state
        .tax_cipher
        .open(contact_id, &row.ciphertext, &row.nonce)
        .map_err(|e| {
            tracing::error!(contact_id, error = %e, "Stored tax identifier failed to decrypt");
            CoreError::from(e)
        })?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::REVEAL, entity_types::CONTACT_TAX_INFO, contact_id)
            .with_details(json!({ "type": row.tax_id_type })),
    )
    .await;

    Ok(Json(DataResponse::new(RevealedTaxInfo {
        tax_id_type: row.tax_id_type,
        tax_id,
    })))
}

/// DELETE /api/v1/contacts/{id}/tax-info
pub async fn delete_tax_info(
    State(state): State<AppState>,
    user: AuthUser,
    Path(contact_id): Path<DbId>,
) -> AppResult<StatusCode> {
    user.require(Permission::TaxInfoManage)?;
    find_contact(&state, user.tenant_id, contact_id).await?;

    if !TaxInfoRepo::delete(&state.pool, user.tenant_id, contact_id).await? {
        return Err(AppError::not_found("Tax info for contact", contact_id));
    }

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::DELETE, entity_types::CONTACT_TAX_INFO, contact_id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
