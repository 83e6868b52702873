//! Handlers for the `/contacts` resource and the roles attached to a contact.

use std::collections::{HashMap, HashSet};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use imprint_core::audit::{action_types, entity_types};
use imprint_core::contact_roles::{merge_role_data, validate_role_data, ContactRoleKind};
use imprint_core::error::CoreError;
use imprint_core::permissions::Permission;
use imprint_core::types::DbId;
use imprint_core::validation::validate_input;
use imprint_db::models::contact::{
    Contact, ContactDetail, ContactListItem, ContactListParams, CreateContact, UpdateContact,
};
use imprint_db::models::contact_role::{ContactRole, CreateContactRole, UpdateContactRole};
use imprint_db::models::tax_info::TaxInfoSummary;
use imprint_db::repositories::{ContactRepo, ContactRoleRepo, TaxInfoRepo};
use serde_json::json;

use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const NAME_REQUIRED: &str = "A contact needs a first name, last name or company name";

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// POST /api/v1/contacts
///
/// Create a contact and its initial roles in one transaction.
pub async fn create_contact(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateContact>,
) -> AppResult<(StatusCode, Json<DataResponse<ContactDetail>>)> {
    validate_input(&input)?;
    if !Contact::has_name(
        input.first_name.as_deref(),
        input.last_name.as_deref(),
        input.company_name.as_deref(),
    ) {
        return Err(AppError::Core(CoreError::Validation(NAME_REQUIRED.into())));
    }
    let roles = validate_initial_roles(&input.roles)?;
    user.require(Permission::ContactsWrite)?;

    let (contact, roles) =
        ContactRepo::create(&state.pool, user.tenant_id, Some(user.user_id), &input, &roles)
            .await?;

    let role_names: Vec<&str> = roles.iter().map(|r| r.role.as_str()).collect();
    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::CREATE, entity_types::CONTACT, contact.id)
            .with_details(json!({ "roles": role_names })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(ContactDetail {
            contact,
            roles,
            tax_info: None,
        })),
    ))
}

/// GET /api/v1/contacts
///
/// Optional filters: `role`, `search`, `include_inactive`, `limit`, `offset`.
pub async fn list_contacts(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ContactListParams>,
) -> AppResult<Json<DataResponse<Vec<ContactListItem>>>> {
    user.require(Permission::ContactsRead)?;

    let contacts = ContactRepo::list(&state.pool, user.tenant_id, &params).await?;
    let ids: Vec<DbId> = contacts.iter().map(|c| c.id).collect();

    let mut roles_by_contact: HashMap<DbId, Vec<String>> = HashMap::new();
    for (contact_id, role) in
        ContactRoleRepo::active_role_names(&state.pool, user.tenant_id, &ids).await?
    {
        roles_by_contact.entry(contact_id).or_default().push(role);
    }

    let items = contacts
        .into_iter()
        .map(|contact| {
            let roles = roles_by_contact.remove(&contact.id).unwrap_or_default();
            ContactListItem { contact, roles }
        })
        .collect();
    Ok(Json(DataResponse::new(items)))
}

/// GET /api/v1/contacts/{id}
pub async fn get_contact(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ContactDetail>>> {
    user.require(Permission::ContactsRead)?;

    let contact = find_contact(&state, user.tenant_id, id).await?;
    let roles = ContactRoleRepo::list_for_contact(&state.pool, user.tenant_id, id).await?;
    let tax_info = TaxInfoRepo::find_for_contact(&state.pool, user.tenant_id, id)
        .await?
        .as_ref()
        .map(TaxInfoSummary::from);

    Ok(Json(DataResponse::new(ContactDetail {
        contact,
        roles,
        tax_info,
    })))
}

/// PUT /api/v1/contacts/{id}
pub async fn update_contact(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateContact>,
) -> AppResult<Json<DataResponse<Contact>>> {
    validate_input(&input)?;
    user.require(Permission::ContactsWrite)?;

    let existing = find_contact(&state, user.tenant_id, id).await?;
    let first = input.first_name.as_deref().or(existing.first_name.as_deref());
    let last = input.last_name.as_deref().or(existing.last_name.as_deref());
    let company = input
        .company_name
        .as_deref()
        .or(existing.company_name.as_deref());
    if !Contact::has_name(first, last, company) {
        return Err(AppError::Core(CoreError::Validation(NAME_REQUIRED.into())));
    }

    let updated = ContactRepo::update(&state.pool, user.tenant_id, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Contact", id))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPDATE, entity_types::CONTACT, id),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// DELETE /api/v1/contacts/{id}
///
/// Soft delete. Refused with 409 while an active project or a non-void
/// invoice still points at the contact.
pub async fn delete_contact(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    user.require(Permission::ContactsDelete)?;
    find_contact(&state, user.tenant_id, id).await?;

    let refs = ContactRepo::references(&state.pool, user.tenant_id, id).await?;
    if refs.is_referenced() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Contact is referenced by {} active project(s) and {} open invoice(s)",
            refs.active_projects, refs.open_invoices
        ))));
    }

    if !ContactRepo::soft_delete(&state.pool, user.tenant_id, id).await? {
        return Err(AppError::not_found("Contact", id));
    }

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::DELETE, entity_types::CONTACT, id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// POST /api/v1/contacts/{id}/roles
///
/// 409 when the contact already holds the role.
pub async fn add_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CreateContactRole>,
) -> AppResult<(StatusCode, Json<DataResponse<ContactRole>>)> {
    let data = validate_role_data(input.role, input.role_specific_data.as_ref())?;
    user.require(Permission::ContactsWrite)?;
    find_contact(&state, user.tenant_id, id).await?;

    if ContactRoleRepo::find(&state.pool, user.tenant_id, id, input.role)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Contact already has the '{}' role",
            input.role
        ))));
    }

    let role = ContactRoleRepo::create(&state.pool, user.tenant_id, id, input.role, &data).await?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::CREATE, entity_types::CONTACT_ROLE, role.id)
            .with_details(json!({ "contact_id": id, "role": role.role })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(role))))
}

/// PUT /api/v1/contacts/{id}/roles/{role}
///
/// Merge `role_specific_data` into the stored object; `null` values remove
/// keys.
pub async fn update_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, kind)): Path<(DbId, ContactRoleKind)>,
    Json(input): Json<UpdateContactRole>,
) -> AppResult<Json<DataResponse<ContactRole>>> {
    user.require(Permission::ContactsWrite)?;

    let existing = ContactRoleRepo::find(&state.pool, user.tenant_id, id, kind)
        .await?
        .ok_or_else(|| role_not_found(id, kind))?;

    let data = match &input.role_specific_data {
        Some(patch) => merge_role_data(kind, &existing.role_specific_data, patch)?,
        None => existing.role_specific_data.clone(),
    };

    let updated =
        ContactRoleRepo::update(&state.pool, user.tenant_id, id, kind, &data, input.is_active)
            .await?
            .ok_or_else(|| role_not_found(id, kind))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPDATE, entity_types::CONTACT_ROLE, updated.id)
            .with_details(json!({ "contact_id": id, "role": kind })),
    )
    .await;

    Ok(Json(DataResponse::new(updated)))
}

/// DELETE /api/v1/contacts/{id}/roles/{role}
pub async fn remove_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, kind)): Path<(DbId, ContactRoleKind)>,
) -> AppResult<StatusCode> {
    user.require(Permission::ContactsWrite)?;

    let existing = ContactRoleRepo::find(&state.pool, user.tenant_id, id, kind)
        .await?
        .ok_or_else(|| role_not_found(id, kind))?;

    if !ContactRoleRepo::delete(&state.pool, user.tenant_id, id, kind).await? {
        return Err(role_not_found(id, kind));
    }

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::DELETE, entity_types::CONTACT_ROLE, existing.id)
            .with_details(json!({ "contact_id": id, "role": kind })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) async fn find_contact(state: &AppState, tenant_id: DbId, id: DbId) -> AppResult<Contact> {
    ContactRepo::find_by_id(&state.pool, tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Contact", id))
}

/// 404 naming the contact, for a role the contact does not hold.
fn role_not_found(contact_id: DbId, kind: ContactRoleKind) -> AppError {
    tracing::debug!(contact_id, role = %kind, "Contact role not found");
    AppError::not_found("Contact role", contact_id)
}

/// Check each requested role's data and reject the same role twice.
fn validate_initial_roles(
    roles: &[CreateContactRole],
) -> AppResult<Vec<(ContactRoleKind, serde_json::Value)>> {
    let mut seen = HashSet::new();
    roles
        .iter()
        .map(|r| {
            if !seen.insert(r.role) {
                return Err(AppError::Core(CoreError::Validation(format!(
                    "roles: '{}' listed more than once",
                    r.role
                ))));
            }
            let data = validate_role_data(r.role, r.role_specific_data.as_ref())?;
            Ok((r.role, data))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(kind: ContactRoleKind, data: serde_json::Value) -> CreateContactRole {
        CreateContactRole {
            role: kind,
            role_specific_data: Some(data),
        }
    }

    #[test]
    fn duplicate_initial_roles_are_rejected() {
        let roles = vec![
            role(ContactRoleKind::Author, json!({})),
            role(ContactRoleKind::Author, json!({ "pen_name": "A. N. Other" })),
        ];
        assert!(validate_initial_roles(&roles).is_err());
    }

    #[test]
    fn initial_roles_pass_through_validated_data() {
        let roles = vec![
            role(ContactRoleKind::Customer, json!({ "customer_type": "library" })),
            CreateContactRole {
                role: ContactRoleKind::Vendor,
                role_specific_data: None,
            },
        ];
        let checked = validate_initial_roles(&roles).unwrap();
        assert_eq!(checked.len(), 2);
        assert_eq!(checked[0].0, ContactRoleKind::Customer);
        assert_eq!(checked[1].1, json!({}));
    }
}
