//! Handlers for the `/invoices` resource: drafts, status changes, payments
//! and the overdue sweep.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use imprint_core::audit::{action_types, entity_types, transition_details};
use imprint_core::contact_roles::ContactRoleKind;
use imprint_core::error::CoreError;
use imprint_core::invoice::{
    apply_payment, compute_totals, is_past_due, validate_invoice_transition, InvoiceStatus,
    LineAmount,
};
use imprint_core::permissions::Permission;
use imprint_core::types::{Date, DbId};
use imprint_core::validation::{validate_date_order, validate_input, CURRENCY_CODE};
use imprint_db::models::invoice::{
    CreateInvoice, Invoice, InvoiceDetail, InvoiceDraft, InvoiceLineInput, InvoiceListParams,
    InvoicePayment, RecordPayment, TransitionInvoiceStatus, UpdateInvoice,
};
use imprint_db::repositories::{ContactRepo, ContactRoleRepo, InvoiceRepo, TenantRepo};
use imprint_mail::templates::{invoice_notice, InvoiceNotice};
use serde::Serialize;
use serde_json::json;

use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_CURRENCY: &str = "USD";

/// Response of `POST /invoices/{id}/payments`.
#[derive(Debug, Serialize)]
pub struct PaymentRecorded {
    pub invoice: Invoice,
    pub payment: InvoicePayment,
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// POST /api/v1/invoices
///
/// Create a draft. Totals are computed from the lines; the invoice number is
/// taken from the tenant's counter.
pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateInvoice>,
) -> AppResult<(StatusCode, Json<DataResponse<InvoiceDetail>>)> {
    validate_input(&input)?;
    let currency = normalize_currency(input.currency.as_deref())?;
    validate_date_order("issue_date", Some(input.issue_date), "due_date", Some(input.due_date))?;
    user.require(Permission::InvoicesWrite)?;

    ensure_billable(&state, user.tenant_id, input.customer_contact_id).await?;

    let tax_rate_bps = input.tax_rate_bps.unwrap_or(0);
    let draft = build_draft(
        input.customer_contact_id,
        input.issue_date,
        input.due_date,
        currency,
        tax_rate_bps,
        input.notes.clone(),
        &input.line_items,
    )?;

    let invoice = InvoiceRepo::create(
        &state.pool,
        user.tenant_id,
        Some(user.user_id),
        &draft,
        &input.line_items,
    )
    .await?;

    tracing::info!(invoice_id = invoice.id, number = %invoice.invoice_number, "Invoice created");
    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::CREATE, entity_types::INVOICE, invoice.id).with_details(
            json!({ "invoice_number": invoice.invoice_number, "total_cents": invoice.total_cents }),
        ),
    )
    .await;

    let detail = load_detail(&state, user.tenant_id, invoice).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(detail))))
}

/// GET /api/v1/invoices
///
/// Optional filters: `status`, `customer_contact_id`, `limit`, `offset`.
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<InvoiceListParams>,
) -> AppResult<Json<DataResponse<Vec<Invoice>>>> {
    user.require(Permission::InvoicesRead)?;
    let invoices = InvoiceRepo::list(&state.pool, user.tenant_id, &params).await?;
    Ok(Json(DataResponse::new(invoices)))
}

/// GET /api/v1/invoices/{id}
pub async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<InvoiceDetail>>> {
    user.require(Permission::InvoicesRead)?;
    let invoice = find_invoice(&state, user.tenant_id, id).await?;
    let detail = load_detail(&state, user.tenant_id, invoice).await?;
    Ok(Json(DataResponse::new(detail)))
}

/// PUT /api/v1/invoices/{id}
///
/// Draft only. `line_items`, when present, replaces every line.
pub async fn update_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateInvoice>,
) -> AppResult<Json<DataResponse<InvoiceDetail>>> {
    validate_input(&input)?;
    user.require(Permission::InvoicesWrite)?;

    let existing = find_invoice(&state, user.tenant_id, id).await?;
    ensure_editable(&existing)?;

    let issue_date = input.issue_date.unwrap_or(existing.issue_date);
    let due_date = input.due_date.unwrap_or(existing.due_date);
    validate_date_order("issue_date", Some(issue_date), "due_date", Some(due_date))?;

    let currency = match input.currency.as_deref() {
        Some(c) => normalize_currency(Some(c))?,
        None => existing.currency.clone(),
    };

    let customer_contact_id = input
        .customer_contact_id
        .unwrap_or(existing.customer_contact_id);
    if customer_contact_id != existing.customer_contact_id {
        ensure_billable(&state, user.tenant_id, customer_contact_id).await?;
    }

    let tax_rate_bps = input.tax_rate_bps.unwrap_or(existing.tax_rate_bps);
    let notes = input.notes.clone().or_else(|| existing.notes.clone());

    let draft = match input.line_items.as_deref() {
        Some(lines) => build_draft(
            customer_contact_id,
            issue_date,
            due_date,
            currency,
            tax_rate_bps,
            notes,
            lines,
        )?,
        None => {
            let stored = InvoiceRepo::line_items(&state.pool, existing.id).await?;
            let amounts: Vec<LineAmount> = stored
                .iter()
                .map(|l| LineAmount {
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price_cents,
                })
                .collect();
            let totals = compute_totals(&amounts, tax_rate_bps)?;
            InvoiceDraft {
                customer_contact_id,
                issue_date,
                due_date,
                currency,
                tax_rate_bps,
                notes,
                subtotal_cents: totals.subtotal_cents,
                tax_cents: totals.tax_cents,
                total_cents: totals.total_cents,
            }
        }
    };

    let updated =
        InvoiceRepo::update_draft(&state.pool, user.tenant_id, id, &draft, input.line_items.as_deref())
            .await?
            .ok_or_else(|| AppError::stale("Invoice"))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::UPDATE, entity_types::INVOICE, id)
            .with_details(json!({ "total_cents": updated.total_cents })),
    )
    .await;

    let detail = load_detail(&state, user.tenant_id, updated).await?;
    Ok(Json(DataResponse::new(detail)))
}

/// DELETE /api/v1/invoices/{id}
///
/// Hard delete, draft only.
pub async fn delete_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    user.require(Permission::InvoicesWrite)?;

    let existing = find_invoice(&state, user.tenant_id, id).await?;
    ensure_editable(&existing)?;

    if !InvoiceRepo::delete_draft(&state.pool, user.tenant_id, id).await? {
        return Err(AppError::stale("Invoice"));
    }

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::DELETE, entity_types::INVOICE, id)
            .with_details(json!({ "invoice_number": existing.invoice_number })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Status and payments
// ---------------------------------------------------------------------------

/// POST /api/v1/invoices/{id}/status
///
/// Voiding needs `invoices.void`. Marking paid requires a zero balance;
/// marking overdue requires a passed due date. Sending emails the customer.
pub async fn transition_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<TransitionInvoiceStatus>,
) -> AppResult<Json<DataResponse<Invoice>>> {
    let permission = if input.status == InvoiceStatus::Void {
        Permission::InvoicesVoid
    } else {
        Permission::InvoicesWrite
    };
    user.require(permission)?;

    let existing = find_invoice(&state, user.tenant_id, id).await?;
    validate_invoice_transition(existing.status, input.status)?;
    check_transition_preconditions(&existing, input.status, Utc::now().date_naive())?;

    let updated =
        InvoiceRepo::set_status(&state.pool, user.tenant_id, id, existing.status, input.status)
            .await?
            .ok_or_else(|| AppError::stale("Invoice"))?;

    tracing::info!(invoice_id = id, from = %existing.status, to = %updated.status, "Invoice status changed");
    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::STATUS_CHANGE, entity_types::INVOICE, id)
            .with_details(transition_details(existing.status.as_str(), updated.status.as_str())),
    )
    .await;

    if updated.status == InvoiceStatus::Sent {
        notify_customer(&state, &updated).await;
    }

    Ok(Json(DataResponse::new(updated)))
}

/// POST /api/v1/invoices/{id}/payments
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<RecordPayment>,
) -> AppResult<(StatusCode, Json<DataResponse<PaymentRecorded>>)> {
    validate_input(&input)?;
    user.require(Permission::InvoicesWrite)?;

    let existing = find_invoice(&state, user.tenant_id, id).await?;
    let outcome = apply_payment(
        existing.status,
        existing.total_cents,
        existing.amount_paid_cents,
        input.amount_cents,
    )?;

    let (invoice, payment) =
        InvoiceRepo::record_payment(&state.pool, user.tenant_id, id, &input, Some(user.user_id))
            .await?
            .ok_or_else(|| AppError::stale("Invoice"))?;

    audit::record(
        &state.pool,
        &user,
        AuditEvent::new(action_types::PAYMENT, entity_types::INVOICE, id).with_details(json!({
            "payment_id": payment.id,
            "amount_cents": payment.amount_cents,
            "balance_cents": invoice.balance_cents(),
            "settled": outcome.settles,
        })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(PaymentRecorded { invoice, payment })),
    ))
}

/// POST /api/v1/invoices/mark-overdue
///
/// Move every sent invoice past its due date to `overdue`. Returns the
/// invoices that changed.
pub async fn mark_overdue(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Invoice>>>> {
    user.require(Permission::InvoicesWrite)?;

    let today = Utc::now().date_naive();
    let changed = InvoiceRepo::mark_overdue(&state.pool, user.tenant_id, today).await?;

    tracing::info!(tenant_id = user.tenant_id, count = changed.len(), "Marked invoices overdue");
    for invoice in &changed {
        audit::record(
            &state.pool,
            &user,
            AuditEvent::new(action_types::STATUS_CHANGE, entity_types::INVOICE, invoice.id)
                .with_details(transition_details(
                    InvoiceStatus::Sent.as_str(),
                    InvoiceStatus::Overdue.as_str(),
                )),
        )
        .await;
    }

    Ok(Json(DataResponse::new(changed)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_invoice(state: &AppState, tenant_id: DbId, id: DbId) -> AppResult<Invoice> {
    InvoiceRepo::find_by_id(&state.pool, tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice", id))
}

async fn load_detail(state: &AppState, tenant_id: DbId, invoice: Invoice) -> AppResult<InvoiceDetail> {
    let line_items = InvoiceRepo::line_items(&state.pool, invoice.id).await?;
    let payments = InvoiceRepo::payments(&state.pool, tenant_id, invoice.id).await?;
    Ok(InvoiceDetail {
        balance_cents: invoice.balance_cents(),
        invoice,
        line_items,
        payments,
    })
}

/// The customer must be a live contact holding a billable role.
async fn ensure_billable(state: &AppState, tenant_id: DbId, contact_id: DbId) -> AppResult<()> {
    let billable: Vec<ContactRoleKind> = ContactRoleKind::ALL
        .iter()
        .copied()
        .filter(|k| k.is_billable())
        .collect();
    if ContactRoleRepo::has_any_role(&state.pool, tenant_id, contact_id, &billable).await? {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "customer_contact_id: contact {contact_id} must hold an active customer or distributor role"
        ))))
    }
}

fn ensure_editable(invoice: &Invoice) -> AppResult<()> {
    if invoice.status.is_editable() {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Conflict(format!(
            "Only draft invoices can be changed; this one is '{}'",
            invoice.status
        ))))
    }
}

fn normalize_currency(raw: Option<&str>) -> Result<String, CoreError> {
    let currency = raw.map(str::trim).unwrap_or(DEFAULT_CURRENCY);
    if CURRENCY_CODE.is_match(currency) {
        Ok(currency.to_string())
    } else {
        Err(CoreError::Validation(format!(
            "currency: '{currency}' must be a 3-letter upper-case code"
        )))
    }
}

fn build_draft(
    customer_contact_id: DbId,
    issue_date: Date,
    due_date: Date,
    currency: String,
    tax_rate_bps: i32,
    notes: Option<String>,
    lines: &[InvoiceLineInput],
) -> Result<InvoiceDraft, CoreError> {
    let amounts: Vec<LineAmount> = lines.iter().map(InvoiceLineInput::amount).collect();
    let totals = compute_totals(&amounts, tax_rate_bps)?;
    Ok(InvoiceDraft {
        customer_contact_id,
        issue_date,
        due_date,
        currency,
        tax_rate_bps,
        notes,
        subtotal_cents: totals.subtotal_cents,
        tax_cents: totals.tax_cents,
        total_cents: totals.total_cents,
    })
}

/// Business checks layered on top of the status table.
fn check_transition_preconditions(
    invoice: &Invoice,
    to: InvoiceStatus,
    today: Date,
) -> Result<(), CoreError> {
    match to {
        InvoiceStatus::Paid if invoice.balance_cents() > 0 => Err(CoreError::Conflict(format!(
            "Invoice still has an outstanding balance of {}; record a payment instead",
            invoice.balance_cents()
        ))),
        InvoiceStatus::Overdue if !is_past_due(invoice.status, invoice.due_date, today) => {
            Err(CoreError::Conflict(format!(
                "Invoice is not past its due date ({})",
                invoice.due_date
            )))
        }
        _ => Ok(()),
    }
}

/// Email the issued invoice to the customer. Never fails the request.
async fn notify_customer(state: &AppState, invoice: &Invoice) {
    let lookups = async {
        let customer =
            ContactRepo::find_by_id(&state.pool, invoice.tenant_id, invoice.customer_contact_id)
                .await?;
        let tenant = TenantRepo::find_by_id(&state.pool, invoice.tenant_id).await?;
        Ok::<_, sqlx::Error>((customer, tenant))
    };
    let (customer, tenant) = match lookups.await {
        Ok((Some(customer), Some(tenant))) => (customer, tenant),
        Ok(_) => return,
        Err(e) => {
            tracing::warn!(invoice_id = invoice.id, error = %e, "Could not load invoice notice recipient");
            return;
        }
    };
    let Some(email) = customer.email.as_deref().filter(|e| !e.is_empty()) else {
        tracing::debug!(invoice_id = invoice.id, "Customer has no email; skipping invoice notice");
        return;
    };

    let customer_name = customer.display_name();
    let message = invoice_notice(&InvoiceNotice {
        publisher_name: &tenant.name,
        customer_email: email,
        customer_name: &customer_name,
        invoice_number: &invoice.invoice_number,
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        total_cents: invoice.total_cents,
        currency: &invoice.currency,
    });

    if let Err(e) = state.mailer.send(&message).await {
        tracing::warn!(invoice_id = invoice.id, error = %e, "Failed to send invoice notice");
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(status: InvoiceStatus, total: i64, paid: i64) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: 1,
            tenant_id: 1,
            invoice_number: "INV-2026-00001".into(),
            customer_contact_id: 2,
            status,
            issue_date: date(2026, 3, 1),
            due_date: date(2026, 3, 31),
            currency: "USD".into(),
            tax_rate_bps: 0,
            subtotal_cents: total,
            tax_cents: 0,
            total_cents: total,
            amount_paid_cents: paid,
            notes: None,
            sent_at: None,
            paid_at: None,
            voided_at: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn currency_defaults_and_validates() {
        assert_eq!(normalize_currency(None).unwrap(), "USD");
        assert_eq!(normalize_currency(Some(" EUR ")).unwrap(), "EUR");
        assert_matches!(normalize_currency(Some("eur")), Err(CoreError::Validation(_)));
        assert_matches!(normalize_currency(Some("EURO")), Err(CoreError::Validation(_)));
    }

    #[test]
    fn draft_totals_include_tax() {
        let lines = vec![
            InvoiceLineInput {
                description: "Copyediting".into(),
                quantity: 2,
                unit_price_cents: 10_000,
            },
            InvoiceLineInput {
                description: "Cover".into(),
                quantity: 1,
                unit_price_cents: 5_000,
            },
        ];
        let draft = build_draft(2, date(2026, 3, 1), date(2026, 3, 31), "USD".into(), 825, None, &lines)
            .unwrap();
        assert_eq!(draft.subtotal_cents, 25_000);
        assert_eq!(draft.tax_cents, 2_063);
        assert_eq!(draft.total_cents, 27_063);
    }

    #[test]
    fn paid_requires_zero_balance() {
        let today = date(2026, 3, 10);
        assert_matches!(
            check_transition_preconditions(&invoice(InvoiceStatus::Sent, 1_000, 400), InvoiceStatus::Paid, today),
            Err(CoreError::Conflict(_))
        );
        assert!(check_transition_preconditions(
            &invoice(InvoiceStatus::Sent, 1_000, 1_000),
            InvoiceStatus::Paid,
            today
        )
        .is_ok());
    }

    #[test]
    fn overdue_requires_passed_due_date() {
        let sent = invoice(InvoiceStatus::Sent, 1_000, 0);
        assert_matches!(
            check_transition_preconditions(&sent, InvoiceStatus::Overdue, date(2026, 3, 31)),
            Err(CoreError::Conflict(_))
        );
        assert!(check_transition_preconditions(&sent, InvoiceStatus::Overdue, date(2026, 4, 1)).is_ok());
    }
}
