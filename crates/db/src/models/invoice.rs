//! Invoice, line item and payment models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use imprint_core::invoice::{InvoiceStatus, LineAmount};
use imprint_core::types::{Cents, Date, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A row from `invoices`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: DbId,
    pub tenant_id: DbId,
    pub invoice_number: String,
    pub customer_contact_id: DbId,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    pub issue_date: Date,
    pub due_date: Date,
    pub currency: String,
    pub tax_rate_bps: i32,
    pub subtotal_cents: Cents,
    pub tax_cents: Cents,
    pub total_cents: Cents,
    pub amount_paid_cents: Cents,
    pub notes: Option<String>,
    pub sent_at: Option<Timestamp>,
    pub paid_at: Option<Timestamp>,
    pub voided_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invoice {
    pub fn balance_cents(&self) -> Cents {
        self.total_cents - self.amount_paid_cents
    }
}

/// A row from `invoice_line_items`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InvoiceLineItem {
    pub id: DbId,
    pub invoice_id: DbId,
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: Cents,
    pub amount_cents: Cents,
    pub sort_order: i32,
}

/// A row from `invoice_payments`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InvoicePayment {
    pub id: DbId,
    pub tenant_id: DbId,
    pub invoice_id: DbId,
    pub amount_cents: Cents,
    pub paid_on: Date,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub recorded_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// Invoice with its lines and payments.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub balance_cents: Cents,
    pub line_items: Vec<InvoiceLineItem>,
    pub payments: Vec<InvoicePayment>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// One line in a create/update request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceLineInput {
    #[validate(length(min = 1, max = 500, message = "must be 1-500 characters"))]
    pub description: String,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub unit_price_cents: Cents,
}

impl InvoiceLineInput {
    pub fn amount(&self) -> LineAmount {
        LineAmount {
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
        }
    }
}

/// DTO for creating a draft invoice.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInvoice {
    pub customer_contact_id: DbId,
    pub issue_date: Date,
    pub due_date: Date,
    /// Defaults to `USD`.
    pub currency: Option<String>,
    #[validate(range(min = 0, max = 5000, message = "must be between 0 and 5000 basis points"))]
    pub tax_rate_bps: Option<i32>,
    #[validate(length(max = 10_000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "must contain at least one line"), nested)]
    pub line_items: Vec<InvoiceLineInput>,
}

/// DTO for editing a draft. When `line_items` is present it replaces every
/// existing line.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateInvoice {
    pub customer_contact_id: Option<DbId>,
    pub issue_date: Option<Date>,
    pub due_date: Option<Date>,
    pub currency: Option<String>,
    #[validate(range(min = 0, max = 5000, message = "must be between 0 and 5000 basis points"))]
    pub tax_rate_bps: Option<i32>,
    #[validate(length(max = 10_000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "must contain at least one line"), nested)]
    pub line_items: Option<Vec<InvoiceLineInput>>,
}

/// Fully resolved header values written on create/update.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub customer_contact_id: DbId,
    pub issue_date: Date,
    pub due_date: Date,
    pub currency: String,
    pub tax_rate_bps: i32,
    pub notes: Option<String>,
    pub subtotal_cents: Cents,
    pub tax_cents: Cents,
    pub total_cents: Cents,
}

/// Filters for listing invoices.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListParams {
    pub status: Option<InvoiceStatus>,
    pub customer_contact_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for a status transition.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionInvoiceStatus {
    pub status: InvoiceStatus,
}

/// Request body for recording a payment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordPayment {
    #[validate(range(min = 1, message = "must be greater than zero"))]
    pub amount_cents: Cents,
    pub paid_on: Date,
    #[validate(length(max = 50))]
    pub method: Option<String>,
    #[validate(length(max = 200))]
    pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(lines: serde_json::Value) -> CreateInvoice {
        serde_json::from_value(serde_json::json!({
            "customer_contact_id": 1,
            "issue_date": "2026-01-05",
            "due_date": "2026-02-04",
            "line_items": lines,
        }))
        .unwrap()
    }

    #[test]
    fn invoice_needs_at_least_one_line() {
        let errors = create(serde_json::json!([])).validate().unwrap_err();
        let fields = errors.field_errors();
        let line_errors = fields.get("line_items").expect("line_items error");
        assert_eq!(
            line_errors[0].message.as_deref(),
            Some("must contain at least one line")
        );
    }

    #[test]
    fn each_line_is_validated() {
        let invoice = create(serde_json::json!([
            { "description": "Setup", "quantity": 0, "unit_price_cents": 5000 },
        ]));
        assert!(invoice.validate().is_err());

        let invoice = create(serde_json::json!([
            { "description": "Setup", "quantity": 1, "unit_price_cents": 5000 },
        ]));
        assert!(invoice.validate().is_ok());
    }

    #[test]
    fn replacing_lines_with_an_empty_list_is_rejected() {
        let update: UpdateInvoice =
            serde_json::from_value(serde_json::json!({ "line_items": [] })).unwrap();
        assert!(update.validate().is_err());
    }
}
