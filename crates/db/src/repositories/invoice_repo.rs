//! Repository for `invoices`, `invoice_line_items` and `invoice_payments`.

use sqlx::{PgConnection, PgPool};
use imprint_core::invoice::{format_invoice_number, InvoiceStatus};
use imprint_core::types::{Date, DbId};

use crate::models::invoice::{
    Invoice, InvoiceDraft, InvoiceLineInput, InvoiceLineItem, InvoiceListParams, InvoicePayment,
    RecordPayment,
};
use crate::repositories::page;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, tenant_id, invoice_number, customer_contact_id, status, issue_date, \
                        due_date, currency, tax_rate_bps, subtotal_cents, tax_cents, total_cents, \
                        amount_paid_cents, notes, sent_at, paid_at, voided_at, created_by, \
                        created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, invoice_id, description, quantity, unit_price_cents, amount_cents, sort_order";

const PAYMENT_COLUMNS: &str = "id, tenant_id, invoice_id, amount_cents, paid_on, method, \
                                reference, recorded_by, created_at";

/// Insert `lines` for an invoice in order. Amounts were validated by the
/// caller when the totals were computed.
async fn insert_lines(
    conn: &mut PgConnection,
    invoice_id: DbId,
    lines: &[InvoiceLineInput],
) -> Result<(), sqlx::Error> {
    for (idx, line) in lines.iter().enumerate() {
        sqlx::query(
            "INSERT INTO invoice_line_items
                (invoice_id, description, quantity, unit_price_cents, amount_cents, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(invoice_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(i64::from(line.quantity) * line.unit_price_cents)
        .bind(idx as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Provides invoice storage, numbering and payment recording.
pub struct InvoiceRepo;

impl InvoiceRepo {
    /// Create a draft invoice with its lines.
    ///
    /// The invoice number is drawn from the tenant's counter with an atomic
    /// `UPDATE ... RETURNING` inside the same transaction, so numbers are
    /// never reused even under concurrent creates.
    pub async fn create(
        pool: &PgPool,
        tenant_id: DbId,
        created_by: Option<DbId>,
        draft: &InvoiceDraft,
        lines: &[InvoiceLineInput],
    ) -> Result<Invoice, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let seq: i64 = sqlx::query_scalar(
            "UPDATE tenants SET next_invoice_seq = next_invoice_seq + 1, updated_at = NOW()
             WHERE id = $1
             RETURNING next_invoice_seq - 1",
        )
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await?;
        let number = format_invoice_number(draft.issue_date, seq);

        let query = format!(
            "INSERT INTO invoices
                (tenant_id, invoice_number, customer_contact_id, issue_date, due_date, currency,
                 tax_rate_bps, subtotal_cents, tax_cents, total_cents, notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(tenant_id)
            .bind(&number)
            .bind(draft.customer_contact_id)
            .bind(draft.issue_date)
            .bind(draft.due_date)
            .bind(&draft.currency)
            .bind(draft.tax_rate_bps)
            .bind(draft.subtotal_cents)
            .bind(draft.tax_cents)
            .bind(draft.total_cents)
            .bind(&draft.notes)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        insert_lines(&mut *tx, invoice.id, lines).await?;

        tx.commit().await?;
        Ok(invoice)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invoices WHERE id = $1 AND tenant_id = $2");
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        tenant_id: DbId,
        params: &InvoiceListParams,
    ) -> Result<Vec<Invoice>, sqlx::Error> {
        let (limit, offset) = page(params.limit, params.offset);
        let query = format!(
            "SELECT {COLUMNS} FROM invoices
             WHERE tenant_id = $1
               AND ($2::TEXT IS NULL OR status = $2)
               AND ($3::BIGINT IS NULL OR customer_contact_id = $3)
             ORDER BY issue_date DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(tenant_id)
            .bind(params.status.map(|s| s.as_str()))
            .bind(params.customer_contact_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn line_items(
        pool: &PgPool,
        invoice_id: DbId,
    ) -> Result<Vec<InvoiceLineItem>, sqlx::Error> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM invoice_line_items
             WHERE invoice_id = $1
             ORDER BY sort_order ASC, id ASC"
        );
        sqlx::query_as::<_, InvoiceLineItem>(&query)
            .bind(invoice_id)
            .fetch_all(pool)
            .await
    }

    pub async fn payments(
        pool: &PgPool,
        tenant_id: DbId,
        invoice_id: DbId,
    ) -> Result<Vec<InvoicePayment>, sqlx::Error> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM invoice_payments
             WHERE invoice_id = $1 AND tenant_id = $2
             ORDER BY paid_on ASC, id ASC"
        );
        sqlx::query_as::<_, InvoicePayment>(&query)
            .bind(invoice_id)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// Rewrite a draft's header and, when `lines` is given, replace all of
    /// its lines. Returns `None` if the invoice is missing or no longer a
    /// draft.
    pub async fn update_draft(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        draft: &InvoiceDraft,
        lines: Option<&[InvoiceLineInput]>,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE invoices SET
                customer_contact_id = $3,
                issue_date = $4,
                due_date = $5,
                currency = $6,
                tax_rate_bps = $7,
                subtotal_cents = $8,
                tax_cents = $9,
                total_cents = $10,
                notes = $11,
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND status = $12
             RETURNING {COLUMNS}"
        );
        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(draft.customer_contact_id)
            .bind(draft.issue_date)
            .bind(draft.due_date)
            .bind(&draft.currency)
            .bind(draft.tax_rate_bps)
            .bind(draft.subtotal_cents)
            .bind(draft.tax_cents)
            .bind(draft.total_cents)
            .bind(&draft.notes)
            .bind(InvoiceStatus::Draft.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        if let Some(lines) = lines {
            sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = $1")
                .bind(invoice.id)
                .execute(&mut *tx)
                .await?;
            insert_lines(&mut *tx, invoice.id, lines).await?;
        }

        tx.commit().await?;
        Ok(Some(invoice))
    }

    /// Hard-delete a draft. Returns `true` if a row was removed.
    pub async fn delete_draft(pool: &PgPool, tenant_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM invoices WHERE id = $1 AND tenant_id = $2 AND status = $3")
                .bind(id)
                .bind(tenant_id)
                .bind(InvoiceStatus::Draft.as_str())
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Change status if it still equals `from`, stamping `sent_at`,
    /// `paid_at` or `voided_at` as appropriate.
    pub async fn set_status(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!(
            "UPDATE invoices SET
                status = $4,
                sent_at = CASE WHEN $4 = 'sent' THEN NOW() ELSE sent_at END,
                paid_at = CASE WHEN $4 = 'paid' THEN NOW() ELSE paid_at END,
                voided_at = CASE WHEN $4 = 'void' THEN NOW() ELSE voided_at END,
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND status = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Record a payment and bump `amount_paid_cents`, moving the invoice to
    /// `paid` when the balance reaches zero.
    ///
    /// The update only matches while the invoice still accepts payments and
    /// the new amount fits within the total, so a payment checked against a
    /// stale balance is refused (`None`) rather than overpaying.
    pub async fn record_payment(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        input: &RecordPayment,
        recorded_by: Option<DbId>,
    ) -> Result<Option<(Invoice, InvoicePayment)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE invoices SET
                amount_paid_cents = amount_paid_cents + $3,
                status = CASE WHEN amount_paid_cents + $3 = total_cents THEN 'paid' ELSE status END,
                paid_at = CASE WHEN amount_paid_cents + $3 = total_cents THEN NOW() ELSE paid_at END,
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2
               AND status IN ('sent', 'overdue')
               AND amount_paid_cents + $3 <= total_cents
             RETURNING {COLUMNS}"
        );
        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(input.amount_cents)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO invoice_payments
                (tenant_id, invoice_id, amount_cents, paid_on, method, reference, recorded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PAYMENT_COLUMNS}"
        );
        let payment = sqlx::query_as::<_, InvoicePayment>(&query)
            .bind(tenant_id)
            .bind(invoice.id)
            .bind(input.amount_cents)
            .bind(input.paid_on)
            .bind(&input.method)
            .bind(&input.reference)
            .bind(recorded_by)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((invoice, payment)))
    }

    /// Move every `sent` invoice whose due date is before `today` to
    /// `overdue`. Returns the invoices that changed.
    pub async fn mark_overdue(
        pool: &PgPool,
        tenant_id: DbId,
        today: Date,
    ) -> Result<Vec<Invoice>, sqlx::Error> {
        let query = format!(
            "UPDATE invoices SET status = $3, updated_at = NOW()
             WHERE tenant_id = $1 AND status = $4 AND due_date < $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(tenant_id)
            .bind(today)
            .bind(InvoiceStatus::Overdue.as_str())
            .bind(InvoiceStatus::Sent.as_str())
            .fetch_all(pool)
            .await
    }
}
