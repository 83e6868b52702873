//! Invoice status rules, totals arithmetic and numbering.

use chrono::Datelike;

use crate::error::CoreError;
use crate::types::{text_enum, Cents, Date};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

text_enum! {
    /// Lifecycle status of an invoice.
    InvoiceStatus, "invoice status" {
        Draft => "draft",
        Sent => "sent",
        Overdue => "overdue",
        Paid => "paid",
        Void => "void",
    }
}

impl InvoiceStatus {
    /// Statuses reachable from `self`.
    ///
    /// - `draft`   -> `sent`, `void`
    /// - `sent`    -> `paid`, `overdue`, `void`
    /// - `overdue` -> `paid`, `void`
    /// - `paid`, `void` are terminal
    pub fn transitions(self) -> &'static [InvoiceStatus] {
        use InvoiceStatus::*;
        match self {
            Draft => &[Sent, Void],
            Sent => &[Paid, Overdue, Void],
            Overdue => &[Paid, Void],
            Paid | Void => &[],
        }
    }

    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        self.transitions().contains(&next)
    }

    /// Only drafts may have their lines, dates or tax rate edited.
    pub fn is_editable(self) -> bool {
        self == InvoiceStatus::Draft
    }

    /// Payments are accepted once the invoice has been issued and until it
    /// is settled or voided.
    pub fn accepts_payments(self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

pub fn validate_invoice_transition(
    current: InvoiceStatus,
    next: InvoiceStatus,
) -> Result<(), CoreError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::transition("invoice status", current, next))
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Basis points in one whole (100%).
const BPS_SCALE: i64 = 10_000;

/// Largest tax rate accepted (50%).
pub const MAX_TAX_RATE_BPS: i32 = 5_000;

/// One priced line as used for totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub quantity: i32,
    pub unit_price_cents: Cents,
}

impl LineAmount {
    /// `quantity * unit_price_cents`, rejecting overflow and negative input.
    pub fn amount(self) -> Result<Cents, CoreError> {
        if self.quantity <= 0 {
            return Err(CoreError::Validation(
                "Line quantity must be greater than zero".into(),
            ));
        }
        if self.unit_price_cents < 0 {
            return Err(CoreError::Validation(
                "Line unit price must not be negative".into(),
            ));
        }
        i64::from(self.quantity)
            .checked_mul(self.unit_price_cents)
            .ok_or_else(|| CoreError::Validation("Line amount is too large".into()))
    }
}

/// Computed invoice totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvoiceTotals {
    pub subtotal_cents: Cents,
    pub tax_cents: Cents,
    pub total_cents: Cents,
}

/// Tax on `subtotal` at `rate_bps`, rounded half-up to the cent.
pub fn tax_amount(subtotal: Cents, rate_bps: i32) -> Result<Cents, CoreError> {
    if !(0..=MAX_TAX_RATE_BPS).contains(&rate_bps) {
        return Err(CoreError::Validation(format!(
            "Tax rate must be between 0 and {MAX_TAX_RATE_BPS} basis points"
        )));
    }
    let scaled = i128::from(subtotal) * i128::from(rate_bps);
    let rounded = (scaled + i128::from(BPS_SCALE / 2)) / i128::from(BPS_SCALE);
    i64::try_from(rounded).map_err(|_| CoreError::Validation("Tax amount is too large".into()))
}

/// Sum line amounts and apply tax.
pub fn compute_totals(lines: &[LineAmount], tax_rate_bps: i32) -> Result<InvoiceTotals, CoreError> {
    let mut subtotal: Cents = 0;
    for line in lines {
        subtotal = subtotal
            .checked_add(line.amount()?)
            .ok_or_else(|| CoreError::Validation("Invoice subtotal is too large".into()))?;
    }
    let tax = tax_amount(subtotal, tax_rate_bps)?;
    let total = subtotal
        .checked_add(tax)
        .ok_or_else(|| CoreError::Validation("Invoice total is too large".into()))?;
    Ok(InvoiceTotals {
        subtotal_cents: subtotal,
        tax_cents: tax,
        total_cents: total,
    })
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Result of applying a payment to an invoice balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub amount_paid_cents: Cents,
    pub balance_cents: Cents,
    /// True when the payment settles the invoice.
    pub settles: bool,
}

/// Apply a payment of `amount` to an invoice in `status`.
pub fn apply_payment(
    status: InvoiceStatus,
    total: Cents,
    already_paid: Cents,
    amount: Cents,
) -> Result<PaymentOutcome, CoreError> {
    if !status.accepts_payments() {
        return Err(CoreError::Conflict(format!(
            "Payments cannot be recorded on a '{status}' invoice"
        )));
    }
    if amount <= 0 {
        return Err(CoreError::Validation(
            "Payment amount must be greater than zero".into(),
        ));
    }
    let balance = total - already_paid;
    if amount > balance {
        return Err(CoreError::Validation(format!(
            "Payment of {amount} exceeds the outstanding balance of {balance}"
        )));
    }
    let paid = already_paid + amount;
    Ok(PaymentOutcome {
        amount_paid_cents: paid,
        balance_cents: total - paid,
        settles: paid == total,
    })
}

/// Whether a sent invoice has passed its due date as of `today`.
pub fn is_past_due(status: InvoiceStatus, due_date: Date, today: Date) -> bool {
    status == InvoiceStatus::Sent && due_date < today
}

// ---------------------------------------------------------------------------
// Numbering
// ---------------------------------------------------------------------------

pub const INVOICE_NUMBER_PREFIX: &str = "INV";

/// Format an invoice number, e.g. `INV-2026-00042`.
pub fn format_invoice_number(issue_date: Date, sequence: i64) -> String {
    format!(
        "{INVOICE_NUMBER_PREFIX}-{}-{sequence:05}",
        issue_date.year()
    )
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn line(quantity: i32, unit_price_cents: Cents) -> LineAmount {
        LineAmount {
            quantity,
            unit_price_cents,
        }
    }

    #[test]
    fn status_table() {
        use InvoiceStatus::*;
        assert!(Draft.can_transition_to(Sent));
        assert!(Draft.can_transition_to(Void));
        assert!(!Draft.can_transition_to(Paid));
        assert!(Sent.can_transition_to(Overdue));
        assert!(Overdue.can_transition_to(Paid));
        assert!(!Overdue.can_transition_to(Sent));
        assert!(Paid.transitions().is_empty());
        assert!(Void.transitions().is_empty());
    }

    #[test]
    fn totals_with_tax() {
        let totals = compute_totals(&[line(3, 1_999), line(1, 500)], 825).unwrap();
        assert_eq!(totals.subtotal_cents, 6_497);
        // 6497 * 0.0825 = 536.0025 -> 536
        assert_eq!(totals.tax_cents, 536);
        assert_eq!(totals.total_cents, 7_033);
    }

    #[test]
    fn tax_rounds_half_up() {
        // 150 * 0.05 = 7.5 -> 8
        assert_eq!(tax_amount(150, 500).unwrap(), 8);
        // 149 * 0.05 = 7.45 -> 7
        assert_eq!(tax_amount(149, 500).unwrap(), 7);
    }

    #[test]
    fn empty_invoice_is_zero() {
        assert_eq!(compute_totals(&[], 1_000).unwrap(), InvoiceTotals::default());
    }

    #[test]
    fn bad_lines_rejected() {
        assert!(compute_totals(&[line(0, 100)], 0).is_err());
        assert!(compute_totals(&[line(1, -1)], 0).is_err());
        assert!(compute_totals(&[line(i32::MAX, i64::MAX)], 0).is_err());
    }

    #[test]
    fn tax_rate_bounds() {
        assert!(tax_amount(100, -1).is_err());
        assert!(tax_amount(100, MAX_TAX_RATE_BPS + 1).is_err());
    }

    #[test]
    fn partial_then_full_payment() {
        let first = apply_payment(InvoiceStatus::Sent, 10_000, 0, 4_000).unwrap();
        assert_eq!(first.balance_cents, 6_000);
        assert!(!first.settles);

        let second = apply_payment(InvoiceStatus::Sent, 10_000, 4_000, 6_000).unwrap();
        assert!(second.settles);
        assert_eq!(second.amount_paid_cents, 10_000);
    }

    #[test]
    fn overpayment_rejected() {
        assert_matches!(
            apply_payment(InvoiceStatus::Overdue, 10_000, 9_000, 2_000),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn payments_only_on_issued_invoices() {
        for status in [InvoiceStatus::Draft, InvoiceStatus::Paid, InvoiceStatus::Void] {
            assert_matches!(
                apply_payment(status, 100, 0, 100),
                Err(CoreError::Conflict(_))
            );
        }
    }

    #[test]
    fn past_due_detection() {
        let due = Date::from_ymd_opt(2026, 3, 1).unwrap();
        let after = Date::from_ymd_opt(2026, 3, 2).unwrap();
        assert!(is_past_due(InvoiceStatus::Sent, due, after));
        assert!(!is_past_due(InvoiceStatus::Sent, due, due));
        assert!(!is_past_due(InvoiceStatus::Draft, due, after));
    }

    #[test]
    fn invoice_number_format() {
        let d = Date::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(format_invoice_number(d, 42), "INV-2026-00042");
        assert_eq!(format_invoice_number(d, 123_456), "INV-2026-123456");
    }
}
