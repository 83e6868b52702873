//! Plain-text renderings of the notices Imprint sends.

use imprint_core::types::{Cents, Date};

/// A rendered email ready for a [`Mailer`](crate::Mailer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Data for the email an author receives when a proof needs changes.
#[derive(Debug, Clone)]
pub struct CorrectionNotice<'a> {
    pub publisher_name: &'a str,
    pub author_email: &'a str,
    pub author_name: &'a str,
    pub project_title: &'a str,
    pub proof_version: i32,
    pub review_notes: Option<&'a str>,
}

pub fn correction_notice(n: &CorrectionNotice<'_>) -> OutgoingEmail {
    let notes = n
        .review_notes
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("No notes were attached.");
    let greeting = greeting(n.author_name);

    OutgoingEmail {
        to: n.author_email.to_string(),
        to_name: non_empty(n.author_name),
        subject: format!(
            "[{}] Corrections requested: {} (proof v{})",
            n.publisher_name, n.project_title, n.proof_version
        ),
        body: format!(
            "{greeting}\n\n\
             The production team has reviewed proof version {version} of \"{title}\" \
             and requested corrections.\n\n\
             Notes from the reviewer:\n{notes}\n\n\
             A revised proof will follow once the changes are made.\n\n\
             {publisher}",
            version = n.proof_version,
            title = n.project_title,
            publisher = n.publisher_name,
        ),
    }
}

/// Data for the email a customer receives when an invoice is issued.
#[derive(Debug, Clone)]
pub struct InvoiceNotice<'a> {
    pub publisher_name: &'a str,
    pub customer_email: &'a str,
    pub customer_name: &'a str,
    pub invoice_number: &'a str,
    pub issue_date: Date,
    pub due_date: Date,
    pub total_cents: Cents,
    pub currency: &'a str,
}

pub fn invoice_notice(n: &InvoiceNotice<'_>) -> OutgoingEmail {
    let greeting = greeting(n.customer_name);
    let amount = format_money(n.total_cents, n.currency);

    OutgoingEmail {
        to: n.customer_email.to_string(),
        to_name: non_empty(n.customer_name),
        subject: format!("[{}] Invoice {}", n.publisher_name, n.invoice_number),
        body: format!(
            "{greeting}\n\n\
             Invoice {number} was issued on {issued} for {amount}.\n\
             Payment is due by {due}.\n\n\
             Thank you,\n{publisher}",
            number = n.invoice_number,
            issued = n.issue_date.format("%Y-%m-%d"),
            due = n.due_date.format("%Y-%m-%d"),
            publisher = n.publisher_name,
        ),
    }
}

/// Render minor units as `CUR 1,234.56`.
pub fn format_money(cents: Cents, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{currency} {sign}{grouped}.{:02}", abs % 100)
}

fn greeting(name: &str) -> String {
    match non_empty(name) {
        Some(name) => format!("Hello {name},"),
        None => "Hello,".to_string(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(0, "USD"), "USD 0.00");
        assert_eq!(format_money(7_033, "USD"), "USD 70.33");
        assert_eq!(format_money(123_456_789, "EUR"), "EUR 1,234,567.89");
        assert_eq!(format_money(-250, "USD"), "USD -2.50");
    }

    #[test]
    fn correction_notice_includes_notes_and_version() {
        let email = correction_notice(&CorrectionNotice {
            publisher_name: "Harbor Press",
            author_email: "ada@example.com",
            author_name: "Ada Author",
            project_title: "The Long Tide",
            proof_version: 3,
            review_notes: Some("Fix the widows on p. 12"),
        });
        assert_eq!(email.to, "ada@example.com");
        assert_eq!(email.to_name.as_deref(), Some("Ada Author"));
        assert!(email.subject.contains("proof v3"));
        assert!(email.body.starts_with("Hello Ada Author,"));
        assert!(email.body.contains("Fix the widows on p. 12"));
    }

    #[test]
    fn correction_notice_without_notes_or_name() {
        let email = correction_notice(&CorrectionNotice {
            publisher_name: "Harbor Press",
            author_email: "ada@example.com",
            author_name: "  ",
            project_title: "The Long Tide",
            proof_version: 1,
            review_notes: Some("   "),
        });
        assert_eq!(email.to_name, None);
        assert!(email.body.starts_with("Hello,"));
        assert!(email.body.contains("No notes were attached."));
    }

    #[test]
    fn invoice_notice_renders_amount_and_dates() {
        let email = invoice_notice(&InvoiceNotice {
            publisher_name: "Harbor Press",
            customer_email: "books@shop.example",
            customer_name: "Corner Books",
            invoice_number: "INV-2026-00042",
            issue_date: Date::from_ymd_opt(2026, 3, 1).unwrap(),
            due_date: Date::from_ymd_opt(2026, 3, 31).unwrap(),
            total_cents: 123_400,
            currency: "USD",
        });
        assert_eq!(email.subject, "[Harbor Press] Invoice INV-2026-00042");
        assert!(email.body.contains("USD 1,234.00"));
        assert!(email.body.contains("due by 2026-03-31"));
    }
}
