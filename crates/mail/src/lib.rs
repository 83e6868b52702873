//! Transactional email for Imprint.
//!
//! [`templates`] renders the two notices the system sends (proof correction
//! requests and issued invoices) into [`OutgoingEmail`] values; a [`Mailer`]
//! delivers them. [`SmtpMailer`] talks to a real relay; [`LogMailer`] is used
//! when SMTP is not configured and only records the attempt in the log.

pub mod config;
pub mod error;
pub mod mailer;
pub mod templates;

pub use config::EmailConfig;
pub use error::MailError;
pub use mailer::{LogMailer, Mailer, SmtpMailer};
pub use templates::OutgoingEmail;
