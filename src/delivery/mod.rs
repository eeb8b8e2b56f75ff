//! Emailing generated reports as PDF attachments.

pub mod mailer;
pub mod pdf;

pub use mailer::{parse_recipient, ReportMailer};
pub use pdf::render_report_pdf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    #[error("failed to render report PDF: {0}")]
    Pdf(String),

    #[error("failed to compose email: {0}")]
    Compose(String),

    #[error("Failed to send email through SMTP server: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to write email to outbox: {0}")]
    Outbox(#[from] lettre::transport::file::Error),
}
