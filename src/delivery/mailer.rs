use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::AppConfig;

use super::DeliveryError;

const REPORT_SUBJECT: &str = "Your Executive Churn Report";
const REPORT_FILENAME: &str = "churn_report.pdf";
const REPORT_BODY: &str = "Hello,\n\nPlease find attached the executive churn report generated from your latest analysis.\n\nChurnLens";

enum MailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Outbox(AsyncFileTransport<Tokio1Executor>),
}

/// Sends rendered reports over SMTP, or drops them as `.eml` files into an
/// outbox directory for local development.
pub struct ReportMailer {
    transport: MailTransport,
    from: Mailbox,
}

pub fn parse_recipient(address: &str) -> Result<Mailbox, DeliveryError> {
    Ok(address.trim().parse::<Mailbox>()?)
}

impl ReportMailer {
    /// Mailer for the configured transport. SMTP wins over the outbox; with
    /// neither configured there is no mailer.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, DeliveryError> {
        let from: Mailbox = config.email_from.parse()?;

        if let Some(host) = &config.smtp_host {
            let builder = if config.smtp_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            } else {
                tracing::warn!("SMTP STARTTLS is disabled; report emails travel in clear text");
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            };

            let mut builder = builder.port(config.smtp_port);
            if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
                builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
            }

            return Ok(Some(Self {
                transport: MailTransport::Smtp(builder.build()),
                from,
            }));
        }

        if let Some(dir) = &config.email_outbox_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| DeliveryError::Compose(format!("create outbox {}: {e}", dir.display())))?;
            return Ok(Some(Self::outbox(dir, from)));
        }

        Ok(None)
    }

    pub fn outbox(dir: &Path, from: Mailbox) -> Self {
        Self {
            transport: MailTransport::Outbox(AsyncFileTransport::<Tokio1Executor>::new(dir)),
            from,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self.transport {
            MailTransport::Smtp(_) => "smtp",
            MailTransport::Outbox(_) => "outbox",
        }
    }

    fn compose(&self, to: Mailbox, pdf: Vec<u8>) -> Result<Message, DeliveryError> {
        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| DeliveryError::Compose(e.to_string()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(REPORT_SUBJECT)
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(REPORT_BODY.to_string()),
                    )
                    .singlepart(Attachment::new(REPORT_FILENAME.to_string()).body(pdf, pdf_type)),
            )
            .map_err(|e| DeliveryError::Compose(e.to_string()))
    }

    pub async fn send_report(&self, to: Mailbox, pdf: Vec<u8>) -> Result<(), DeliveryError> {
        let recipient = to.email.to_string();
        let message = self.compose(to, pdf)?;

        match &self.transport {
            MailTransport::Smtp(smtp) => {
                smtp.send(message).await?;
            }
            MailTransport::Outbox(outbox) => {
                outbox.send(message).await?;
            }
        }

        tracing::info!(to = %recipient, transport = self.describe(), "Churn report emailed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Mailbox {
        "ChurnLens <reports@churnlens.local>".parse().unwrap()
    }

    #[test]
    fn test_recipient_validation() {
        assert!(parse_recipient(" ops@example.com ").is_ok());
        assert!(matches!(
            parse_recipient("not-an-address"),
            Err(DeliveryError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_outbox_receives_pdf_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = ReportMailer::outbox(dir.path(), sender());

        mailer
            .send_report(parse_recipient("ops@example.com").unwrap(), b"%PDF-1.3 test".to_vec())
            .await
            .unwrap();

        let emails: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "eml"))
            .collect();
        assert_eq!(emails.len(), 1);

        let raw = std::fs::read_to_string(&emails[0]).unwrap();
        assert!(raw.contains("To: ops@example.com"));
        assert!(raw.contains(REPORT_FILENAME));
        assert!(raw.contains("application/pdf"));
    }
}
