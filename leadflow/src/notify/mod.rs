//! Notification dispatch: best-effort welcome email.
//!
//! Registration hands the dispatch off as a detached task; a delivery
//! failure is logged and discarded, it never surfaces to the registrant and
//! never rolls back the created account.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::info;
use thiserror::Error;

/// Notification errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Outbound mail relay client
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build a mailer from environment variables, or `None` when the relay
    /// is not configured (email is then skipped entirely).
    ///
    /// Expected environment variables:
    /// - `SMTP_HOST`: mail relay hostname (required)
    /// - `EMAIL_FROM`: sender address, e.g. `LeadFlow <no-reply@example.com>` (required)
    /// - `SMTP_USERNAME` / `SMTP_PASSWORD`: relay credentials (optional)
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        let from: Mailbox = std::env::var("EMAIL_FROM").ok()?.parse().ok()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&host).ok()?;
        if let (Ok(username), Ok(password)) = (
            std::env::var("SMTP_USERNAME"),
            std::env::var("SMTP_PASSWORD"),
        ) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Some(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Send the welcome email pointing at the download link.
    pub async fn send_welcome_email(
        &self,
        to: &str,
        name: &str,
        file_topic: &str,
        download_url: &str,
    ) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(format!("Download Ready: {file_topic} - LeadFlow"))
            .header(ContentType::TEXT_HTML)
            .body(welcome_email_html(name, file_topic, download_url))?;

        self.transport.send(message).await?;
        info!("Welcome email sent to {to}");
        Ok(())
    }
}

/// Render the welcome email body.
fn welcome_email_html(name: &str, file_topic: &str, download_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; color: #333;">
  <h1>Welcome to LeadFlow!</h1>
  <p>Hello {name},</p>
  <p>Thank you for registering with LeadFlow. Your file is ready to download.</p>
  <p><strong>File:</strong> {file_topic}</p>
  <p><a href="{download_url}" style="display:inline-block;padding:12px 28px;background:#764ba2;color:#fff;text-decoration:none;border-radius:6px;">Download Your File Now</a></p>
  <p style="font-size:13px;color:#666;">You can also access the file anytime from your LeadFlow account.</p>
  <p>The LeadFlow Team</p>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_email_contains_name_topic_and_link() {
        let html = welcome_email_html("Rahim", "Rust Notes", "https://leads.example.com/download/7");
        assert!(html.contains("Hello Rahim"));
        assert!(html.contains("Rust Notes"));
        assert!(html.contains("https://leads.example.com/download/7"));
    }
}
