//! Outbound delivery via lettre's SMTP transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::MailConfig;
use crate::error::MailError;
use crate::mail::MailSender;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP-backed mail sender.
pub struct SmtpMailSender {
    config: MailConfig,
}

impl SmtpMailSender {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn send_blocking(config: &MailConfig, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| MailError::Send(format!("SMTP relay error: {e}")))?
            .port(config.smtp_port)
            .credentials(creds)
            .timeout(Some(SEND_TIMEOUT))
            .build();

        let email = Message::builder()
            .from(
                config
                    .from_address
                    .parse()
                    .map_err(|e| MailError::Send(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| MailError::Send(format!("invalid to address: {e}")))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| MailError::Send(format!("failed to build message: {e}")))?;

        transport
            .send(&email)
            .map_err(|e| MailError::Send(format!("SMTP send failed: {e}")))?;

        info!(to, subject, "Reply sent");
        Ok(())
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let config = self.config.clone();
        let (to, subject, body) = (to.to_string(), subject.to_string(), body.to_string());
        tokio::task::spawn_blocking(move || Self::send_blocking(&config, &to, &subject, &body))
            .await
            .map_err(|e| MailError::Send(format!("send task panicked: {e}")))?
    }
}
