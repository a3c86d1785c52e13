use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::Message;
use lettre::SmtpTransport;
use lettre::Transport;

use crate::config::MailConfig;
use crate::domain::errors::MailError;
use crate::domain::ports::MailTransport;

/// SMTP-backed mail transport.
///
/// The underlying client is synchronous, so sends run on the blocking
/// thread pool and never stall the async runtime.
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a relay transport from the mail configuration.
    ///
    /// # Errors
    /// * `Transport` - Relay setup failed or the sender address is invalid
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(credentials)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Transport(e.to_string()))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP transport initialized");

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Transport(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        match result {
            Ok(_) => {
                tracing::debug!(to = %recipient, "Mail handed to SMTP relay");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %recipient, "Failed to send mail");
                Err(MailError::Transport(e.to_string()))
            }
        }
    }
}
