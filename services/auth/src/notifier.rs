//! Outbound notifications
//!
//! The OTP workflow hands codes to a [`Notifier`]. Deployments use SMTP via
//! `lettre`; without `SMTP_HOST` the service falls back to a notifier that
//! only logs that a message would have been sent.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use tracing::info;

/// Default SMTP port (STARTTLS)
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set
const DEFAULT_FROM_ADDRESS: &str = "no-reply@example.com";

/// Error type for notification delivery failures
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// SMTP transport-level failure (authentication, connection, etc.)
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled
    #[error("Email build error: {0}")]
    Build(String),

    /// Delivery was refused for another reason
    #[error("Notification not sent: {0}")]
    Send(String),
}

/// Outbound message channel
pub trait Notifier: Clone + Send + Sync + 'static {
    /// Deliver a plain-text message; failures propagate to the caller
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifierError>> + Send;
}

/// Configuration for the SMTP notifier
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port (defaults to 587)
    pub smtp_port: u16,
    /// RFC 5322 "From" address
    pub from_address: String,
    /// Optional SMTP username
    pub smtp_user: Option<String>,
    /// Optional SMTP password
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default                 |
    /// |-----------------|----------|-------------------------|
    /// | `SMTP_HOST`     | yes      |                         |
    /// | `SMTP_PORT`     | no       | `587`                   |
    /// | `SMTP_FROM`     | no       | `no-reply@example.com`  |
    /// | `SMTP_USER`     | no       |                         |
    /// | `SMTP_PASSWORD` | no       |                         |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

/// Email notifier used by the service binary
#[derive(Clone)]
pub enum EmailNotifier {
    /// Delivers over SMTP
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from_address: String,
    },
    /// Logs the recipient and subject, never the body
    Log,
}

impl EmailNotifier {
    /// SMTP notifier if configured, otherwise the logging fallback
    pub fn from_config(config: Option<EmailConfig>) -> Result<Self, NotifierError> {
        let Some(config) = config else {
            info!("SMTP_HOST not set, outbound email will only be logged");
            return Ok(EmailNotifier::Log);
        };

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        info!(
            "SMTP notifier configured for {}:{}",
            config.smtp_host, config.smtp_port
        );
        Ok(EmailNotifier::Smtp {
            transport: transport_builder.build(),
            from_address: config.from_address,
        })
    }
}

impl Notifier for EmailNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifierError> {
        match self {
            EmailNotifier::Smtp {
                transport,
                from_address,
            } => {
                let email = Message::builder()
                    .from(from_address.parse()?)
                    .to(to.parse()?)
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(body.to_string())
                    .map_err(|e| NotifierError::Build(e.to_string()))?;

                transport.send(email).await?;
                info!(to = to, subject = subject, "Email sent");
            }
            EmailNotifier::Log => {
                info!(to = to, subject = subject, "Email delivery skipped (no SMTP configured)");
            }
        }
        Ok(())
    }
}
