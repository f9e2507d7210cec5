//! # Mailer
//!
//! Welcome email delivery. Sending happens on a background task, never on
//! the request path; the mock variant records messages so tests can assert
//! on delivery without an SMTP server.

use std::sync::Mutex;
use std::time::Duration;

use lettre::message::{header::ContentType, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use thiserror::Error;

/// Mail delivery failure
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("could not send email: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A composed email, before transport concerns
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
}

/// The registration welcome email
pub fn welcome_email(to: &str, name: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Welcome to reelbase!".to_string(),
        plain_body: format!(
            "Hi {},\n\nThanks for signing up for a reelbase account. We're excited \
             to have you on board!\n\nThe reelbase team\n",
            name
        ),
        html_body: format!(
            "<html><body><p>Hi {},</p><p>Thanks for signing up for a reelbase \
             account. We're excited to have you on board!</p><p>The reelbase \
             team</p></body></html>",
            name
        ),
    }
}

/// Email sender, injected into the application state
pub enum Mailer {
    /// Real SMTP delivery
    Smtp(SmtpMailer),
    /// Records messages instead of sending them
    Mock(MockMailer),
}

impl Mailer {
    pub async fn send(&self, email: Email) -> Result<(), MailError> {
        match self {
            Mailer::Smtp(smtp) => smtp.send(email).await,
            Mailer::Mock(mock) => {
                mock.record(email);
                Ok(())
            }
        }
    }
}

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1025,
            username: String::new(),
            password: String::new(),
            sender: "reelbase <no-reply@reelbase.local>".to_string(),
        }
    }
}

/// Async SMTP delivery via lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpMailer {
    /// Build a transport with a short dial timeout. Without credentials the
    /// connection stays plaintext (local development relays).
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
        };

        Ok(Self {
            transport: builder
                .port(config.port)
                .timeout(Some(Duration::from_secs(5)))
                .build(),
            sender: config.sender.clone(),
        })
    }

    async fn send(&self, email: Email) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.sender.parse()?)
            .to(email.to.parse()?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body),
                    ),
            )?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Recording mailer for tests
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Mutex<Vec<Email>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, email: Email) {
        self.sent.lock().unwrap().push(email);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// True if a message was recorded for `recipient`
    pub fn sent_to(&self, recipient: &str) -> bool {
        self.sent.lock().unwrap().iter().any(|e| e.to == recipient)
    }
}
