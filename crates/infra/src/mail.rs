//! Outbound email.
//!
//! Delivery sits behind [`Mailer`] so the service is configured once at
//! startup. [`SmtpMailer`] delivers through an SMTP relay with `lettre`;
//! [`TracingMailer`] writes messages to the log (development only);
//! [`InMemoryMailer`] keeps an outbox that tests can inspect.

use std::sync::RwLock;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("invalid mail address {0}")]
    Address(String),

    #[error("mail transport setup failed: {0}")]
    Transport(String),

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Account verification mail for `to`, linking to `verify_url`.
pub fn verification_email(from: &str, to: &str, name: &str, verify_url: &str) -> EmailMessage {
    let html_name = escape_html(name);
    let html_url = escape_html(verify_url);
    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Verify your ByteBasket account".to_string(),
        text_body: format!(
            "Hi {name},\n\nThanks for joining ByteBasket. Confirm your email address by opening the link below:\n\n{verify_url}\n\nIf you did not create an account you can ignore this message.\n"
        ),
        html_body: format!(
            "<p>Hi {html_name},</p>\
             <p>Thanks for joining ByteBasket. Confirm your email address by clicking the link below:</p>\
             <p><a href=\"{html_url}\">Verify my email</a></p>\
             <p>If you did not create an account you can ignore this message.</p>"
        ),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// How the SMTP connection is secured.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS from the first byte.
    Tls,
    /// Plain connection upgraded with STARTTLS.
    StartTls,
    /// Unencrypted. Only for local relays.
    None,
}

impl SmtpSecurity {
    /// Implicit TLS on 465, STARTTLS everywhere else.
    pub fn for_port(port: u16) -> Self {
        if port == 465 {
            SmtpSecurity::Tls
        } else {
            SmtpSecurity::StartTls
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown SMTP security '{0}' (expected tls, starttls or none)")]
pub struct UnknownSmtpSecurity(pub String);

impl core::str::FromStr for SmtpSecurity {
    type Err = UnknownSmtpSecurity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(SmtpSecurity::Tls),
            "starttls" => Ok(SmtpSecurity::StartTls),
            "none" | "plain" => Ok(SmtpSecurity::None),
            _ => Err(UnknownSmtpSecurity(s.to_string())),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub credentials: Option<SmtpCredentials>,
}

/// Delivers through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Builds the transport. No connection is opened until the first send.
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let builder = match settings.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host),
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            }
            SmtpSecurity::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                settings.host.as_str(),
            )),
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        let mut builder = builder.port(settings.port);
        if let Some(creds) = &settings.credentials {
            builder = builder.credentials(Credentials::new(
                creds.username.clone(),
                creds.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let to = message.to.clone();
        let email = build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        info!(to = %to, "email delivered");
        Ok(())
    }
}

/// Multipart (plain text + HTML) message ready for the SMTP transport.
fn build_message(message: EmailMessage) -> Result<Message, MailError> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|e| MailError::Address(format!("'{}': {e}", message.from)))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| MailError::Address(format!("'{}': {e}", message.to)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject)
        .multipart(MultiPart::alternative_plain_html(
            message.text_body,
            message.html_body,
        ))
        .map_err(|e| MailError::Delivery(e.to_string()))
}

/// Logs each message, body included, instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

#[async_trait::async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.text_body,
            "email not delivered (no SMTP relay configured)"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMailer {
    outbox: RwLock<Vec<EmailMessage>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.read().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.outbox
            .write()
            .map_err(|_| MailError::Delivery("outbox lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_links_token() {
        let url = "http://localhost:8080/api/auth/verify-email?token=abc123";
        let msg = verification_email("no-reply@bytebasket.local", "pat@example.org", "Pat", url);

        assert_eq!(msg.to, "pat@example.org");
        assert!(msg.text_body.contains(url));
        assert!(msg.html_body.contains("token=abc123"));
    }

    #[test]
    fn names_are_escaped_in_html() {
        let msg = verification_email("a@b.c", "x@y.z", "<script>", "http://x/?a=1&b=2");
        assert!(msg.html_body.contains("&lt;script&gt;"));
        assert!(msg.html_body.contains("a=1&amp;b=2"));
    }

    #[test]
    fn smtp_security_parses_and_defaults_by_port() {
        assert_eq!("STARTTLS".parse::<SmtpSecurity>(), Ok(SmtpSecurity::StartTls));
        assert_eq!("ssl".parse::<SmtpSecurity>(), Ok(SmtpSecurity::Tls));
        assert_eq!("none".parse::<SmtpSecurity>(), Ok(SmtpSecurity::None));
        assert!("carrier-pigeon".parse::<SmtpSecurity>().is_err());

        assert_eq!(SmtpSecurity::for_port(465), SmtpSecurity::Tls);
        assert_eq!(SmtpSecurity::for_port(587), SmtpSecurity::StartTls);
    }

    #[test]
    fn smtp_password_is_redacted() {
        let creds = SmtpCredentials {
            username: "mailer".to_string(),
            password: "hunter22".to_string(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("mailer"));
        assert!(!debug.contains("hunter22"));
    }

    #[test]
    fn smtp_message_is_multipart() {
        let msg = verification_email("no-reply@bytebasket.local", "pat@example.org", "Pat", "http://x/?token=t1");
        let formatted = String::from_utf8(build_message(msg).unwrap().formatted()).unwrap();

        assert!(formatted.contains("Subject: Verify your ByteBasket account"));
        assert!(formatted.contains("To: pat@example.org"));
        assert!(formatted.contains("multipart/alternative"));
    }

    #[test]
    fn smtp_message_rejects_bad_addresses() {
        let msg = verification_email("no-reply@bytebasket.local", "not an address", "Pat", "http://x");
        assert!(matches!(build_message(msg), Err(MailError::Address(_))));
    }

    #[test]
    fn smtp_mailer_builds_without_connecting() {
        let settings = SmtpSettings {
            host: "localhost".to_string(),
            port: 1025,
            security: SmtpSecurity::None,
            credentials: None,
        };
        assert!(SmtpMailer::new(&settings).is_ok());
    }

    #[tokio::test]
    async fn in_memory_mailer_records_messages() {
        let mailer = InMemoryMailer::new();
        mailer
            .send(verification_email("a@b.c", "x@y.z", "X", "http://x"))
            .await
            .unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }
}
