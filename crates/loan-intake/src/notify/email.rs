use std::sync::Arc;

use async_trait::async_trait;

use super::NotificationPayload;
use crate::config::MailConfig;
use crate::i18n::TranslationStore;

const EMAIL_NAMESPACE: &str = "emails";

/// A composed plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// Rejects CR/LF in header fields to prevent header injection.
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, MailError> {
        let to = to.into();
        let subject = subject.into();
        if to.contains(is_line_break) {
            return Err(MailError::InvalidHeader("to"));
        }
        if subject.contains(is_line_break) {
            return Err(MailError::InvalidHeader("subject"));
        }
        Ok(Self {
            to,
            subject,
            body: body.into(),
        })
    }
}

fn is_line_break(c: char) -> bool {
    c == '\r' || c == '\n'
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email {0} contains invalid characters")]
    InvalidHeader(&'static str),
    #[error("invalid mailbox '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("smtp delivery failed: {0}")]
    Transport(String),
}

/// Delivery seam for composed messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// SMTP delivery via `lettre`. Without a configured host, messages are logged and skipped.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[tracing::instrument(skip(self, message), fields(to = %message.to), err)]
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        use lettre::message::Mailbox;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

        let Some(smtp_host) = self.config.smtp_host.as_deref() else {
            tracing::warn!(subject = %message.subject, "SMTP not configured, email not sent");
            return Ok(());
        };

        let from: Mailbox = self
            .config
            .smtp_from
            .parse()
            .map_err(|err: lettre::address::AddressError| MailError::InvalidAddress {
                address: self.config.smtp_from.clone(),
                reason: err.to_string(),
            })?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|err: lettre::address::AddressError| MailError::InvalidAddress {
                address: message.to.clone(),
                reason: err.to_string(),
            })?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .body(message.body.clone())
            .map_err(|err| MailError::Build(err.to_string()))?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
            .map_err(|err| MailError::Transport(err.to_string()))?
            .port(self.config.smtp_port);
        if let Some(username) = &self.config.smtp_username {
            let password = self.config.smtp_password.clone().unwrap_or_default();
            transport = transport.credentials(Credentials::new(username.clone(), password));
        }

        transport
            .build()
            .send(email)
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        tracing::info!(subject = %message.subject, "email sent");
        Ok(())
    }
}

/// Builds the admin and applicant messages, localizing the applicant copy.
#[derive(Debug, Clone)]
pub struct EmailComposer {
    translations: Arc<TranslationStore>,
    admin_email: String,
}

impl EmailComposer {
    pub fn new(translations: Arc<TranslationStore>, admin_email: impl Into<String>) -> Self {
        Self {
            translations,
            admin_email: admin_email.into(),
        }
    }

    pub fn admin_notification(&self, payload: &NotificationPayload) -> Result<EmailMessage, MailError> {
        let subject = format!("New loan application {}", payload.application_id);
        let body = format!(
            "A new loan application was submitted.\n\n\
             Application: {}\n\
             Applicant: {} <{}>\n\
             Amount: {}\n\
             Submitted: {}\n\
             Stored until: {}\n",
            payload.application_id,
            payload.applicant_name,
            payload.applicant_email,
            format_amount(payload),
            payload.submitted_at.to_rfc3339(),
            payload.expires_at.to_rfc3339(),
        );
        EmailMessage::new(self.admin_email.clone(), subject, body)
    }

    pub fn application_confirmation(
        &self,
        payload: &NotificationPayload,
    ) -> Result<EmailMessage, MailError> {
        let locale = payload
            .locale
            .as_deref()
            .unwrap_or_else(|| self.translations.default_locale());
        let amount = format_amount(payload);
        let params = [
            ("name", payload.applicant_name.as_str()),
            ("applicationId", payload.application_id.as_str()),
            ("amount", amount.as_str()),
        ];

        let subject = self.localized(
            locale,
            "confirmation.subject",
            &params,
            "We received your loan application",
        );
        let body = self.localized(
            locale,
            "confirmation.body",
            &params,
            &format!(
                "Hello {},\n\nThank you for applying. Your reference is {}.\n\
                 We will review your request for {} and contact you shortly.\n",
                payload.applicant_name, payload.application_id, amount
            ),
        );

        EmailMessage::new(payload.applicant_email.clone(), subject, body)
    }

    /// The store hands back the key when a translation is missing.
    fn localized(&self, locale: &str, key: &str, params: &[(&str, &str)], fallback: &str) -> String {
        let text = self
            .translations
            .translate(locale, EMAIL_NAMESPACE, key, params);
        if text == key {
            fallback.to_string()
        } else {
            text
        }
    }
}

fn format_amount(payload: &NotificationPayload) -> String {
    match &payload.currency {
        Some(currency) => format!("{:.2} {currency}", payload.loan_amount),
        None => format!("{:.2}", payload.loan_amount),
    }
}
