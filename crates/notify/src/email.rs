//! SMTP email notifier via `lettre` with TLS support.
//!
//! Delivers notifications as emails through an SMTP server.
//! Supports STARTTLS and implicit TLS connections. Unlike a fixed-recipient
//! alert channel, the recipient comes from each message: every subscription
//! delivers to its own user.

use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use nudge_core::config::SmtpConfig;

use crate::traits::{Email, Notifier, NotifyError};

/// Sends notifications as emails via SMTP.
pub struct EmailNotifier {
    /// Async SMTP transport for sending emails.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Sender mailbox.
    from: Mailbox,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP configuration.
    ///
    /// Port 465 and TLS-enabled ports use the STARTTLS relay; anything else
    /// connects in plaintext. Credentials are attached when both username
    /// and password are configured.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let mut builder = if config.port == 465 || config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .body(email.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            to = %email.to,
            subject = %email.subject,
            "notification delivered"
        );

        Ok(())
    }

    /// Returns `"email"`.
    fn channel_name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config(from: &str, port: u16, tls: bool) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port,
            tls,
            from: from.to_string(),
            username: None,
            password: None,
        }
    }

    #[test]
    fn parse_valid_email_address() {
        let mailbox: Result<Mailbox, _> = "pat@example.com".parse();
        assert!(mailbox.is_ok());
    }

    #[test]
    fn parse_email_with_display_name() {
        let mailbox: Mailbox = "Pat <pat@example.com>".parse().unwrap();
        assert_eq!(mailbox.email.to_string(), "pat@example.com");
    }

    #[test]
    fn from_config_valid() {
        let notifier = EmailNotifier::from_config(&smtp_config("reminders@example.com", 587, true));
        assert!(notifier.is_ok());
    }

    #[test]
    fn from_config_invalid_from_address() {
        let result = EmailNotifier::from_config(&smtp_config("bad-address", 587, true));
        assert!(result.is_err());
        let err = result.err().unwrap().to_string();
        assert!(err.contains("Configuration error"), "got: {err}");
    }

    #[test]
    fn from_config_implicit_tls_port() {
        let notifier = EmailNotifier::from_config(&smtp_config("reminders@example.com", 465, false));
        assert!(notifier.is_ok());
    }

    #[test]
    fn from_config_no_tls() {
        let notifier = EmailNotifier::from_config(&smtp_config("reminders@example.com", 25, false));
        assert!(notifier.is_ok());
    }

    #[test]
    fn channel_name_is_email() {
        let notifier =
            EmailNotifier::from_config(&smtp_config("reminders@example.com", 587, true)).unwrap();
        assert_eq!(notifier.channel_name(), "email");
    }
}
