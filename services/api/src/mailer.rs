//! Outbound mail
//!
//! Only password reset links are mailed. When no SMTP host is configured
//! the service still starts, and sending fails with an explanatory error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::env;
use tracing::info;

/// Something able to deliver a plain-text email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// SMTP relay host
    pub host: String,
    /// SMTP relay port
    pub port: u16,
    /// Login for the relay
    pub username: String,
    /// Password for the relay
    pub password: String,
    /// Sender address
    pub from: String,
}

impl MailerConfig {
    /// Create a new MailerConfig from environment variables
    ///
    /// Returns `None` when `SMTP_HOST` is not set.
    ///
    /// # Environment Variables
    /// - `SMTP_HOST`: Relay host
    /// - `SMTP_PORT`: Relay port (default: 587)
    /// - `SMTP_USERNAME`, `SMTP_PASSWORD`: Relay credentials
    /// - `SMTP_FROM`: Sender address (default: the username)
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(host) = env::var("SMTP_HOST") else {
            return Ok(None);
        };

        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .unwrap_or(587);
        let username = env::var("SMTP_USERNAME")
            .map_err(|_| anyhow::anyhow!("SMTP_USERNAME environment variable not set"))?;
        let password = env::var("SMTP_PASSWORD")
            .map_err(|_| anyhow::anyhow!("SMTP_PASSWORD environment variable not set"))?;
        let from = env::var("SMTP_FROM").unwrap_or_else(|_| username.clone());

        Ok(Some(MailerConfig {
            host,
            port,
            username,
            password,
            from,
        }))
    }
}

/// Mailer relaying through an SMTP server
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailerConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .context("Failed to configure SMTP relay")?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("Invalid sender address: {}", config.from))?;

        info!("SMTP mailer configured for {}:{}", config.host, config.port);
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>().with_context(|| format!("Invalid recipient: {}", to))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;
        Ok(())
    }
}

/// Mailer used when no SMTP relay is configured
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<()> {
        anyhow::bail!("Outbound mail is not configured")
    }
}

/// Mailer keeping every message in memory
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<(String, String, String)>>,
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("mailer lock")
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_mailer_config_is_optional() {
        unsafe {
            env::remove_var("SMTP_HOST");
        }
        assert!(MailerConfig::from_env().unwrap().is_none());
    }

    #[test]
    #[serial]
    fn test_mailer_config_from_env() {
        unsafe {
            env::set_var("SMTP_HOST", "smtp.example.com");
            env::set_var("SMTP_USERNAME", "owner@example.com");
            env::set_var("SMTP_PASSWORD", "secret");
        }

        let config = MailerConfig::from_env().unwrap().expect("mailer config");
        assert_eq!(config.port, 587);
        assert_eq!(config.from, "owner@example.com");

        unsafe {
            env::remove_var("SMTP_HOST");
            env::remove_var("SMTP_USERNAME");
            env::remove_var("SMTP_PASSWORD");
        }
    }

    #[tokio::test]
    async fn test_disabled_mailer_fails() {
        assert!(DisabledMailer.send("a@b.c", "s", "b").await.is_err());
    }
}
