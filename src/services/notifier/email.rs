use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{error, info, warn};

use super::EmailSender;
use crate::config::SmtpConfig;
use crate::errors::{MediRemindError, Result};

const SMTP_TIMEOUT_SECS: u64 = 30;
const LOG_BODY_PREVIEW_CHARS: usize = 200;

/// SMTP（STARTTLS）发送
pub struct SmtpEmailSender {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let (Some(username), Some(password)) = (&config.username, &config.password) else {
            return Err(MediRemindError::not_configured("SMTP credentials missing"));
        };

        let from: Mailbox = config.from_email.parse().map_err(|e| {
            MediRemindError::config(format!("Invalid from_email '{}': {}", config.from_email, e))
        })?;

        let transport = SmtpTransport::starttls_relay(&config.server)
            .map_err(|e| MediRemindError::config(format!("Invalid SMTP server: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| MediRemindError::email_delivery(format!("Invalid recipient {}: {}", to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| MediRemindError::email_delivery(format!("Cannot build email: {}", e)))?;

        let transport = self.transport.clone();
        let to_owned = to.to_string();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MediRemindError::email_delivery(format!("Email task failed: {}", e)))?
            .map_err(|e| {
                error!("SMTP delivery to {} failed: {}", to_owned, e);
                MediRemindError::email_delivery(format!("Failed to send email to {}: {}", to_owned, e))
            })?;

        info!("Email sent successfully to {}", to);
        Ok(())
    }
}

/// 未配置 SMTP 时只记录日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let preview: String = html_body.chars().take(LOG_BODY_PREVIEW_CHARS).collect();
        let ellipsis = if html_body.chars().count() > LOG_BODY_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        info!(
            "[MOCK EMAIL] To: {} | Subject: {} | Body: {}{}",
            to, subject, preview, ellipsis
        );
        Ok(())
    }
}

pub fn build_email_sender(config: &SmtpConfig) -> Arc<dyn EmailSender> {
    if !config.is_configured() {
        info!("SMTP not configured, emails will be logged only");
        return Arc::new(LogEmailSender);
    }

    match SmtpEmailSender::new(config) {
        Ok(sender) => {
            info!("SMTP email delivery via {}:{}", config.server, config.port);
            Arc::new(sender)
        }
        Err(e) => {
            warn!("SMTP setup failed ({}), emails will be logged only", e);
            Arc::new(LogEmailSender)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        let sender = LogEmailSender;
        assert!(
            sender
                .send("a@b.com", "Medication Reminder: Aspirin", &"x".repeat(500))
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_smtp_sender_requires_credentials() {
        let config = SmtpConfig {
            username: None,
            password: None,
            ..SmtpConfig::default()
        };
        assert!(SmtpEmailSender::new(&config).is_err());
    }
}
