//! SMTP adapter for the alert mailer, built on lettre's async transport.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::{self, HeaderName, HeaderValue};
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Mailer;

pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(mailer: AsyncSmtpTransport<Tokio1Executor>, from: Mailbox) -> Self {
        Self { mailer, from }
    }

    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr = std::env::var("ALERT_EMAIL_FROM").context("ALERT_EMAIL_FROM missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid ALERT_EMAIL_FROM")?;
        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let to: Mailbox = to.parse().context("invalid recipient address")?;

        let mut msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .context("build alert email")?;

        // Priority headers so guardian mail clients flag the alert.
        msg.headers_mut().insert_raw(HeaderValue::new(
            HeaderName::new_from_ascii_str("X-Priority"),
            "1".to_string(),
        ));
        msg.headers_mut().insert_raw(HeaderValue::new(
            HeaderName::new_from_ascii_str("Importance"),
            "high".to_string(),
        ));

        self.mailer.send(msg).await.context("send alert email")?;
        Ok(())
    }
}
