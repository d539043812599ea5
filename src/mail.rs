use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::SmtpConfig;

const GMAIL_RELAY: &str = "smtp.gmail.com";

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Checks the relay is reachable and accepts our credentials.
    async fn verify(&self) -> anyhow::Result<()>;
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(cfg.user.clone(), cfg.pass.clone());
        let transport = if uses_gmail(&cfg.host) {
            AsyncSmtpTransport::<Tokio1Executor>::relay(GMAIL_RELAY)
                .context("gmail relay")?
                .credentials(creds)
                .build()
        } else if uses_implicit_tls(cfg.port) {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
                .with_context(|| format!("smtp relay {}", cfg.host))?
                .port(cfg.port)
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
                .with_context(|| format!("smtp relay {}", cfg.host))?
                .port(cfg.port)
                .credentials(creds)
                .build()
        };
        Ok(Self {
            transport,
            from: cfg.from.clone(),
        })
    }
}

/// Gmail gets its own implicit-TLS relay; other hosts pick TLS mode from the port.
pub fn uses_gmail(host: &str) -> bool {
    host.contains("gmail")
}

/// Port 465 is SMTPS: TLS from the first byte rather than a STARTTLS upgrade.
pub fn uses_implicit_tls(port: u16) -> bool {
    port == 465
}

pub fn build_message(from: &str, to: &str, subject: &str, html: &str) -> anyhow::Result<Message> {
    Message::builder()
        .from(from.parse().context("parse from address")?)
        .to(to.parse().context("parse recipient address")?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html.to_string())
        .context("build email")
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self) -> anyhow::Result<()> {
        let ok = self.transport.test_connection().await.context("smtp verify")?;
        anyhow::ensure!(ok, "smtp server rejected connection test");
        Ok(())
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let email = build_message(&self.from, to, subject, html)?;
        self.transport.send(email).await.context("smtp send")?;
        info!(to, "email sent");
        Ok(())
    }
}

/// Used when no SMTP host is configured: the message goes to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn verify(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        warn!(to, subject, body = html, "SMTP not configured; email not delivered");
        Ok(())
    }
}

pub fn reset_email_html(link: &str, ttl_minutes: i64) -> String {
    format!(
        "<p>You requested a password reset.</p>\
         <p><a href=\"{link}\">Click here to choose a new password</a></p>\
         <p>This link expires in {ttl_minutes} minutes. If you did not ask for it, ignore this email.</p>"
    )
}
