//! Best-effort email notifications.
//!
//! Delivery failures are reported to the caller but never affect request
//! handling; jobs count them and move on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use common::metrics::EMAILS_TOTAL;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay error: {0}")]
    Relay(String),
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}

/// Send and record the outcome in metrics.
pub async fn deliver(mailer: &dyn Mailer, email: &Email) -> Result<(), NotifyError> {
    let res = mailer.send(email).await;
    let outcome = if res.is_ok() { "sent" } else { "failed" };
    EMAILS_TOTAL.with_label_values(&[outcome]).inc();
    res
}

/// Writes emails to the log only.
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self { Self { sender: sender.into() } }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        info!(from = %self.sender, to = %email.to, subject = %email.subject, "email");
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    #[serde(flatten)]
    email: &'a Email,
}

/// POSTs each email as JSON to an HTTP relay.
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
    sender: String,
}

impl WebhookMailer {
    pub fn new(url: impl Into<String>, sender: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, url: url.into(), sender: sender.into() })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&RelayPayload { from: &self.sender, email })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(NotifyError::Relay(format!("relay answered {}", resp.status())));
        }
        Ok(())
    }
}

pub fn mailer_from_config(cfg: &configs::MailConfig) -> Result<Arc<dyn Mailer>, NotifyError> {
    match cfg.relay_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Ok(Arc::new(WebhookMailer::new(url, cfg.sender.clone())?)),
        None => Ok(Arc::new(LogMailer::new(cfg.sender.clone()))),
    }
}

pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Keeps every delivered email; recipients in `failing` always error.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<Email>>,
        failing: Mutex<HashSet<String>>,
    }

    impl RecordingMailer {
        pub fn fail_for(&self, to: &str) { self.failing.lock().unwrap().insert(to.to_string()); }

        pub fn sent(&self) -> Vec<Email> { self.sent.lock().unwrap().clone() }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &Email) -> Result<(), NotifyError> {
            if self.failing.lock().unwrap().contains(&email.to) {
                return Err(NotifyError::Relay(format!("refused {}", email.to)));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::RecordingMailer;
    use super::*;

    fn email(to: &str) -> Email {
        Email { to: to.into(), subject: "Hello".into(), body: "Body".into() }
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert!(LogMailer::new("noreply@test").send(&email("a@test")).await.is_ok());
    }

    #[tokio::test]
    async fn recording_mailer_injects_failures() {
        let m = RecordingMailer::default();
        m.fail_for("bad@test");
        assert!(deliver(&m, &email("good@test")).await.is_ok());
        assert!(deliver(&m, &email("bad@test")).await.is_err());
        assert_eq!(m.sent(), vec![email("good@test")]);
    }

    #[test]
    fn relay_url_selects_webhook() {
        let cfg = configs::MailConfig { sender: "x@test".into(), relay_url: None };
        assert!(mailer_from_config(&cfg).is_ok());
        let cfg = configs::MailConfig { sender: "x@test".into(), relay_url: Some("http://127.0.0.1:9/mail".into()) };
        assert!(mailer_from_config(&cfg).is_ok());
    }

    #[test]
    fn relay_payload_is_flat() {
        let e = email("a@test");
        let v = serde_json::to_value(RelayPayload { from: "x@test", email: &e }).unwrap();
        assert_eq!(v["from"], "x@test");
        assert_eq!(v["to"], "a@test");
    }
}
