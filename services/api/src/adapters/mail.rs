//! services/api/src/adapters/mail.rs
//!
//! Outbound mail adapters implementing the `MailService` port. No SMTP transport
//! is wired in: production mail is handed to `tracing`, and tests read an outbox.

use async_trait::async_trait;
use memory_wall_core::ports::{MailService, PortResult};
use std::sync::Mutex;
use tracing::info;

/// Logs every outbound message.
#[derive(Clone, Default)]
pub struct TracingMailer;

#[async_trait]
impl MailService for TracingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()> {
        info!(to, subject, body, "Outbound mail");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every message in memory, newest last.
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<SentMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// The `token=` value of the newest message sent to `to`.
    pub fn latest_token(&self, to: &str) -> Option<String> {
        let messages = self.messages();
        let mail = messages.iter().rev().find(|m| m.to == to)?;
        let (_, rest) = mail.body.split_once("token=")?;
        let token: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
        (!token.is_empty()).then_some(token)
    }
}

#[async_trait]
impl MailService for OutboxMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }
        Ok(())
    }
}
