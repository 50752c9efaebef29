//! services/api/src/adapters/mail.rs
//!
//! This module contains the adapter for outbound email. It implements the
//! `MailService` port from the `core` crate by POSTing rendered messages to
//! an HTTP mail relay. When no relay endpoint is configured (local
//! development, tests), messages are logged instead of sent.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use tutoring_core::ports::{Email, MailService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `MailService` port over an HTTP mail relay.
#[derive(Clone)]
pub struct HttpMailAdapter {
    client: Client,
    endpoint: Option<String>,
    from: String,
}

impl HttpMailAdapter {
    /// Creates a new `HttpMailAdapter`. `endpoint = None` puts the adapter in
    /// log-only mode.
    pub fn new(endpoint: Option<String>, from: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            from,
        }
    }
}

//=========================================================================================
// `MailService` Trait Implementation
//=========================================================================================

#[async_trait]
impl MailService for HttpMailAdapter {
    async fn send(&self, mail: &Email) -> PortResult<()> {
        let Some(endpoint) = &self.endpoint else {
            info!(to = %mail.to, subject = %mail.subject, "mail relay not configured, logging only");
            return Ok(());
        };

        let payload = json!({
            "from": self.from,
            "to": mail.to,
            "subject": mail.subject,
            "body": mail.body,
        });

        let response = self
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("mail relay error: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "mail relay returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
