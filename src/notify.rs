//! Report delivery
//!
//! One report is one outbound email. Delivery is never retried; a failure is
//! returned to the caller, which treats it as fatal for the run.

use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;
use tracing::{debug, info};

use crate::report::Report;

/// Reasons a report could not be delivered
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("mail API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail API rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Sends a rendered report
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, report: &Report) -> Result<(), DeliveryError>;
}

/// Request body accepted by the mail API
#[derive(Debug, Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

/// Delivers reports through an HTTP email API with bearer authentication
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender: String,
    recipient: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            sender: sender.into(),
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, report: &Report) -> Result<(), DeliveryError> {
        let email = OutboundEmail {
            from: &self.sender,
            to: [&self.recipient],
            subject: &report.subject,
            text: &report.text_body,
            html: report.html_body.as_deref(),
        };

        debug!("Posting report to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Email sent successfully to {}", self.recipient);
        Ok(())
    }
}

/// Prints the report instead of mailing it
#[derive(Debug, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, report: &Report) -> Result<(), DeliveryError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "Subject: {}", report.subject)?;
        writeln!(out)?;
        writeln!(out, "{}", report.text_body)?;
        out.flush()?;
        Ok(())
    }
}
