//! Alert delivery.
//!
//! A [`Notifier`] takes a finished alert text and reports what happened to it.
//! Ordinary delivery problems (unreachable webhook, unexpected status) come
//! back as a failed [`DeliveryResult`] so the monitor loop never has to handle
//! errors for them. Each message gets exactly one attempt.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{validate_http_url, ConfigError};

const MAX_DETAIL_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(status_code: u16) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            detail: None,
        }
    }

    pub fn failed(status_code: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            detail: Some(detail.into()),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> DeliveryResult;
}

/// Configuration for the webhook sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// The URL to POST alerts to.
    pub url: String,

    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,

    /// The only status code treated as a successful delivery.
    #[serde(default = "default_success_status")]
    pub success_status: u16,

    /// Optional HMAC-SHA256 signing secret for `X-Uptime-Signature-256` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

fn default_webhook_timeout_ms() -> u64 {
    5000
}

fn default_success_status() -> u16 {
    204
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: default_webhook_timeout_ms(),
            success_status: default_success_status(),
            secret: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingWebhook);
        }
        validate_http_url("webhook", &self.url)?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// The JSON body POSTed to the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub content: &'a str,
}

/// Delivers alerts as `{"content": ...}` POSTs, one attempt each.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Builds a notifier with its own client, see [`WebhookNotifier::build_client`].
    pub fn from_config(config: WebhookConfig, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Self::build_client(user_agent)?;
        Ok(Self::new(config, client))
    }

    /// A client that never follows redirects, so a 3xx is judged as the
    /// webhook's own answer and the POST is never replayed elsewhere.
    pub fn build_client(user_agent: &str) -> Result<Client, reqwest::Error> {
        Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &str) -> DeliveryResult {
        let body = match serde_json::to_vec(&WebhookPayload { content: message }) {
            Ok(b) => b,
            Err(e) => return DeliveryResult::failed(None, format!("Failed to encode payload: {}", e)),
        };

        let mut req = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .timeout(self.config.timeout());

        if let Some(secret) = self.config.secret.as_deref() {
            let signature = sign_payload(&body, secret);
            req = req.header("X-Uptime-Signature-256", format!("sha256={}", signature));
        }

        let resp = match req.body(body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let detail = if e.is_timeout() {
                    format!("Webhook timed out after {}ms", self.config.timeout_ms)
                } else {
                    format!("Request to webhook failed: {}", e)
                };
                return DeliveryResult::failed(None, detail);
            }
        };

        let status = resp.status().as_u16();
        if status == self.config.success_status {
            return DeliveryResult::delivered(status);
        }

        let detail = match resp.text().await {
            Ok(body) if !body.trim().is_empty() => truncate_detail(body.trim(), MAX_DETAIL_CHARS),
            Ok(_) => format!("HTTP {} from webhook", status),
            Err(e) => format!("HTTP {} from webhook (failed to read body: {})", status, e),
        };
        DeliveryResult::failed(Some(status), detail)
    }
}

fn truncate_detail(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn sign_payload(body: &[u8], secret: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
