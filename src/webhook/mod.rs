//! Outbound notifications to chat platforms.
//!
//! A [`WebhookRegistry`] maps a receiver key such as
//! `bb.plugin.webhook.dingtalk` to the receiver that renders a
//! [`WebhookContext`] into that platform's message schema and posts it.
//! Delivery is a single POST with a bounded timeout; retrying is up to the
//! caller.

mod dingtalk;
mod discord;
mod feishu;
mod registry;
mod wecom;

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DbPilotError, NotificationError};
use crate::utils::Utils;

pub use dingtalk::DingTalkReceiver;
pub use discord::DiscordReceiver;
pub use feishu::FeishuReceiver;
pub use registry::{notify_best_effort, WebhookRegistry, DINGTALK, DISCORD, FEISHU, WECOM};
pub use wecom::WeComReceiver;

/// Time format used by the text platforms
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookMeta {
    pub name: String,
    pub value: String,
}

impl WebhookMeta {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One notification event, consumed by exactly one receiver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookContext {
    pub url: String,
    pub title: String,
    pub description: String,
    pub link: String,
    /// Unix seconds
    pub created_ts: i64,
    pub creator_name: String,
    pub creator_email: String,
    pub meta_list: Vec<WebhookMeta>,
}

impl WebhookContext {
    fn created_at(&self) -> String {
        Utils::utc_from_unix(self.created_ts)
            .format(TIME_FORMAT)
            .to_string()
    }

    fn creator(&self) -> String {
        format!("{} ({})", self.creator_name, self.creator_email)
    }
}

/// HTTP client shared by the receivers.
///
/// It can only be built with a timeout, so every POST a receiver sends is
/// bounded.
#[derive(Clone)]
pub struct WebhookClient {
    inner: reqwest::Client,
}

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, DbPilotError> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DbPilotError::Error(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { inner })
    }
}

#[async_trait]
pub trait WebhookReceiver: Send + Sync {
    async fn post(&self, context: &WebhookContext) -> Result<(), NotificationError>;
}

/// The status part of a platform's JSON answer
trait PlatformResponse: DeserializeOwned + Default {
    /// Whether a 2xx answer with no body means the message was accepted
    const ACCEPTS_EMPTY_BODY: bool = false;

    /// The platform's error message when it refused the message
    fn rejection(&self) -> Option<String>;
}

fn rejection_message(code: i64, message: &str) -> Option<String> {
    match code {
        0 => None,
        _ if message.is_empty() => Some(format!("webhook rejected with error code {}", code)),
        _ => Some(message.to_string()),
    }
}

/// POST `body` as JSON to `url` and check the platform's answer.
///
/// An empty body on a 2xx status counts as acceptance only for platforms
/// that answer that way on success. Anything that keeps us from reading a
/// verdict is a `Transport` failure; a verdict of refusal
/// is `Rejected` with the platform's message.
async fn deliver<B, R>(client: &WebhookClient, url: &str, body: &B) -> Result<(), NotificationError>
where
    B: Serialize + Sync,
    R: PlatformResponse,
{
    let response = client
        .inner
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| NotificationError::Transport(format!("failed to POST webhook {} ({})", url, e)))?;

    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| {
        NotificationError::Transport(format!(
            "failed to read POST webhook response {} ({})",
            url, e
        ))
    })?;
    debug!("Webhook {} answered HTTP {}", url, status);

    let verdict: R = if bytes.iter().all(u8::is_ascii_whitespace) {
        if !status.is_success() || !R::ACCEPTS_EMPTY_BODY {
            return Err(NotificationError::Transport(format!(
                "malformatted webhook response {} (HTTP {} with an empty body)",
                url, status
            )));
        }
        R::default()
    } else {
        serde_json::from_slice(&bytes).map_err(|e| {
            NotificationError::Transport(format!("malformatted webhook response {} ({})", url, e))
        })?
    };

    if let Some(message) = verdict.rejection() {
        return Err(NotificationError::Rejected(message));
    }
    if !status.is_success() {
        return Err(NotificationError::Rejected(format!(
            "webhook {} answered HTTP {}",
            url, status
        )));
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn client() -> WebhookClient {
        WebhookClient::new(Duration::from_secs(3)).unwrap()
    }

    pub fn sample_context(url: String) -> WebhookContext {
        WebhookContext {
            url,
            title: "Issue created".to_string(),
            description: "Add index to orders".to_string(),
            link: "https://dbpilot.example.com/issue/42".to_string(),
            created_ts: 1_633_403_412,
            creator_name: "Alice".to_string(),
            creator_email: "alice@example.com".to_string(),
            meta_list: vec![
                WebhookMeta::new("Project", "shop"),
                WebhookMeta::new("Environment", "Prod"),
            ],
        }
    }
}
