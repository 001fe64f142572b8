use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info};

use crate::error::DbPilotError;
use crate::utils::Utils;

use super::{
    DingTalkReceiver, DiscordReceiver, FeishuReceiver, WeComReceiver, WebhookClient,
    WebhookContext, WebhookReceiver,
};

pub const DINGTALK: &str = "bb.plugin.webhook.dingtalk";
pub const DISCORD: &str = "bb.plugin.webhook.discord";
pub const FEISHU: &str = "bb.plugin.webhook.feishu";
pub const WECOM: &str = "bb.plugin.webhook.wecom";

/// Receiver table keyed by receiver key.
///
/// Built once at startup and never mutated afterwards; share it behind an
/// `Arc` or a plain reference.
#[derive(Default)]
pub struct WebhookRegistry {
    receivers: HashMap<String, Box<dyn WebhookReceiver>>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in receiver, sharing one HTTP client with `timeout`
    pub fn with_builtin_receivers(timeout: Duration) -> Result<Self, DbPilotError> {
        let client = WebhookClient::new(timeout)?;

        let registry = Self::new()
            .register(DINGTALK, DingTalkReceiver::new(client.clone()))
            .register(DISCORD, DiscordReceiver::new(client.clone()))
            .register(FEISHU, FeishuReceiver::new(client.clone()))
            .register(WECOM, WeComReceiver::new(client));

        info!(
            "Registered webhook receivers: {}",
            registry.receiver_keys().join(", ")
        );

        Ok(registry)
    }

    /// Add a receiver while building the table. A later registration under
    /// the same key replaces the earlier one.
    pub fn register(mut self, key: impl Into<String>, receiver: impl WebhookReceiver + 'static) -> Self {
        self.receivers.insert(key.into(), Box::new(receiver));
        self
    }

    /// Sorted receiver keys
    pub fn receiver_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.receivers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Post `context` through the receiver registered under `key`.
    ///
    /// An unknown key fails with `UnknownReceiver` before any network call.
    pub async fn dispatch(&self, key: &str, context: &WebhookContext) -> Result<(), DbPilotError> {
        let receiver = self
            .receivers
            .get(key)
            .ok_or_else(|| DbPilotError::UnknownReceiver(key.to_string()))?;

        receiver.post(context).await?;
        debug!("Posted webhook '{}' via {}", context.title, key);

        Ok(())
    }
}

/// Dispatch and swallow the failure after logging it. Used after a
/// migration or backup has already reached its outcome, which a failed
/// notification must not change.
pub async fn notify_best_effort(registry: &WebhookRegistry, key: &str, context: &WebhookContext) {
    let result = registry.dispatch(key, context).await;
    Utils::log_and_discard(result, &format!("Failed to post webhook via {}", key));
}
