use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::error::NotificationError;
use crate::utils::Utils;

use super::{
    deliver, rejection_message, PlatformResponse, WebhookClient, WebhookContext, WebhookReceiver,
};

/// Discord answers 204 with no body on success and `{code, message}` on error
#[derive(Debug, Default, Deserialize)]
struct DiscordResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl PlatformResponse for DiscordResponse {
    const ACCEPTS_EMPTY_BODY: bool = true;

    fn rejection(&self) -> Option<String> {
        rejection_message(self.code, &self.message)
    }
}

#[derive(Debug, Serialize)]
struct DiscordEmbedField {
    name: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct DiscordEmbedAuthor {
    name: String,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    #[serde(rename = "type")]
    embed_type: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    url: String,
    timestamp: String,
    author: DiscordEmbedAuthor,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordEmbedField>,
}

#[derive(Debug, Serialize)]
struct DiscordMessage {
    embeds: Vec<DiscordEmbed>,
}

/// Posts a single rich embed, one field per meta entry
pub struct DiscordReceiver {
    client: WebhookClient,
}

impl DiscordReceiver {
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }

    fn render(context: &WebhookContext) -> DiscordMessage {
        let fields = context
            .meta_list
            .iter()
            .map(|meta| DiscordEmbedField {
                name: meta.name.clone(),
                value: meta.value.clone(),
            })
            .collect();

        DiscordMessage {
            embeds: vec![DiscordEmbed {
                title: context.title.clone(),
                embed_type: "rich",
                description: context.description.clone(),
                url: context.link.clone(),
                timestamp: Utils::utc_from_unix(context.created_ts)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                author: DiscordEmbedAuthor {
                    name: context.creator(),
                },
                fields,
            }],
        }
    }
}

#[async_trait]
impl WebhookReceiver for DiscordReceiver {
    async fn post(&self, context: &WebhookContext) -> Result<(), NotificationError> {
        let message = Self::render(context);
        deliver::<_, DiscordResponse>(&self.client, &context.url, &message).await
    }
}
