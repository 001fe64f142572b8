use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

use super::{
    deliver, rejection_message, PlatformResponse, WebhookClient, WebhookContext, WebhookReceiver,
};

#[derive(Debug, Default, Deserialize)]
struct DingTalkResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl PlatformResponse for DingTalkResponse {
    fn rejection(&self) -> Option<String> {
        rejection_message(self.errcode, &self.errmsg)
    }
}

#[derive(Debug, Serialize)]
struct DingTalkMarkdown {
    title: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct DingTalkMessage {
    msgtype: &'static str,
    markdown: DingTalkMarkdown,
}

/// Posts a markdown message to a DingTalk robot
pub struct DingTalkReceiver {
    client: WebhookClient,
}

impl DingTalkReceiver {
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }

    fn render(context: &WebhookContext) -> DingTalkMessage {
        let mut lines = vec![format!("# {}", context.title)];
        if !context.description.is_empty() {
            lines.push(format!("> {}", context.description));
        }
        for meta in &context.meta_list {
            lines.push(format!("##### **{}:** {}", meta.name, meta.value));
        }
        lines.push(format!("##### **By:** {}", context.creator()));
        lines.push(format!("##### **At:** {}", context.created_at()));
        lines.push(format!("##### [View in DBPilot]({})", context.link));

        DingTalkMessage {
            msgtype: "markdown",
            markdown: DingTalkMarkdown {
                title: context.title.clone(),
                text: lines.join("\n"),
            },
        }
    }
}

#[async_trait]
impl WebhookReceiver for DingTalkReceiver {
    async fn post(&self, context: &WebhookContext) -> Result<(), NotificationError> {
        let message = Self::render(context);
        deliver::<_, DingTalkResponse>(&self.client, &context.url, &message).await
    }
}
