use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

use super::{
    deliver, rejection_message, PlatformResponse, WebhookClient, WebhookContext, WebhookReceiver,
};

#[derive(Debug, Default, Deserialize)]
struct FeishuResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

impl PlatformResponse for FeishuResponse {
    fn rejection(&self) -> Option<String> {
        rejection_message(self.code, &self.msg)
    }
}

/// One element of a rich-text line
#[derive(Debug, Serialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
enum FeishuElement {
    Text { text: String },
    A { text: String, href: String },
}

#[derive(Debug, Serialize)]
struct FeishuPostBody {
    title: String,
    content: Vec<Vec<FeishuElement>>,
}

#[derive(Debug, Serialize)]
struct FeishuPost {
    zh_cn: FeishuPostBody,
}

#[derive(Debug, Serialize)]
struct FeishuContent {
    post: FeishuPost,
}

#[derive(Debug, Serialize)]
struct FeishuMessage {
    msg_type: &'static str,
    content: FeishuContent,
}

/// Posts a rich-text ("post") message to a Feishu bot
pub struct FeishuReceiver {
    client: WebhookClient,
}

impl FeishuReceiver {
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }

    fn render(context: &WebhookContext) -> FeishuMessage {
        let text_line = |text: String| vec![FeishuElement::Text { text }];

        let mut content = Vec::new();
        if !context.description.is_empty() {
            content.push(text_line(context.description.clone()));
        }
        for meta in &context.meta_list {
            content.push(text_line(format!("{}: {}", meta.name, meta.value)));
        }
        content.push(text_line(format!("By: {}", context.creator())));
        content.push(text_line(format!("At: {}", context.created_at())));
        content.push(vec![FeishuElement::A {
            text: "View in DBPilot".to_string(),
            href: context.link.clone(),
        }]);

        FeishuMessage {
            msg_type: "post",
            content: FeishuContent {
                post: FeishuPost {
                    zh_cn: FeishuPostBody {
                        title: context.title.clone(),
                        content,
                    },
                },
            },
        }
    }
}

#[async_trait]
impl WebhookReceiver for FeishuReceiver {
    async fn post(&self, context: &WebhookContext) -> Result<(), NotificationError> {
        let message = Self::render(context);
        deliver::<_, FeishuResponse>(&self.client, &context.url, &message).await
    }
}
