use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

use super::{
    deliver, rejection_message, PlatformResponse, WebhookClient, WebhookContext, WebhookReceiver,
};

#[derive(Debug, Default, Deserialize)]
struct WeComResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl PlatformResponse for WeComResponse {
    fn rejection(&self) -> Option<String> {
        rejection_message(self.errcode, &self.errmsg)
    }
}

#[derive(Debug, Serialize)]
struct WeComMarkdown {
    content: String,
}

#[derive(Debug, Serialize)]
struct WeComMessage {
    msgtype: &'static str,
    markdown: WeComMarkdown,
}

/// Posts a markdown message to a WeCom group robot
pub struct WeComReceiver {
    client: WebhookClient,
}

impl WeComReceiver {
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }

    fn render(context: &WebhookContext) -> WeComMessage {
        let mut lines = vec![format!("# {}", context.title)];
        if !context.description.is_empty() {
            lines.push(format!("> {}", context.description));
        }
        lines.extend(
            context
                .meta_list
                .iter()
                .map(|meta| format!("**{}:** {}", meta.name, meta.value)),
        );
        lines.push(format!("**By:** {}", context.creator()));
        lines.push(format!("**At:** {}", context.created_at()));
        lines.push(format!("[View in DBPilot]({})", context.link));

        WeComMessage {
            msgtype: "markdown",
            markdown: WeComMarkdown {
                content: lines.join("\n"),
            },
        }
    }
}

#[async_trait]
impl WebhookReceiver for WeComReceiver {
    async fn post(&self, context: &WebhookContext) -> Result<(), NotificationError> {
        let message = Self::render(context);
        deliver::<_, WeComResponse>(&self.client, &context.url, &message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::test_support::{client, sample_context};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_render_without_meta() {
        let mut context = sample_context("http://unused".into());
        context.meta_list.clear();

        let message = WeComReceiver::render(&context);
        assert_eq!(message.msgtype, "markdown");
        assert_eq!(
            message.markdown.content,
            "# Issue created\n\
             > Add index to orders\n\
             **By:** Alice (alice@example.com)\n\
             **At:** 2021-10-05 03:10:12\n\
             [View in DBPilot](https://dbpilot.example.com/issue/42)"
        );
    }

    #[tokio::test]
    async fn test_post_server_error_without_body_is_transport_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let receiver = WeComReceiver::new(client());
        let err = receiver
            .post(&sample_context(mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, NotificationError::Transport(_)));
    }

    #[tokio::test]
    async fn test_post_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"errcode": 93000, "errmsg": "invalid webhook url"})),
            )
            .mount(&mock_server)
            .await;

        let receiver = WeComReceiver::new(client());
        let err = receiver
            .post(&sample_context(mock_server.uri()))
            .await
            .unwrap_err();

        assert!(err.is_rejected());
        assert_eq!(err.to_string(), "invalid webhook url");
    }
}
