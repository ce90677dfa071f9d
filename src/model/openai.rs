// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, ClassificationRequest, ModelReply, VisionModel};
use crate::Result;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

impl OpenAiClient {
    pub fn new(client: Client, api_key: &str, model: &str, custom_url: Option<&str>) -> Self {
        Self {
            client,
            base_url: custom_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &ClassificationRequest<'_>) -> ChatRequest {
        let data_url = format!(
            "data:{};base64,{}",
            request.format.mime_type(),
            general_purpose::STANDARD.encode(request.image)
        );

        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: request.prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
        }
    }

    fn into_reply(response: ChatResponse) -> ModelReply {
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.is_empty());

        ModelReply {
            text,
            total_tokens: response.usage.map(|u| u.total_tokens).unwrap_or(0),
        }
    }
}

#[async_trait]
impl VisionModel for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn classify(&self, request: &ClassificationRequest<'_>) -> Result<ModelReply> {
        let body = self.build_request(request);

        debug!("Sending vision request to OpenAI-compatible API: model={}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        let result: ChatResponse = response.json().await?;
        Ok(Self::into_reply(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniff::ImageFormat;

    #[test]
    fn test_request_carries_data_url() {
        let client = OpenAiClient::new(Client::new(), "k", "gpt-4o-mini", None);
        let request = ClassificationRequest {
            image: b"abc",
            format: ImageFormat::Jpeg,
            prompt: "classify",
        };
        let body = serde_json::to_value(client.build_request(&request)).unwrap();
        let content = &body["messages"][0]["content"];

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,YWJj");
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_reply_parsing() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"cate\":[\"B\"]}"}}],
                "usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        )
        .unwrap();

        let reply = OpenAiClient::into_reply(response);
        assert_eq!(reply.text.as_deref(), Some(r#"{"cate":["B"]}"#));
        assert_eq!(reply.total_tokens, 15);
    }

    #[test]
    fn test_null_content_is_no_text() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(OpenAiClient::into_reply(response), ModelReply::default());
    }
}
