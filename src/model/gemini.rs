// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Gemini `generateContent` client

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_status, ClassificationRequest, ModelReply, VisionModel};
use crate::Result;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    bearer: bool,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: u64,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// A custom base URL also switches on bearer authentication, which most
    /// Gemini-compatible gateways expect.
    pub fn new(client: Client, api_key: &str, model: &str, custom_url: Option<&str>) -> Self {
        let base_url = custom_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            model: model.to_string(),
            bearer: custom_url.is_some(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(request: &ClassificationRequest<'_>) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.format.mime_type(),
                            data: general_purpose::STANDARD.encode(request.image),
                        },
                    },
                    Part::Text {
                        text: request.prompt.to_string(),
                    },
                ],
            }],
        }
    }

    fn into_reply(response: GenerateResponse) -> ModelReply {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        ModelReply {
            text: Some(text).filter(|t| !t.is_empty()),
            total_tokens: response.usage_metadata.map(|u| u.total_token_count).unwrap_or(0),
        }
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn classify(&self, request: &ClassificationRequest<'_>) -> Result<ModelReply> {
        let body = Self::build_request(request);

        debug!("Sending vision request to Gemini: model={}", self.model);

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        if self.bearer {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = check_status(builder.send().await?).await?;
        let result: GenerateResponse = response.json().await?;
        Ok(Self::into_reply(result))
    }
}
