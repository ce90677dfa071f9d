// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Multimodal model clients

pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::sniff::ImageFormat;
use crate::{AppConfig, Result, TaxisError};

/// Network timeout for every model request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Gemini,
    OpenAi,
}

impl FromStr for ModelKind {
    type Err = TaxisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ModelKind::Gemini),
            "openai" => Ok(ModelKind::OpenAi),
            other => Err(TaxisError::Config(format!(
                "Unknown llm_type '{}', expected 'gemini' or 'openai'",
                other
            ))),
        }
    }
}

impl ModelKind {
    /// Model used when `model_name` is left empty
    pub fn default_model(self) -> &'static str {
        match self {
            ModelKind::Gemini => "gemini-2.0-flash",
            ModelKind::OpenAi => "gpt-4o-mini",
        }
    }
}

/// One image plus the instruction prompt
pub struct ClassificationRequest<'a> {
    pub image: &'a [u8],
    pub format: ImageFormat,
    pub prompt: &'a str,
}

/// Raw model output for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Concatenated text output; `None` when the model produced no text
    pub text: Option<String>,
    /// Total tokens reported by the provider
    pub total_tokens: u64,
}

/// A model that can look at an image and answer a prompt
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    async fn classify(&self, request: &ClassificationRequest<'_>) -> Result<ModelReply>;
}

/// Build the shared HTTP client, routed through `proxy_url` when given
pub fn build_http_client(proxy_url: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);

    if let Some(url) = proxy_url.filter(|u| !u.trim().is_empty()) {
        match Proxy::all(url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => warn!("Ignoring invalid proxy URL '{}': {}", url, e),
        }
    }

    Ok(builder.build()?)
}

/// Create the model client selected by the configuration
pub fn from_config(config: &AppConfig) -> Result<Box<dyn VisionModel>> {
    let kind = config.validate()?;
    let http = build_http_client(Some(config.proxy_url.as_str()))?;
    let custom_url = Some(config.model_custom_url.as_str()).filter(|u| !u.trim().is_empty());
    let model_name = config.model_name_for(kind);

    let model: Box<dyn VisionModel> = match kind {
        ModelKind::Gemini => Box::new(gemini::GeminiClient::new(
            http,
            &config.model_token,
            model_name,
            custom_url,
        )),
        ModelKind::OpenAi => Box::new(openai::OpenAiClient::new(
            http,
            &config.model_token,
            model_name,
            custom_url,
        )),
    };

    Ok(model)
}

/// Turn a non-success response into a model error carrying the body
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TaxisError::Model(format!("Provider returned status {}: {}", status, body.trim())))
}
