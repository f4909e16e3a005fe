// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Anthropic Claude backend.
//!
//! Uses the Messages API. Vision requests put image blocks before the text
//! block, which is the ordering the API handles best.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{error_from_status, LlmProvider, ProviderKind};
use crate::error::ProviderError;
use crate::types::ImageData;

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Claude backend over the Messages API.
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>, deadline: Duration) -> Self {
        let client = Client::builder()
            .timeout(deadline)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Fall back to the default model when the requested one is unknown.
    fn resolve_model(model: &str) -> String {
        if ProviderKind::Anthropic.is_known_model(model) {
            model.to_string()
        } else {
            ProviderKind::Anthropic.default_model().to_string()
        }
    }

    async fn send(&self, request: &MessagesRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(status.as_u16(), &body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ProviderError::ParseError("response had no text block".to_string()))
    }
}

#[async_trait]
impl LlmProvider for AnthropicBackend {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let model = Self::resolve_model(model);
        debug!(%model, "anthropic text request");

        let request = MessagesRequest {
            model,
            max_tokens,
            system: system_prompt.to_string(),
            messages: vec![ApiMessage {
                role: "user",
                content: MessageContent::Text(user_prompt.to_string()),
            }],
        };

        self.send(&request).await
    }

    async fn generate_vision(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        images: &[ImageData],
        model: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let model = Self::resolve_model(model);
        debug!(%model, images = images.len(), "anthropic vision request");

        // Images first, then the text block
        let mut blocks: Vec<ContentBlock> = images
            .iter()
            .map(|image| ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: image.media_type.as_str(),
                    data: image.data.clone(),
                },
            })
            .collect();
        blocks.push(ContentBlock::Text {
            text: user_prompt.to_string(),
        });

        let request = MessagesRequest {
            model,
            max_tokens,
            system: system_prompt.to_string(),
            messages: vec![ApiMessage {
                role: "user",
                content: MessageContent::Blocks(blocks),
            }],
        };

        self.send(&request).await
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageMediaType;

    #[test]
    fn test_resolve_model_known() {
        assert_eq!(
            AnthropicBackend::resolve_model("claude-haiku-4-5-20251001"),
            "claude-haiku-4-5-20251001"
        );
    }

    #[test]
    fn test_resolve_model_unknown_falls_back() {
        assert_eq!(
            AnthropicBackend::resolve_model("gpt-4o"),
            "claude-sonnet-4-5-20250929"
        );
    }

    #[test]
    fn test_vision_request_serializes_images_first() {
        let blocks = vec![
            ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: ImageMediaType::Png.as_str(),
                    data: "aGVsbG8=".to_string(),
                },
            },
            ContentBlock::Text {
                text: "describe".to_string(),
            },
        ];
        let json = serde_json::to_value(&blocks).unwrap();
        assert_eq!(json[0]["type"], "image");
        assert_eq!(json[0]["source"]["media_type"], "image/png");
        assert_eq!(json[1]["type"], "text");
    }
}
