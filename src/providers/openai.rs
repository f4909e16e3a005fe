// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI backend over the Chat Completions API.
//!
//! Vision requests use data-URL image parts alongside the text part.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{error_from_status, LlmProvider, ProviderKind};
use crate::error::ProviderError;
use crate::types::ImageData;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sampling temperature for text generation.
const TEXT_TEMPERATURE: f32 = 0.3;

/// Sampling temperature for vision/code generation.
const VISION_TEMPERATURE: f32 = 0.2;

/// OpenAI backend.
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiBackend {
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

    fn resolve_model(model: &str) -> String {
        if ProviderKind::OpenAi.is_known_model(model) {
            model.to_string()
        } else {
            ProviderKind::OpenAi.default_model().to_string()
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(status.as_u16(), &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::ParseError("response had no content".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let model = Self::resolve_model(model);
        debug!(%model, "openai text request");

        let request = ChatRequest {
            model,
            max_tokens,
            temperature: TEXT_TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ChatContent::Text(system_prompt.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: ChatContent::Text(user_prompt.to_string()),
                },
            ],
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
        debug!(%model, images = images.len(), "openai vision request");

        let mut parts = vec![ContentPart::Text {
            text: user_prompt.to_string(),
        }];
        for image in images {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!(
                        "data:{};base64,{}",
                        image.media_type.as_str(),
                        image.data
                    ),
                },
            });
        }

        let request = ChatRequest {
            model,
            max_tokens,
            temperature: VISION_TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ChatContent::Text(system_prompt.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: ChatContent::Parts(parts),
                },
            ],
        };

        self.send(&request).await
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: ChatContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
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
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageMediaType;

    #[test]
    fn test_resolve_model_fallback() {
        assert_eq!(OpenAiBackend::resolve_model("gpt-5-nano"), "gpt-5-nano");
        assert_eq!(OpenAiBackend::resolve_model("claude-3"), "gpt-5.2");
    }

    #[test]
    fn test_image_part_uses_data_url() {
        let part = ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!(
                    "data:{};base64,{}",
                    ImageMediaType::Jpeg.as_str(),
                    "aGVsbG8="
                ),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image_url");
        assert_eq!(json["image_url"]["url"], "data:image/jpeg;base64,aGVsbG8=");
    }

    #[test]
    fn test_chat_response_parse() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }
}
