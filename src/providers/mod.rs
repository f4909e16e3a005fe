// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! LLM backends for Cadi.
//!
//! [`LlmProvider`] is the unified capability over the supported model
//! backends; [`LlmGateway`] holds one backend per provider and dispatches by
//! [`ProviderKind`]. The gateway passes model names through untouched -
//! fast/best selection lives in [`router`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cadi::config::load_config_from_env;
//! use cadi::providers::LlmGateway;
//!
//! let config = load_config_from_env()?;
//! let gateway = LlmGateway::from_config(&config);
//! let text = gateway
//!     .generate_text(ProviderKind::Anthropic, "claude-haiku-4-5-20251001",
//!                    "You are helpful.", "Say hi.", 256)
//!     .await?;
//! ```

pub mod anthropic;
pub mod openai;
pub mod router;

pub use anthropic::AnthropicBackend;
pub use openai::OpenAiBackend;
pub use router::{ModelRole, ModelRouter, StaticModelRouter};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::CoreConfig;
use crate::error::ProviderError;
use crate::types::ImageData;

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Default model used when a requested model is not in the catalog.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-5.2",
            Self::Anthropic => "claude-sonnet-4-5-20250929",
        }
    }

    /// Known models for this backend, as (id, display name).
    pub fn known_models(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::OpenAi => OPENAI_MODELS,
            Self::Anthropic => ANTHROPIC_MODELS,
        }
    }

    pub fn is_known_model(&self, model: &str) -> bool {
        self.known_models().iter().any(|(id, _)| *id == model)
    }
}

/// Error type for parsing a provider kind from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProviderKindError;

impl std::fmt::Display for ParseProviderKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid provider kind")
    }
}

impl std::error::Error for ParseProviderKindError {}

impl std::str::FromStr for ProviderKind {
    type Err = ParseProviderKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(ParseProviderKindError),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Available OpenAI models.
pub const OPENAI_MODELS: &[(&str, &str)] = &[
    ("gpt-5.2", "GPT-5.2 (Best)"),
    ("gpt-5.2-pro", "GPT-5.2 Pro"),
    ("gpt-5-mini", "GPT-5 Mini"),
    ("gpt-5-nano", "GPT-5 Nano (Fast)"),
    ("gpt-4.1", "GPT-4.1"),
    ("gpt-4o", "GPT-4o"),
    ("o4-mini", "o4 Mini (Reasoning)"),
];

/// Available Anthropic models.
pub const ANTHROPIC_MODELS: &[(&str, &str)] = &[
    ("claude-sonnet-4-5-20250929", "Sonnet 4.5 (Balanced)"),
    ("claude-opus-4-5-20251101", "Opus 4.5 (Best)"),
    ("claude-haiku-4-5-20251001", "Haiku 4.5 (Fast)"),
];

/// Unified capability over a single model backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Single text-only completion: system prompt + user prompt in, text out.
    async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;

    /// Vision completion with one or more attached images.
    async fn generate_vision(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        images: &[ImageData],
        model: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;
}

/// Shared provider handle.
pub type SharedProvider = Arc<dyn LlmProvider>;

/// Dispatches calls to the backend registered for each [`ProviderKind`].
#[derive(Default)]
pub struct LlmGateway {
    backends: HashMap<ProviderKind, SharedProvider>,
}

impl LlmGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend for a provider kind.
    pub fn with_backend(mut self, kind: ProviderKind, provider: SharedProvider) -> Self {
        self.backends.insert(kind, provider);
        self
    }

    /// Build a gateway with a backend for every provider that has an API key
    /// in the configuration.
    pub fn from_config(config: &CoreConfig) -> Self {
        let deadline = Duration::from_secs(config.llm_deadline_secs);
        let mut gateway = Self::new();

        if let Some(key) = &config.openai_api_key {
            gateway = gateway.with_backend(
                ProviderKind::OpenAi,
                Arc::new(OpenAiBackend::new(key.clone(), None, deadline)),
            );
        }
        if let Some(key) = &config.anthropic_api_key {
            gateway = gateway.with_backend(
                ProviderKind::Anthropic,
                Arc::new(AnthropicBackend::new(key.clone(), None, deadline)),
            );
        }

        gateway
    }

    fn backend(&self, kind: ProviderKind) -> Result<&SharedProvider, ProviderError> {
        self.backends.get(&kind).ok_or_else(|| {
            ProviderError::NotConfigured(format!("no API key configured for {kind}"))
        })
    }

    pub async fn generate_text(
        &self,
        kind: ProviderKind,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        self.backend(kind)?
            .generate_text(system_prompt, user_prompt, model, max_tokens)
            .await
    }

    pub async fn generate_vision(
        &self,
        kind: ProviderKind,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        images: &[ImageData],
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        self.backend(kind)?
            .generate_vision(system_prompt, user_prompt, images, model, max_tokens)
            .await
    }
}

/// Map an HTTP error status + body to a [`ProviderError`].
pub(crate) fn error_from_status(status: u16, body: &str) -> ProviderError {
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };

    match status {
        401 | 403 => ProviderError::AuthError(message),
        429 => {
            if body.to_lowercase().contains("quota") {
                ProviderError::QuotaExceeded(message)
            } else {
                ProviderError::RateLimited(message)
            }
        }
        404 => ProviderError::ModelNotFound(message),
        _ => ProviderError::ApiError {
            message,
            status_code: Some(status),
        },
    }
}

/// Extract a fenced code block from model output.
///
/// Prefers a ```python block; falls back to the first generic fence with an
/// optional short language tag. `None` when no fence is present.
pub fn extract_code_block(content: &str) -> Option<String> {
    if let Some(start) = content.find("```python") {
        let start = start + "```python".len();
        if let Some(end) = content[start..].find("```") {
            return Some(content[start..start + end].trim().to_string());
        }
    }

    if let Some(fence) = content.find("```") {
        let mut start = fence + 3;
        // Skip a short language identifier on the opening fence line
        if let Some(newline) = content[start..].find('\n') {
            if newline > 0 && newline < 20 {
                start += newline + 1;
            }
        }
        if let Some(end) = content[start..].find("```") {
            return Some(content[start..start + end].trim().to_string());
        }
    }

    None
}

/// Like [`extract_code_block`], but falls back to the trimmed body.
pub fn extract_code_or_body(content: &str) -> String {
    extract_code_block(content).unwrap_or_else(|| content.trim().to_string())
}

/// Extract the outermost JSON object from model output.
///
/// Models regularly wrap JSON answers in prose or fences; this takes the
/// text between the first `{` and the last `}`. `None` when there is no
/// object or it does not parse.
pub fn extract_json_object(content: &str) -> Option<serde_json::Value> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("openai".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!(
            "ANTHROPIC".parse::<ProviderKind>(),
            Ok(ProviderKind::Anthropic)
        );
        assert!("mistral".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_known_models() {
        assert!(ProviderKind::Anthropic.is_known_model("claude-haiku-4-5-20251001"));
        assert!(!ProviderKind::Anthropic.is_known_model("gpt-5-nano"));
        assert!(ProviderKind::OpenAi.is_known_model("gpt-5-nano"));
    }

    #[test]
    fn test_extract_python_block() {
        let content = "Here you go:\n```python\nimport cadquery as cq\nresult = cq.Workplane()\n```\nDone.";
        let code = extract_code_block(content).unwrap();
        assert!(code.starts_with("import cadquery"));
        assert!(code.ends_with("Workplane()"));
    }

    #[test]
    fn test_extract_generic_block_skips_language_tag() {
        let content = "```py\nresult = 1\n```";
        assert_eq!(extract_code_block(content).unwrap(), "result = 1");
    }

    #[test]
    fn test_extract_no_block() {
        assert_eq!(extract_code_block("no fences here"), None);
        assert_eq!(extract_code_or_body("  plain text  "), "plain text");
    }

    #[test]
    fn test_extract_json_object() {
        let content = "Here is my analysis:\n```json\n{\"issues\": [], \"suggestions\": [\"add fillets\"]}\n```";
        let value = extract_json_object(content).unwrap();
        assert_eq!(value["suggestions"][0], "add fillets");
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_error_from_status() {
        assert!(matches!(
            error_from_status(401, ""),
            ProviderError::AuthError(_)
        ));
        assert!(matches!(
            error_from_status(429, "rate limit"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            error_from_status(429, "insufficient quota"),
            ProviderError::QuotaExceeded(_)
        ));
        assert!(error_from_status(503, "down").is_transient());
    }

    #[test]
    fn test_gateway_unconfigured_backend() {
        let gateway = LlmGateway::new();
        let err = gateway.backend(ProviderKind::OpenAi).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
