// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`CoreConfig`] is the fully-resolved configuration the orchestrator runs
//! with. [`FileConfig`] is the partial shape accepted from a `cadi.yaml` /
//! `cadi.json` file; anything absent falls back to defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default maximum design+validate cycles per pipeline run.
pub const DEFAULT_MAX_PIPELINE_ITERATIONS: u32 = 3;

/// Default per-LLM-call deadline in seconds.
pub const DEFAULT_LLM_DEADLINE_SECS: u64 = 60;

/// Default CAD executor deadline in seconds.
pub const DEFAULT_EXEC_DEADLINE_SECS: u64 = 30;

/// Default session TTL: 24 hours since last update.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

/// Fully-resolved runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Default LLM provider name ("openai" or "anthropic").
    pub default_provider: String,

    /// Fast (cheap, low-latency) model per provider name.
    pub fast_models: HashMap<String, String>,

    /// Best (highest-capability) model per provider name.
    pub best_models: HashMap<String, String>,

    /// Maximum design+validate cycles in the agent pipeline.
    pub max_pipeline_iterations: u32,

    /// Deadline applied to every LLM call, in seconds.
    pub llm_deadline_secs: u64,

    /// Deadline applied to every CAD executor invocation, in seconds.
    pub exec_deadline_secs: u64,

    /// Sessions idle longer than this are evicted.
    pub session_ttl_secs: u64,

    /// Interpreter used by the subprocess CAD executor.
    pub python_path: String,

    /// OpenAI API key, from `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key, from `ANTHROPIC_API_KEY`.
    #[serde(skip_serializing)]
    pub anthropic_api_key: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let mut fast_models = HashMap::new();
        fast_models.insert("openai".to_string(), "gpt-5-nano".to_string());
        fast_models.insert(
            "anthropic".to_string(),
            "claude-haiku-4-5-20251001".to_string(),
        );

        let mut best_models = HashMap::new();
        best_models.insert("openai".to_string(), "gpt-5.2-pro".to_string());
        best_models.insert(
            "anthropic".to_string(),
            "claude-opus-4-5-20251101".to_string(),
        );

        Self {
            default_provider: "openai".to_string(),
            fast_models,
            best_models,
            max_pipeline_iterations: DEFAULT_MAX_PIPELINE_ITERATIONS,
            llm_deadline_secs: DEFAULT_LLM_DEADLINE_SECS,
            exec_deadline_secs: DEFAULT_EXEC_DEADLINE_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            python_path: "python".to_string(),
            openai_api_key: None,
            anthropic_api_key: None,
        }
    }
}

/// Partial configuration accepted from a config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_models: Option<HashMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_models: Option<HashMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pipeline_iterations: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_deadline_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_deadline_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_path: Option<String>,
}

impl FileConfig {
    /// Overlay this partial config onto a resolved one.
    pub fn apply_to(&self, config: &mut CoreConfig) {
        if let Some(provider) = &self.default_provider {
            config.default_provider = provider.clone();
        }
        if let Some(models) = &self.fast_models {
            config.fast_models.extend(models.clone());
        }
        if let Some(models) = &self.best_models {
            config.best_models.extend(models.clone());
        }
        if let Some(n) = self.max_pipeline_iterations {
            config.max_pipeline_iterations = n;
        }
        if let Some(n) = self.llm_deadline_secs {
            config.llm_deadline_secs = n;
        }
        if let Some(n) = self.exec_deadline_secs {
            config.exec_deadline_secs = n;
        }
        if let Some(n) = self.session_ttl_secs {
            config.session_ttl_secs = n;
        }
        if let Some(path) = &self.python_path {
            config.python_path = path.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.max_pipeline_iterations, 3);
        assert_eq!(config.llm_deadline_secs, 60);
        assert_eq!(config.exec_deadline_secs, 30);
        assert_eq!(config.session_ttl_secs, 86_400);
        assert_eq!(
            config.fast_models.get("anthropic").map(String::as_str),
            Some("claude-haiku-4-5-20251001")
        );
    }

    #[test]
    fn test_file_config_overlay() {
        let mut config = CoreConfig::default();
        let file = FileConfig {
            default_provider: Some("anthropic".to_string()),
            max_pipeline_iterations: Some(5),
            ..Default::default()
        };
        file.apply_to(&mut config);
        assert_eq!(config.default_provider, "anthropic");
        assert_eq!(config.max_pipeline_iterations, 5);
        // Untouched fields keep defaults
        assert_eq!(config.exec_deadline_secs, 30);
    }
}
