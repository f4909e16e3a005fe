// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading.
//!
//! Resolution order: built-in defaults, then an optional `cadi.yaml` /
//! `cadi.json` file, then environment variables. API keys only ever come
//! from the environment.
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `CADI_PROVIDER` | Override default provider: `openai`, `anthropic` |
//! | `CADI_PYTHON` | Interpreter for the CAD executor subprocess |
//! | `OPENAI_API_KEY` | OpenAI API key |
//! | `ANTHROPIC_API_KEY` | Anthropic API key |

mod types;

pub use types::{
    CoreConfig, FileConfig, DEFAULT_EXEC_DEADLINE_SECS, DEFAULT_LLM_DEADLINE_SECS,
    DEFAULT_MAX_PIPELINE_ITERATIONS, DEFAULT_SESSION_TTL_SECS,
};

use std::path::Path;

use crate::error::ConfigError;

/// Load configuration from an optional file plus the environment.
pub fn load_config(path: Option<&Path>) -> Result<CoreConfig, ConfigError> {
    let mut config = CoreConfig::default();

    if let Some(path) = path {
        let file = load_file(path)?;
        file.apply_to(&mut config);
    }

    apply_env(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Load configuration from the environment only.
pub fn load_config_from_env() -> Result<CoreConfig, ConfigError> {
    load_config(None)
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&content)?),
        _ => Ok(serde_yaml::from_str(&content)?),
    }
}

fn apply_env(config: &mut CoreConfig) {
    if let Ok(provider) = std::env::var("CADI_PROVIDER") {
        config.default_provider = provider;
    }
    if let Ok(python) = std::env::var("CADI_PYTHON") {
        config.python_path = python;
    }
    config.openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
    config.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());
}

fn validate(config: &CoreConfig) -> Result<(), ConfigError> {
    match config.default_provider.as_str() {
        "openai" | "anthropic" => {}
        other => {
            return Err(ConfigError::InvalidValue {
                field: "default_provider".to_string(),
                message: format!("unknown provider: {other}"),
            })
        }
    }

    if config.llm_deadline_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "llm_deadline_secs".to_string(),
            message: "deadline must be positive".to_string(),
        });
    }

    if config.exec_deadline_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "exec_deadline_secs".to_string(),
            message: "deadline must be positive".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.max_pipeline_iterations, 3);
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "default_provider: anthropic").unwrap();
        writeln!(file, "max_pipeline_iterations: 2").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.default_provider, "anthropic");
        assert_eq!(config.max_pipeline_iterations, 2);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{\"exec_deadline_secs\": 10}}").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.exec_deadline_secs, 10);
    }

    #[test]
    fn test_invalid_provider_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "default_provider: cohere").unwrap();

        let result = load_config(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/cadi.yaml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
