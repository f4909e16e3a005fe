// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cadi - Your AI CAD wingman.
//!
//! A multi-agent orchestrator that turns natural-language descriptions
//! (optionally with reference images) into validated, 3D-printable
//! parametric CadQuery models.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (BoundingBox, PrinterSettings, ImageData)
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading
//! - [`providers`] - LLM backends (Anthropic, OpenAI), gateway, model routing
//! - [`validator`] - Static validation and auto-correction of CadQuery scripts
//! - [`executor`] - Sandboxed CAD execution adapter
//! - [`params`] - Parameter extraction and injection
//! - [`pipeline`] - Design/validate/optimize/review agent pipeline
//! - [`conversation`] - Phased dialogue engine and in-memory session store
//! - [`prompts`] - Per-role system prompts and library trigger patterns
//! - [`repository`] - Consumed persistence contracts
//! - [`service`] - High-level facade wiring everything together
//! - [`telemetry`] - Tracing initialization
//!
//! # Example
//!
//! ```rust,ignore
//! use cadi::config::load_config_from_env;
//! use cadi::conversation::CreateSessionOptions;
//! use cadi::service::DesignService;
//!
//! let config = load_config_from_env()?;
//! let service = DesignService::from_config(config);
//!
//! let session = service
//!     .session_create(CreateSessionOptions {
//!         initial_prompt: Some("cylindrical speaker dock, 100mm diameter".into()),
//!         ..Default::default()
//!     })
//!     .await?;
//! let step = service.session_start(&session.id, None, None).await?;
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod executor;
pub mod params;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod repository;
pub mod service;
pub mod telemetry;
pub mod types;
pub mod validator;

// Re-export commonly used types at crate root
pub use conversation::{
    AgentRole, Attachment, ConversationEngine, ConversationMessage, ConversationPhase,
    ConversationSession, MessageKind, Requirements, SessionStore, StepResult,
};
pub use error::{
    ConfigError, ExecutorError, PipelineError, ProviderError, Result, SessionError,
};
pub use executor::{CadExecutor, ExecutionOutcome, SubprocessExecutor};
pub use params::{Parameter, ParameterEngine};
pub use pipeline::{AgentPipeline, PipelineRequest, PipelineResult};
pub use providers::{
    AnthropicBackend, LlmGateway, LlmProvider, ModelRole, ModelRouter, OpenAiBackend,
    ProviderKind, SharedProvider, StaticModelRouter,
};
pub use service::DesignService;
pub use types::{BoundingBox, BuildVolume, ContextPart, ImageData, ImageMediaType, PrinterSettings};
pub use validator::{CodeValidator, ValidationReport};

/// Cadi version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        // Verify key types are accessible
        let _validator = CodeValidator::new();
        let _params = ParameterEngine::new();
        let _settings = PrinterSettings::default();
    }
}
