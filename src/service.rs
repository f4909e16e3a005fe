// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! High-level design service.
//!
//! Wires configuration into the gateway, router, executor, pipeline, store,
//! and conversation engine, and exposes the functional API an embedding
//! application (HTTP layer, CLI, tests) consumes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::CoreConfig;
use crate::conversation::{
    ConversationEngine, ConversationSession, CreateSessionOptions, PhaseKeywords, SessionStore,
    StepResult,
};
use crate::conversation::Attachment;
use crate::error::{PipelineError, SessionError};
use crate::executor::{CadExecutor, SubprocessExecutor};
use crate::params::{Parameter, ParameterEngine, ParameterError};
use crate::pipeline::{AgentPipeline, PipelineRequest, PipelineResult};
use crate::providers::{LlmGateway, ModelRouter, ProviderKind, StaticModelRouter};
use crate::repository::PartVersioning;
use crate::validator::{CodeValidator, ValidationReport};

/// Interval between TTL sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Everything needed to run design conversations and pipeline generations.
pub struct DesignService {
    config: CoreConfig,
    store: Arc<SessionStore>,
    pipeline: Arc<AgentPipeline>,
    engine: ConversationEngine,
    params: ParameterEngine,
    validator: CodeValidator,
}

impl DesignService {
    /// Build the full stack from configuration, using the subprocess CAD
    /// executor.
    pub fn from_config(config: CoreConfig) -> Self {
        let executor: Arc<dyn CadExecutor> = Arc::new(SubprocessExecutor::new(
            config.python_path.clone(),
            Duration::from_secs(config.exec_deadline_secs),
        ));
        Self::with_parts(config, executor, None, PhaseKeywords::default())
    }

    /// Build with explicit collaborators. This is the seam tests and
    /// embedders use to swap the executor or wire part versioning.
    pub fn with_parts(
        config: CoreConfig,
        executor: Arc<dyn CadExecutor>,
        versioning: Option<Arc<dyn PartVersioning>>,
        keywords: PhaseKeywords,
    ) -> Self {
        let gateway = Arc::new(LlmGateway::from_config(&config));
        Self::with_gateway(config, gateway, executor, versioning, keywords)
    }

    /// Build with a pre-assembled gateway (scripted backends in tests).
    pub fn with_gateway(
        config: CoreConfig,
        gateway: Arc<LlmGateway>,
        executor: Arc<dyn CadExecutor>,
        versioning: Option<Arc<dyn PartVersioning>>,
        keywords: PhaseKeywords,
    ) -> Self {
        let router: Arc<dyn ModelRouter> = Arc::new(StaticModelRouter::from_config(&config));
        let pipeline = Arc::new(AgentPipeline::new(
            Arc::clone(&gateway),
            executor,
            Arc::clone(&router),
            config.max_pipeline_iterations,
        ));
        let store = Arc::new(SessionStore::new(Duration::from_secs(
            config.session_ttl_secs,
        )));

        let mut engine = ConversationEngine::new(
            Arc::clone(&store),
            gateway,
            router,
            Arc::clone(&pipeline),
        )
        .with_keywords(keywords);
        if let Some(versioning) = versioning {
            engine = engine.with_versioning(versioning);
        }

        Self {
            config,
            store,
            pipeline,
            engine,
            params: ParameterEngine::new(),
            validator: CodeValidator::new(),
        }
    }

    /// The provider used when a call does not name one.
    pub fn default_provider(&self) -> ProviderKind {
        self.config
            .default_provider
            .parse()
            .unwrap_or(ProviderKind::OpenAi)
    }

    /// Start the background session TTL sweep.
    pub fn spawn_ttl_sweeper(&self) -> JoinHandle<()> {
        SessionStore::spawn_ttl_sweeper(&self.store, SWEEP_INTERVAL)
    }

    // ========================================================================
    // Session surface
    // ========================================================================

    pub async fn session_create(
        &self,
        options: CreateSessionOptions,
    ) -> Result<ConversationSession, SessionError> {
        self.store.create(options).await
    }

    pub async fn session_start(
        &self,
        session_id: &str,
        provider: Option<ProviderKind>,
        model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let provider = provider.unwrap_or_else(|| self.default_provider());
        self.engine.start(session_id, provider, model).await
    }

    pub async fn session_send(
        &self,
        session_id: &str,
        message: &str,
        provider: Option<ProviderKind>,
        model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let provider = provider.unwrap_or_else(|| self.default_provider());
        self.engine.send(session_id, message, provider, model).await
    }

    pub async fn session_add_attachment(
        &self,
        session_id: &str,
        attachment: Attachment,
    ) -> Result<String, SessionError> {
        self.store.add_attachment(session_id, attachment).await
    }

    pub async fn session_get(&self, session_id: &str) -> Option<ConversationSession> {
        self.store.snapshot(session_id).await
    }

    pub async fn session_delete(&self, session_id: &str) -> bool {
        self.store.delete(session_id).await
    }

    // ========================================================================
    // Pipeline and tooling surface
    // ========================================================================

    /// Run the agent pipeline directly, outside any conversation.
    pub async fn pipeline_run(
        &self,
        request: PipelineRequest,
    ) -> Result<PipelineResult, PipelineError> {
        self.pipeline.run(request).await
    }

    /// Surface a script's tunable parameters.
    pub fn extract_parameters(&self, code: &str) -> Vec<Parameter> {
        self.params.extract(code)
    }

    /// Validate and inject new parameter values into a script.
    pub fn update_parameters(
        &self,
        code: &str,
        values: &std::collections::HashMap<String, f64>,
    ) -> Result<String, ParameterError> {
        self.params.validate(values)?;
        Ok(self.params.inject(code, values))
    }

    /// Statically validate a script.
    pub fn validate_code(&self, code: &str) -> ValidationReport {
        self.validator.validate(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provider_parses_config() {
        let mut config = CoreConfig::default();
        config.default_provider = "anthropic".to_string();
        let service = DesignService::from_config(config);
        assert_eq!(service.default_provider(), ProviderKind::Anthropic);
    }

    #[test]
    fn test_update_parameters_validates_first() {
        let service = DesignService::from_config(CoreConfig::default());
        let mut values = std::collections::HashMap::new();
        values.insert("length".to_string(), 0.0);
        let result = service.update_parameters("length = 10\nresult = None\n", &values);
        assert!(result.is_err());
    }
}
