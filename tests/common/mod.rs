// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared test doubles: a scripted LLM backend and a closure-driven CAD
//! executor, so scenarios run without network or a Python toolchain.

// Each test binary uses a subset of these helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cadi::config::CoreConfig;
use cadi::conversation::PhaseKeywords;
use cadi::error::{ExecutorError, ProviderError};
use cadi::executor::{CadExecutor, ExecutionOutcome};
use cadi::providers::{LlmGateway, LlmProvider, ProviderKind};
use cadi::repository::PartVersioning;
use cadi::service::DesignService;
use cadi::types::{BoundingBox, ImageData};

/// A scripted response, matched by a substring of the system prompt.
enum Scripted {
    Ok(String),
    Transient,
}

/// LLM backend that answers from per-role response queues.
///
/// Each rule is a (system-prompt marker, queue). The specialist fan-out runs
/// concurrently, so responses are routed by role rather than call order.
#[derive(Default)]
pub struct ScriptedLlm {
    rules: Mutex<Vec<(String, VecDeque<Scripted>)>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response for calls whose system prompt contains
    /// `marker`.
    pub fn on(self, marker: &str, response: &str) -> Self {
        self.push(marker, Scripted::Ok(response.to_string()));
        self
    }

    /// Queue a transient failure (network timeout) for `marker`.
    pub fn on_transient_error(self, marker: &str) -> Self {
        self.push(marker, Scripted::Transient);
        self
    }

    fn push(&self, marker: &str, response: Scripted) {
        let mut rules = self.rules.lock().unwrap();
        if let Some((_, queue)) = rules.iter_mut().find(|(m, _)| m == marker) {
            queue.push_back(response);
        } else {
            rules.push((marker.to_string(), VecDeque::from([response])));
        }
    }

    fn respond(&self, system_prompt: &str) -> Result<String, ProviderError> {
        let mut rules = self.rules.lock().unwrap();
        for (marker, queue) in rules.iter_mut() {
            if system_prompt.contains(marker.as_str()) && !queue.is_empty() {
                return match queue.pop_front().unwrap() {
                    Scripted::Ok(response) => Ok(response),
                    Scripted::Transient => {
                        Err(ProviderError::NetworkError("scripted timeout".to_string()))
                    }
                };
            }
        }
        Err(ProviderError::ApiError {
            message: format!(
                "no scripted response for system prompt: {}",
                &system_prompt[..system_prompt.len().min(60)]
            ),
            status_code: None,
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate_text(
        &self,
        system_prompt: &str,
        _user_prompt: &str,
        _model: &str,
        _max_tokens: u32,
    ) -> Result<String, ProviderError> {
        self.respond(system_prompt)
    }

    async fn generate_vision(
        &self,
        system_prompt: &str,
        _user_prompt: &str,
        _images: &[ImageData],
        _model: &str,
        _max_tokens: u32,
    ) -> Result<String, ProviderError> {
        self.respond(system_prompt)
    }
}

/// Executor driven by a closure over the submitted code.
pub struct FnExecutor<F>(pub F);

#[async_trait]
impl<F> CadExecutor for FnExecutor<F>
where
    F: Fn(&str) -> Result<ExecutionOutcome, ExecutorError> + Send + Sync,
{
    async fn execute(&self, code: &str) -> Result<ExecutionOutcome, ExecutorError> {
        (self.0)(code)
    }
}

/// Executor that always succeeds with the given bounding box.
pub fn always_ok_executor(x: f64, y: f64, z: f64) -> Arc<dyn CadExecutor> {
    Arc::new(FnExecutor(move |_code: &str| {
        Ok(ExecutionOutcome::success(BoundingBox::new(x, y, z)))
    }))
}

/// Wire a [`DesignService`] around a scripted backend and executor.
pub fn service_with(
    scripted: ScriptedLlm,
    executor: Arc<dyn CadExecutor>,
    versioning: Option<Arc<dyn PartVersioning>>,
) -> DesignService {
    let config = CoreConfig::default();
    let gateway =
        Arc::new(LlmGateway::new().with_backend(ProviderKind::OpenAi, Arc::new(scripted)));
    DesignService::with_gateway(config, gateway, executor, versioning, PhaseKeywords::default())
}

/// Wire the lower-level store + engine pair for phase-targeted tests.
pub fn engine_with(
    scripted: ScriptedLlm,
    executor: Arc<dyn CadExecutor>,
    versioning: Option<Arc<dyn PartVersioning>>,
) -> (
    Arc<cadi::conversation::SessionStore>,
    cadi::conversation::ConversationEngine,
) {
    use cadi::pipeline::AgentPipeline;
    use cadi::providers::{ModelRouter, StaticModelRouter};

    let config = CoreConfig::default();
    let gateway =
        Arc::new(LlmGateway::new().with_backend(ProviderKind::OpenAi, Arc::new(scripted)));
    let router: Arc<dyn ModelRouter> = Arc::new(StaticModelRouter::from_config(&config));
    let pipeline = Arc::new(AgentPipeline::new(
        Arc::clone(&gateway),
        executor,
        Arc::clone(&router),
        config.max_pipeline_iterations,
    ));
    let store = Arc::new(cadi::conversation::SessionStore::new(
        std::time::Duration::from_secs(config.session_ttl_secs),
    ));

    let mut engine = cadi::conversation::ConversationEngine::new(
        Arc::clone(&store),
        gateway,
        router,
        pipeline,
    );
    if let Some(versioning) = versioning {
        engine = engine.with_versioning(versioning);
    }

    (store, engine)
}

/// A valid CadQuery script the validator accepts as-is.
pub const GOOD_CODE: &str =
    "import cadquery as cq\n\ndiameter = 100\nheight = 50\nresult = cq.Workplane(\"XY\").cylinder(height, diameter / 2)\n";

/// Wrap code in a python fence the way models answer.
pub fn fenced(code: &str) -> String {
    format!("```python\n{code}\n```")
}

/// Marker substrings of the per-role system prompts.
pub mod markers {
    pub const COORDINATOR: &str = "Coordinator of a team";
    pub const REQUIREMENTS: &str = "Requirements Agent";
    pub const DESIGNER: &str = "Designer Agent";
    pub const PHYSICS: &str = "Physics Agent";
    pub const MANUFACTURING: &str = "Manufacturing Agent";
    pub const DESIGN: &str = "design agent specialized";
    pub const VALIDATION: &str = "validation agent";
    pub const OPTIMIZATION: &str = "optimization agent";
    pub const REVIEW: &str = "review agent";
}
