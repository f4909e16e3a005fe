// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Model routing policy.
//!
//! Every pipeline stage has a role; the router maps (provider, role) to a
//! concrete model id. Code synthesis gets the best model, everything else
//! the fast one. The policy is a trait so tests can pin deterministic
//! models.

use std::collections::HashMap;

use crate::config::CoreConfig;

use super::ProviderKind;

/// What a model call is for. Determines fast vs best selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Final CAD code synthesis.
    Design,
    /// Post-validation LLM review of generated code.
    ValidationReview,
    /// Print-optimization pass.
    Optimization,
    /// Intent-match review against the original request.
    Review,
    /// Conversation-side agent chatter (requirements, specialists, intro).
    Conversation,
}

/// Strategy mapping a role to a model id.
pub trait ModelRouter: Send + Sync {
    /// Resolve the model for a call. `override_model` wins only for the
    /// design role; analysis roles always use the fast model.
    fn resolve(
        &self,
        provider: ProviderKind,
        role: ModelRole,
        override_model: Option<&str>,
    ) -> String;
}

/// Router over static fast/best model tables.
pub struct StaticModelRouter {
    fast: HashMap<ProviderKind, String>,
    best: HashMap<ProviderKind, String>,
}

impl StaticModelRouter {
    pub fn new(fast: HashMap<ProviderKind, String>, best: HashMap<ProviderKind, String>) -> Self {
        Self { fast, best }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        let mut fast = HashMap::new();
        let mut best = HashMap::new();

        for (name, kind) in [
            ("openai", ProviderKind::OpenAi),
            ("anthropic", ProviderKind::Anthropic),
        ] {
            if let Some(model) = config.fast_models.get(name) {
                fast.insert(kind, model.clone());
            }
            if let Some(model) = config.best_models.get(name) {
                best.insert(kind, model.clone());
            }
        }

        Self { fast, best }
    }

    fn fast_for(&self, provider: ProviderKind) -> String {
        self.fast
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    fn best_for(&self, provider: ProviderKind) -> String {
        self.best
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| provider.default_model().to_string())
    }
}

impl ModelRouter for StaticModelRouter {
    fn resolve(
        &self,
        provider: ProviderKind,
        role: ModelRole,
        override_model: Option<&str>,
    ) -> String {
        match role {
            ModelRole::Design => override_model
                .map(String::from)
                .unwrap_or_else(|| self.best_for(provider)),
            ModelRole::ValidationReview
            | ModelRole::Optimization
            | ModelRole::Review
            | ModelRole::Conversation => self.fast_for(provider),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> StaticModelRouter {
        StaticModelRouter::from_config(&CoreConfig::default())
    }

    #[test]
    fn test_design_uses_best_by_default() {
        let model = router().resolve(ProviderKind::Anthropic, ModelRole::Design, None);
        assert_eq!(model, "claude-opus-4-5-20251101");
    }

    #[test]
    fn test_design_honors_override() {
        let model = router().resolve(
            ProviderKind::Anthropic,
            ModelRole::Design,
            Some("claude-sonnet-4-5-20250929"),
        );
        assert_eq!(model, "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn test_analysis_roles_ignore_override() {
        let router = router();
        for role in [
            ModelRole::ValidationReview,
            ModelRole::Optimization,
            ModelRole::Review,
            ModelRole::Conversation,
        ] {
            let model = router.resolve(ProviderKind::OpenAi, role, Some("gpt-5.2-pro"));
            assert_eq!(model, "gpt-5-nano", "role {role:?} must use the fast model");
        }
    }
}
