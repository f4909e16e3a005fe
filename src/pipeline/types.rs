// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pipeline request/result types.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderKind;
use crate::types::{BoundingBox, ContextPart, ImageData, PrinterSettings};

/// Stage that produced a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageRole {
    Design,
    Validation,
    Optimization,
    Review,
}

/// One entry in a pipeline run's trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceMessage {
    pub role: StageRole,
    pub content: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl TraceMessage {
    pub fn new(role: StageRole, content: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            role,
            content: content.into(),
            data,
        }
    }
}

/// Outcome of the validation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationSummary {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A request to generate (or regenerate) a part.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Natural-language description of the part.
    pub prompt: String,
    pub provider: ProviderKind,
    /// Model override for the design stage only.
    pub model: Option<String>,
    /// Reference images/sketches.
    pub images: Vec<ImageData>,
    /// Prior script when editing an existing part.
    pub existing_code: Option<String>,
    /// Sibling parts for assembly coherence.
    pub context_parts: Vec<ContextPart>,
    pub printer_settings: Option<PrinterSettings>,
    pub use_optimization: bool,
    pub use_review: bool,
}

impl PipelineRequest {
    pub fn new(prompt: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            prompt: prompt.into(),
            provider,
            model: None,
            images: Vec::new(),
            existing_code: None,
            context_parts: Vec::new(),
            printer_settings: None,
            use_optimization: true,
            use_review: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_images(mut self, images: Vec<ImageData>) -> Self {
        self.images = images;
        self
    }

    pub fn with_existing_code(mut self, code: impl Into<String>) -> Self {
        self.existing_code = Some(code.into());
        self
    }

    pub fn with_context_parts(mut self, parts: Vec<ContextPart>) -> Self {
        self.context_parts = parts;
        self
    }

    pub fn with_printer_settings(mut self, settings: PrinterSettings) -> Self {
        self.printer_settings = Some(settings);
        self
    }

    pub fn with_optimization(mut self, enabled: bool) -> Self {
        self.use_optimization = enabled;
        self
    }

    pub fn with_review(mut self, enabled: bool) -> Self {
        self.use_review = enabled;
        self
    }
}

/// Final output of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub code: Option<String>,
    pub bounding_box: Option<BoundingBox>,
    /// Absent only when the design stage never produced code.
    pub validation: Option<ValidationSummary>,
    pub suggestions: Vec<String>,
    /// Design+validate cycles performed.
    pub iterations: u32,
    pub messages: Vec<TraceMessage>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = PipelineRequest::new("a cube", ProviderKind::OpenAi)
            .with_model("gpt-5.2-pro")
            .with_optimization(false);
        assert_eq!(request.model.as_deref(), Some("gpt-5.2-pro"));
        assert!(!request.use_optimization);
        assert!(request.use_review);
    }

    #[test]
    fn test_stage_role_serialization() {
        assert_eq!(
            serde_json::to_string(&StageRole::Validation).unwrap(),
            "\"validation\""
        );
    }
}
