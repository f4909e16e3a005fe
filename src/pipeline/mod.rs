// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent pipeline - design, validate, optimize, review.
//!
//! The pipeline turns a design brief into a validated CadQuery script:
//!
//! 1. **Design** - generate code (best model, vision when images exist)
//! 2. **Validation** - static checks, sandboxed execution, printability,
//!    fast-model review
//! 3. **Retry** - re-design with the collected error list while the budget
//!    allows
//! 4. **Optimization** - fast-model print tuning; silently discarded if the
//!    tuned code fails execution
//! 5. **Review** - fast vision model compares the result to the original
//!    intent (only when reference images exist)
//!
//! Only exhausted validation retries produce `success: false`; every other
//! stage failure is recorded in the trace and the last good code survives.

mod types;

pub use types::{
    PipelineRequest, PipelineResult, StageRole, TraceMessage, ValidationSummary,
};

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::executor::CadExecutor;
use crate::prompts::{self, OPTIMIZATION_AGENT_PROMPT, REVIEW_AGENT_PROMPT, VALIDATION_AGENT_PROMPT};
use crate::providers::{
    extract_code_block, extract_code_or_body, extract_json_object, LlmGateway, ModelRole,
    ModelRouter, ProviderKind,
};
use crate::types::{BoundingBox, ContextPart, ImageData, PrinterSettings};
use crate::validator::CodeValidator;

/// Token budget for the design and optimization stages.
const CODEGEN_MAX_TOKENS: u32 = 4000;

/// Token budget for fast-model analysis calls.
const ANALYSIS_MAX_TOKENS: u32 = 1000;

/// Per-run working state threaded through the stages.
struct DesignContext {
    prompt: String,
    provider: ProviderKind,
    model_override: Option<String>,
    images: Vec<ImageData>,
    existing_code: Option<String>,
    context_parts: Vec<ContextPart>,
    printer: PrinterSettings,

    code: Option<String>,
    bounding_box: Option<BoundingBox>,
    validation: Option<ValidationSummary>,
    pending_fixes: Vec<String>,
    suggestions: Vec<String>,
    iterations: u32,
    trace: Vec<TraceMessage>,
}

impl DesignContext {
    fn from_request(request: PipelineRequest) -> (Self, bool, bool) {
        let use_optimization = request.use_optimization;
        let use_review = request.use_review;
        (
            Self {
                prompt: request.prompt,
                provider: request.provider,
                model_override: request.model,
                images: request.images,
                existing_code: request.existing_code,
                context_parts: request.context_parts,
                printer: request.printer_settings.unwrap_or_default(),
                code: None,
                bounding_box: None,
                validation: None,
                pending_fixes: Vec::new(),
                suggestions: Vec::new(),
                iterations: 0,
                trace: Vec::new(),
            },
            use_optimization,
            use_review,
        )
    }

    fn is_valid(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.valid)
    }

    fn push_trace(&mut self, role: StageRole, content: impl Into<String>, data: serde_json::Value) {
        self.trace.push(TraceMessage::new(role, content, data));
    }
}

/// The multi-stage CAD generation pipeline.
pub struct AgentPipeline {
    gateway: Arc<LlmGateway>,
    executor: Arc<dyn CadExecutor>,
    router: Arc<dyn ModelRouter>,
    validator: CodeValidator,
    max_iterations: u32,
}

impl AgentPipeline {
    pub fn new(
        gateway: Arc<LlmGateway>,
        executor: Arc<dyn CadExecutor>,
        router: Arc<dyn ModelRouter>,
        max_iterations: u32,
    ) -> Self {
        Self {
            gateway,
            executor,
            router,
            validator: CodeValidator::new(),
            max_iterations,
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when there is nothing to design from: empty prompt, no
    /// images, and no existing code. Stage failures never surface as errors.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineResult, PipelineError> {
        if request.prompt.trim().is_empty()
            && request.images.is_empty()
            && request.existing_code.is_none()
        {
            return Err(PipelineError::InvalidInput(
                "design request needs a prompt, an image, or existing code".to_string(),
            ));
        }

        let (mut ctx, use_optimization, use_review) = DesignContext::from_request(request);

        self.run_design(&mut ctx).await;
        if ctx.code.is_none() {
            warn!("design stage produced no code");
            return Ok(build_result(
                ctx,
                false,
                Some("Design agent failed to generate code".to_string()),
            ));
        }

        self.run_validation(&mut ctx).await;

        while !ctx.is_valid() && ctx.iterations < self.max_iterations {
            debug!(iteration = ctx.iterations, "re-running design with fixes");
            self.run_design(&mut ctx).await;
            self.run_validation(&mut ctx).await;
        }

        if use_optimization && ctx.is_valid() {
            self.run_optimization(&mut ctx).await;
        }

        if use_review && !ctx.images.is_empty() && ctx.is_valid() {
            self.run_review(&mut ctx).await;
        }

        let success = ctx.is_valid();
        info!(success, iterations = ctx.iterations, "pipeline finished");
        Ok(build_result(ctx, success, None))
    }

    /// Design stage: generate CadQuery code from the brief.
    async fn run_design(&self, ctx: &mut DesignContext) {
        let mut parts: Vec<String> = Vec::new();

        if !ctx.images.is_empty() {
            if ctx.images.len() > 1 {
                parts.push(format!(
                    "I have provided {} reference images/sketches to guide the design.",
                    ctx.images.len()
                ));
            } else {
                parts.push("I have provided a reference image to guide the design.".to_string());
            }
        }

        parts.push(format!("Description: {}", ctx.prompt));

        if let Some(code) = &ctx.existing_code {
            parts.push(format!(
                "\nExisting code to modify:\n```python\n{code}\n```"
            ));
        }

        if !ctx.context_parts.is_empty() {
            parts.push("\nExisting parts in the project:".to_string());
            for part in &ctx.context_parts {
                parts.push(format!("\n### {}\n```python\n{}\n```", part.name, part.code));
            }
        }

        let with_fixes = !ctx.pending_fixes.is_empty();
        if with_fixes {
            let fixes: String = ctx
                .pending_fixes
                .iter()
                .map(|e| format!("- {e}"))
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("\n\nERRORS TO FIX:\n{fixes}"));
            parts.push("\nGenerate a corrected version of the code.".to_string());
        }

        let user_prompt = parts.join("\n");
        let system_prompt = prompts::design_system_prompt(&ctx.prompt, !ctx.images.is_empty());
        let model = self
            .router
            .resolve(ctx.provider, ModelRole::Design, ctx.model_override.as_deref());

        let response = if ctx.images.is_empty() {
            self.gateway
                .generate_text(
                    ctx.provider,
                    &model,
                    &system_prompt,
                    &user_prompt,
                    CODEGEN_MAX_TOKENS,
                )
                .await
        } else {
            self.gateway
                .generate_vision(
                    ctx.provider,
                    &model,
                    &system_prompt,
                    &user_prompt,
                    &ctx.images,
                    CODEGEN_MAX_TOKENS,
                )
                .await
        };

        match response {
            Ok(content) => {
                let code = extract_code_or_body(&content);
                let content = if with_fixes {
                    "Code generated with fixes"
                } else {
                    "Code generated"
                };
                ctx.push_trace(
                    StageRole::Design,
                    content,
                    json!({ "code_length": code.len() }),
                );
                ctx.code = Some(code);
            }
            Err(e) => {
                warn!(error = %e, "design stage failed");
                ctx.push_trace(
                    StageRole::Design,
                    format!("Error: {e}"),
                    json!({ "error": e.to_string() }),
                );
            }
        }
    }

    /// Validation stage: static checks, execution, printability, LLM review.
    ///
    /// Each completed validation closes one design+validate cycle, so the
    /// iteration counter advances here.
    async fn run_validation(&self, ctx: &mut DesignContext) {
        let Some(code) = ctx.code.clone() else {
            let summary = ValidationSummary {
                valid: false,
                errors: vec!["No code to validate".to_string()],
                warnings: Vec::new(),
            };
            ctx.push_trace(StageRole::Validation, "Invalid: 1 errors", summary.to_value());
            ctx.pending_fixes = summary.errors.clone();
            ctx.validation = Some(summary);
            ctx.iterations += 1;
            return;
        };

        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        let report = self.validator.validate(&code);
        if let Some(corrected) = report.corrected_code {
            ctx.code = Some(corrected);
        }
        errors.extend(report.errors);
        warnings.extend(report.warnings);

        let current = ctx.code.clone().unwrap_or(code);
        match self.executor.execute(&current).await {
            Ok(outcome) if outcome.success => {
                ctx.bounding_box = outcome.bounding_box;
                if let Some(bbox) = &ctx.bounding_box {
                    let overflow = bbox.overflow_within(&ctx.printer.build_volume);
                    if !overflow.fits() {
                        warnings.push(format!("Part exceeds build volume: {overflow}"));
                    }
                }
            }
            Ok(outcome) => {
                errors.push(format!(
                    "Execution error: {}",
                    outcome.error.unwrap_or_else(|| "Unknown error".to_string())
                ));
            }
            Err(e) => {
                errors.push(format!("Execution error: {e}"));
            }
        }

        // Fast-model review of the code; non-parseable output is skipped
        if errors.is_empty() {
            if let Some((issues, suggestions)) = self.run_code_review(ctx.provider, &current).await
            {
                warnings.extend(issues);
                ctx.suggestions.extend(suggestions);
            }
        }

        let valid = errors.is_empty();
        if valid {
            ctx.pending_fixes.clear();
        } else {
            ctx.pending_fixes = errors.clone();
            for error in &errors {
                for suggestion in self.validator.get_error_fix_suggestions(error) {
                    ctx.pending_fixes.push(format!("Hint: {suggestion}"));
                }
            }
        }

        let summary = ValidationSummary {
            valid,
            errors,
            warnings,
        };
        let content = if valid {
            "Valid".to_string()
        } else {
            format!("Invalid: {} errors", summary.errors.len())
        };
        ctx.push_trace(StageRole::Validation, content, summary.to_value());
        ctx.validation = Some(summary);
        ctx.iterations += 1;
    }

    /// Ask a fast model for latent issues in code that already executes.
    /// Returns (issues, suggestions); `None` when the call or parse fails.
    async fn run_code_review(
        &self,
        provider: ProviderKind,
        code: &str,
    ) -> Option<(Vec<String>, Vec<String>)> {
        let review_prompt = format!(
            "Analyze this CadQuery code for potential problems:\n\n\
             ```python\n{code}\n```\n\n\
             Check for:\n\
             1. Risky geometry operations (loft, complex sweeps)\n\
             2. Potentially problematic fillets/chamfers\n\
             3. Inconsistent dimensions\n\
             4. 3D printability issues (overhangs, thin walls)\n\n\
             Respond in JSON: {{\"issues\": [...], \"suggestions\": [...]}}"
        );

        let model = self
            .router
            .resolve(provider, ModelRole::ValidationReview, None);

        let content = self
            .gateway
            .generate_text(
                provider,
                &model,
                VALIDATION_AGENT_PROMPT,
                &review_prompt,
                ANALYSIS_MAX_TOKENS,
            )
            .await
            .ok()?;

        let review = extract_json_object(&content)?;
        Some((
            string_array(&review["issues"]),
            string_array(&review["suggestions"]),
        ))
    }

    /// Optimization stage: print tuning by a fast model, kept only when the
    /// tuned script still executes.
    async fn run_optimization(&self, ctx: &mut DesignContext) {
        let Some(code) = ctx.code.clone() else { return };

        let bbox_text = ctx
            .bounding_box
            .as_ref()
            .map(|b| format!("x={:.1}mm, y={:.1}mm, z={:.1}mm", b.x, b.y, b.z))
            .unwrap_or_else(|| "unknown".to_string());

        let optimization_prompt = format!(
            "Current CadQuery code:\n```python\n{code}\n```\n\n\
             Printer settings:\n\
             - Build volume: {:.0}x{:.0}x{:.0}mm\n\
             - Layer height: {}mm\n\
             - Min wall thickness: {}mm\n\n\
             Current dimensions: {bbox_text}\n\n\
             Existing suggestions: {}\n\n\
             Optimize the code for 3D printing if needed. If the code is already optimal, return it as is.\n\
             Make sure that:\n\
             1. Walls are thick enough (>= {}mm)\n\
             2. Overhangs are minimized or below 45 degrees\n\
             3. Details are printable at {}mm resolution\n\n\
             Return ONLY the optimized Python code.",
            ctx.printer.build_volume.x,
            ctx.printer.build_volume.y,
            ctx.printer.build_volume.z,
            ctx.printer.layer_height_mm,
            ctx.printer.min_wall_thickness_mm,
            ctx.suggestions.join("; "),
            ctx.printer.min_wall_thickness_mm,
            ctx.printer.layer_height_mm,
        );

        let model = self
            .router
            .resolve(ctx.provider, ModelRole::Optimization, None);

        let response = self
            .gateway
            .generate_text(
                ctx.provider,
                &model,
                OPTIMIZATION_AGENT_PROMPT,
                &optimization_prompt,
                CODEGEN_MAX_TOKENS,
            )
            .await;

        match response {
            Ok(content) => {
                let Some(optimized) = extract_code_block(&content) else {
                    return;
                };
                match self.executor.execute(&optimized).await {
                    Ok(outcome) if outcome.success => {
                        ctx.bounding_box = outcome.bounding_box;
                        ctx.code = Some(optimized);
                        ctx.push_trace(
                            StageRole::Optimization,
                            "Code optimized for 3D printing",
                            json!({ "bounding_box": ctx.bounding_box }),
                        );
                    }
                    Ok(outcome) => {
                        ctx.push_trace(
                            StageRole::Optimization,
                            "Optimization skipped - optimized code had errors",
                            json!({ "error": outcome.error }),
                        );
                    }
                    Err(e) => {
                        ctx.push_trace(
                            StageRole::Optimization,
                            "Optimization skipped - optimized code had errors",
                            json!({ "error": e.to_string() }),
                        );
                    }
                }
            }
            Err(e) => {
                ctx.push_trace(
                    StageRole::Optimization,
                    format!("Optimization failed: {e}"),
                    json!({ "error": e.to_string() }),
                );
            }
        }
    }

    /// Review stage: fast vision model compares the result to the request
    /// and the reference images.
    async fn run_review(&self, ctx: &mut DesignContext) {
        let code = ctx.code.clone().unwrap_or_default();
        let bbox_text = ctx
            .bounding_box
            .as_ref()
            .map(|b| format!("x={:.1}mm, y={:.1}mm, z={:.1}mm", b.x, b.y, b.z))
            .unwrap_or_else(|| "unknown".to_string());

        let review_prompt = format!(
            "Original prompt: {}\n\n\
             Generated code:\n```python\n{code}\n```\n\n\
             Final dimensions: {bbox_text}\n\n\
             Assess whether the code matches the original request; also compare \
             against the provided reference images.\n\
             Score from 1 to 10 and explain potential differences.\n\n\
             Respond in JSON: {{\"score\": X, \"matches\": true/false, \"differences\": [...], \"suggestions\": [...]}}",
            ctx.prompt
        );

        let model = self.router.resolve(ctx.provider, ModelRole::Review, None);

        let response = self
            .gateway
            .generate_vision(
                ctx.provider,
                &model,
                REVIEW_AGENT_PROMPT,
                &review_prompt,
                &ctx.images,
                ANALYSIS_MAX_TOKENS,
            )
            .await;

        match response {
            Ok(content) => {
                if let Some(review) = extract_json_object(&content) {
                    let score = review["score"]
                        .as_u64()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "N/A".to_string());
                    ctx.suggestions.extend(string_array(&review["suggestions"]));
                    ctx.push_trace(StageRole::Review, format!("Score: {score}/10"), review);
                }
            }
            Err(e) => {
                ctx.push_trace(
                    StageRole::Review,
                    format!("Review failed: {e}"),
                    json!({ "error": e.to_string() }),
                );
            }
        }
    }
}

fn build_result(ctx: DesignContext, success: bool, error: Option<String>) -> PipelineResult {
    PipelineResult {
        success,
        code: ctx.code,
        bounding_box: ctx.bounding_box,
        validation: ctx.validation,
        suggestions: ctx.suggestions,
        iterations: ctx.iterations,
        messages: ctx.trace,
        error,
    }
}

/// Collect the string elements of a JSON array field.
fn string_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_array() {
        let value = json!({"issues": ["a", "b", 3]});
        assert_eq!(string_array(&value["issues"]), vec!["a", "b"]);
        assert!(string_array(&value["missing"]).is_empty());
    }
}
