// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The phased conversation state machine.
//!
//! ```text
//! Gathering ──(ready / confidence ≥ 0.7)──▶ Analyzing
//! Analyzing ──(no concerns)──▶ Designing
//! Analyzing ──(concerns)──▶ Reviewing ──(approve)──▶ Designing
//!                           Reviewing ──(edits)────▶ Gathering
//! Designing ──(pipeline ok)──▶ Finalizing
//! Designing ──(pipeline failed)──▶ Reviewing
//! Finalizing ──("finalize")──▶ Complete
//! Finalizing ──("modify")──▶ Finalizing (asks what to change)
//! Finalizing ──("restart")──▶ Gathering
//! Finalizing ──(anything else)──▶ Designing (text appended to the brief)
//! ```
//!
//! Handlers hold the session lock only while mutating it. The specialist
//! fan-out in Analyzing runs on an immutable requirements snapshot with the
//! lock released, and the three specialists run concurrently - one failing
//! branch just drops its section from the compiled summary.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, SessionError};
use crate::pipeline::{AgentPipeline, PipelineRequest};
use crate::prompts::{
    COORDINATOR_AGENT_PROMPT, DESIGNER_AGENT_PROMPT, MANUFACTURING_AGENT_PROMPT,
    PHYSICS_AGENT_PROMPT, REQUIREMENTS_AGENT_PROMPT,
};
use crate::providers::{extract_json_object, LlmGateway, ModelRole, ModelRouter, ProviderKind};
use crate::repository::{PartVersioning, VersionSource};

use super::store::{SessionHandle, SessionStore};
use super::types::{
    AgentRole, ConversationPhase, MessageKind, StepResult,
};

/// Messages of history given to the requirements agent.
const HISTORY_WINDOW: usize = 10;

/// Concerns surfaced to the user at most, across all specialists.
const MAX_CONCERNS: usize = 5;

const CONVERSATION_MAX_TOKENS: u32 = 2000;
const SPECIALIST_MAX_TOKENS: u32 = 1500;
const INTRO_MAX_TOKENS: u32 = 1000;

/// Word sets driving the keyword phase decisions.
///
/// Substring matching on the last user message; the defaults carry both the
/// English keywords and the French vocabulary of the original user base.
/// Treat as configuration - do not grow ad hoc.
#[derive(Debug, Clone)]
pub struct PhaseKeywords {
    pub approve: Vec<String>,
    pub finalize: Vec<String>,
    pub modify: Vec<String>,
    pub restart: Vec<String>,
}

impl Default for PhaseKeywords {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|w| w.to_string()).collect();
        Self {
            approve: words(&[
                "launch", "continue", "ok", "yes", "go", "generate", "lancer", "continuer",
                "oui", "génère",
            ]),
            finalize: words(&[
                "finalize", "ok", "yes", "validate", "perfect", "finaliser", "oui", "valider",
                "parfait",
            ]),
            modify: words(&["modify", "change", "adjust", "modifier", "ajuste"]),
            restart: words(&["restart", "redo", "recommencer", "refaire"]),
        }
    }
}

impl PhaseKeywords {
    fn matches(words: &[String], text: &str) -> bool {
        words.iter().any(|word| text.contains(word.as_str()))
    }
}

/// Drives design conversations across their phases.
pub struct ConversationEngine {
    store: Arc<SessionStore>,
    gateway: Arc<LlmGateway>,
    router: Arc<dyn ModelRouter>,
    pipeline: Arc<AgentPipeline>,
    versioning: Option<Arc<dyn PartVersioning>>,
    keywords: PhaseKeywords,
    min_confidence_to_proceed: f64,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<LlmGateway>,
        router: Arc<dyn ModelRouter>,
        pipeline: Arc<AgentPipeline>,
    ) -> Self {
        Self {
            store,
            gateway,
            router,
            pipeline,
            versioning: None,
            keywords: PhaseKeywords::default(),
            min_confidence_to_proceed: 0.7,
        }
    }

    /// Wire up the part-versioning collaborator. Without it, prior code is
    /// replaced without a snapshot.
    pub fn with_versioning(mut self, versioning: Arc<dyn PartVersioning>) -> Self {
        self.versioning = Some(versioning);
        self
    }

    pub fn with_keywords(mut self, keywords: PhaseKeywords) -> Self {
        self.keywords = keywords;
        self
    }

    /// Open the conversation: coordinator greeting plus the first question.
    pub async fn start(
        &self,
        session_id: &str,
        provider: ProviderKind,
        _model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let handle = self.require_session(session_id).await?;

        let (description, has_visual) = {
            let session = handle.lock().await;
            (
                session.requirements.description.clone(),
                session.has_visual_reference(),
            )
        };

        let intro = self.coordinator_intro(provider, &description, has_visual).await;

        {
            let mut session = handle.lock().await;
            session.add_message(
                MessageKind::Agent,
                Some(AgentRole::Coordinator),
                intro.greeting,
                Value::Null,
            );
            if let Some(question) = intro.initial_question {
                session.add_message(
                    MessageKind::Question,
                    Some(AgentRole::Requirements),
                    question.content,
                    json!({ "options": question.options }),
                );
            }
        }

        Ok(self.step(&handle, true, false).await)
    }

    /// Process one user message, advancing the state machine.
    pub async fn send(
        &self,
        session_id: &str,
        message: &str,
        provider: ProviderKind,
        model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let text = message.trim();
        if text.is_empty() {
            return Err(SessionError::InvalidInput("empty message".to_string()));
        }

        let handle = self.require_session(session_id).await?;

        let phase = {
            let mut session = handle.lock().await;
            session.add_message(MessageKind::User, None, text, Value::Null);
            session.phase
        };
        debug!(session_id, ?phase, "processing user message");

        match phase {
            ConversationPhase::Gathering => self.handle_gathering(&handle, provider, model).await,
            ConversationPhase::Analyzing => self.run_analysis(&handle, provider, model).await,
            ConversationPhase::Designing => self.run_design_phase(&handle, provider, model).await,
            ConversationPhase::Reviewing => self.handle_reviewing(&handle, provider, model).await,
            ConversationPhase::Finalizing => self.handle_finalizing(&handle, provider, model).await,
            ConversationPhase::Complete => Ok(self.step(&handle, false, true).await),
        }
    }

    // ========================================================================
    // Phase handlers
    // ========================================================================

    async fn handle_gathering(
        &self,
        handle: &SessionHandle,
        provider: ProviderKind,
        model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let (history, requirements_json) = {
            let session = handle.lock().await;
            (
                session.history_window(HISTORY_WINDOW),
                serde_json::to_string_pretty(&session.requirements).unwrap_or_default(),
            )
        };

        let prompt = format!(
            "Conversation history:\n{history}\n\n\
             Current requirements:\n{requirements_json}\n\n\
             Analyze the user's latest answer and:\n\
             1. Update the requirements with the new information\n\
             2. Rate your confidence for each section (0.0 to 1.0)\n\
             3. Ask one follow-up question if needed, OR\n\
             4. Signal that you have enough information to start the design\n\n\
             Respond in JSON:\n\
             {{\n\
               \"updated_requirements\": {{ ... }},\n\
               \"confidence_scores\": {{ \"dimensions\": 0.8, \"purpose\": 0.9, ... }},\n\
               \"ready_to_design\": true/false,\n\
               \"next_question\": {{\n\
                 \"content\": \"Question to ask\",\n\
                 \"options\": [\"Option 1\", \"Option 2\"],\n\
                 \"agent\": \"requirements/designer/physics/manufacturing\"\n\
               }},\n\
               \"summary\": \"What I understood so far\"\n\
             }}"
        );

        let fast = self.router.resolve(provider, ModelRole::Conversation, None);
        let response = self
            .gateway
            .generate_text(
                provider,
                &fast,
                REQUIREMENTS_AGENT_PROMPT,
                &prompt,
                CONVERSATION_MAX_TOKENS,
            )
            .await;

        match response {
            Ok(content) => {
                if let Some(data) = extract_json_object(&content) {
                    let ready = {
                        let mut session = handle.lock().await;
                        session.requirements.merge_update(&data["updated_requirements"]);
                        session
                            .requirements
                            .update_confidence(&data["confidence_scores"]);

                        if let Some(summary) =
                            data["summary"].as_str().filter(|s| !s.is_empty())
                        {
                            session.add_message(
                                MessageKind::Agent,
                                Some(AgentRole::Requirements),
                                summary,
                                Value::Null,
                            );
                        }

                        // The confidence map holds exactly the canonical
                        // sections, so this scans dimensions, purpose,
                        // features, and manufacturing.
                        let confident = session
                            .requirements
                            .confidence
                            .values()
                            .all(|v| *v >= self.min_confidence_to_proceed);
                        let ready =
                            data["ready_to_design"].as_bool().unwrap_or(false) || confident;

                        if ready {
                            session.phase = ConversationPhase::Analyzing;
                        } else if data["next_question"].is_object() {
                            let question = &data["next_question"];
                            let role = AgentRole::from_name(
                                question["agent"].as_str().unwrap_or("requirements"),
                            );
                            session.add_message(
                                MessageKind::Question,
                                Some(role),
                                question["content"].as_str().unwrap_or(""),
                                json!({ "options": question["options"].clone() }),
                            );
                        }
                        ready
                    };

                    if ready {
                        return self.run_analysis(handle, provider, model).await;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "requirements agent failed");
                let mut session = handle.lock().await;
                session.add_message(
                    MessageKind::System,
                    None,
                    format!("Error while analyzing your answer: {e}"),
                    json!({ "error": e.to_string() }),
                );
            }
        }

        Ok(self.step(handle, true, false).await)
    }

    /// Specialist fan-out and transition out of Analyzing.
    async fn run_analysis(
        &self,
        handle: &SessionHandle,
        provider: ProviderKind,
        model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let (requirements_json, needs_physics) = {
            let mut session = handle.lock().await;
            session.add_message(
                MessageKind::Agent,
                Some(AgentRole::Coordinator),
                "Great, I have enough information now. Let me consult our specialists...",
                Value::Null,
            );
            let physics = session.requirements.physical.needs_structural_analysis
                || session.requirements.physical.expected_load_kg.is_some();
            (
                serde_json::to_string_pretty(&session.requirements).unwrap_or_default(),
                physics,
            )
        };

        // Concurrent fan-out on the requirements snapshot; the session lock
        // stays free while the specialists run.
        let designer_prompt = format!(
            "Project requirements:\n{requirements_json}\n\n\
             As the designer, analyze these requirements and provide:\n\
             1. Shape and proportion recommendations\n\
             2. Aesthetic suggestions\n\
             3. Ergonomic considerations if applicable\n\
             4. Questions or concerns\n\n\
             Respond in JSON:\n\
             {{\"recommendations\": [\"...\"], \"aesthetic_notes\": \"...\", \
             \"ergonomic_notes\": \"...\", \"concerns\": [\"...\"], \"design_approach\": \"...\"}}"
        );
        let physics_prompt = format!(
            "Project requirements:\n{requirements_json}\n\n\
             As a mechanical engineer, analyze:\n\
             1. Required structural strength\n\
             2. Potential stress points\n\
             3. Recommended wall thickness\n\
             4. Optimal print orientation for strength\n\n\
             Respond in JSON:\n\
             {{\"structural_assessment\": \"...\", \"stress_points\": [\"...\"], \
             \"recommended_wall_thickness\": 0.0, \"reinforcement_suggestions\": [\"...\"], \
             \"print_orientation\": \"...\"}}"
        );
        let manufacturing_prompt = format!(
            "Project requirements:\n{requirements_json}\n\n\
             As an additive manufacturing expert, analyze:\n\
             1. Printability of the part\n\
             2. Required supports\n\
             3. Optimal orientation\n\
             4. Recommended print settings\n\
             5. Potential issues (overhangs, bridges, etc.)\n\n\
             Respond in JSON:\n\
             {{\"printability_score\": 8, \"support_assessment\": \"...\", \
             \"optimal_orientation\": \"...\", \"print_settings\": {{\"layer_height\": 0.2, \"infill\": 20}}, \
             \"potential_issues\": [\"...\"], \"recommendations\": [\"...\"]}}"
        );

        let designer_fut = self.run_specialist(provider, DESIGNER_AGENT_PROMPT, &designer_prompt);
        let physics_fut = async {
            if needs_physics {
                self.run_specialist(provider, PHYSICS_AGENT_PROMPT, &physics_prompt)
                    .await
            } else {
                None
            }
        };
        let manufacturing_fut =
            self.run_specialist(provider, MANUFACTURING_AGENT_PROMPT, &manufacturing_prompt);

        let (designer, physics, manufacturing) =
            tokio::join!(designer_fut, physics_fut, manufacturing_fut);

        let mut analyses: Vec<(&str, Value)> = Vec::new();
        if let Some(data) = designer {
            analyses.push(("designer", data));
        }
        if let Some(data) = physics {
            analyses.push(("physics", data));
        }
        if let Some(data) = manufacturing {
            analyses.push(("manufacturing", data));
        }
        info!(specialists = analyses.len(), "analysis fan-out complete");

        let summary = compile_analysis_summary(&analyses);
        let concerns = extract_concerns(&analyses);

        let proceed_to_design = {
            let mut session = handle.lock().await;
            let analyses_map: serde_json::Map<String, Value> = analyses
                .iter()
                .map(|(agent, data)| (agent.to_string(), data.clone()))
                .collect();
            session.add_message(
                MessageKind::Agent,
                Some(AgentRole::Coordinator),
                summary,
                json!({ "analyses": analyses_map }),
            );

            if concerns.is_empty() {
                session.phase = ConversationPhase::Designing;
                true
            } else {
                let bullets: String = concerns
                    .iter()
                    .map(|c| format!("- {c}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                session.add_message(
                    MessageKind::Question,
                    Some(AgentRole::Coordinator),
                    format!(
                        "Our specialists have a few questions before we continue:\n\n{bullets}\n\n\
                         Would you like to adjust anything, or should I start the design?"
                    ),
                    json!({ "options": ["Start the design", "I have changes"] }),
                );
                session.phase = ConversationPhase::Reviewing;
                false
            }
        };

        if proceed_to_design {
            return self.run_design_phase(handle, provider, model).await;
        }
        Ok(self.step(handle, true, false).await)
    }

    async fn handle_reviewing(
        &self,
        handle: &SessionHandle,
        provider: ProviderKind,
        model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let last = { handle.lock().await.last_message_lower() };

        if PhaseKeywords::matches(&self.keywords.approve, &last) {
            {
                handle.lock().await.phase = ConversationPhase::Designing;
            }
            return self.run_design_phase(handle, provider, model).await;
        }

        let mut session = handle.lock().await;
        session.phase = ConversationPhase::Gathering;
        session.add_message(
            MessageKind::Question,
            Some(AgentRole::Requirements),
            "Alright, what changes would you like to make?",
            Value::Null,
        );
        drop(session);

        Ok(self.step(handle, true, false).await)
    }

    /// Run the agent pipeline against the accumulated brief.
    async fn run_design_phase(
        &self,
        handle: &SessionHandle,
        provider: ProviderKind,
        model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let (brief, images, context_parts, part_id, had_code) = {
            let mut session = handle.lock().await;
            session.add_message(
                MessageKind::Agent,
                Some(AgentRole::Engineer),
                "Starting the design with our best model. This may take a moment...",
                Value::Null,
            );
            (
                session.requirements.design_brief(),
                session.all_images(),
                session.context_parts.clone(),
                session.part_id.clone(),
                session.generated_code.is_some(),
            )
        };

        let has_visuals = !images.is_empty();
        let mut request = PipelineRequest::new(brief, provider)
            .with_images(images)
            .with_context_parts(context_parts)
            .with_optimization(true)
            .with_review(has_visuals);
        if let Some(model) = model {
            request = request.with_model(model);
        }

        let result = match self.pipeline.run(request).await {
            Ok(result) => result,
            Err(PipelineError::InvalidInput(message)) => {
                return Err(SessionError::InvalidInput(message));
            }
        };

        if result.success && result.code.is_some() {
            // Version the prior artifact before replacing it
            if had_code {
                if let (Some(part_id), Some(versioning)) = (&part_id, &self.versioning) {
                    if let Err(e) = versioning.snapshot(part_id, VersionSource::AiGenerate).await {
                        warn!(error = %e, "part versioning snapshot failed");
                    }
                }
            }

            let mut session = handle.lock().await;
            session.generated_code = result.code.clone();
            session.phase = ConversationPhase::Finalizing;

            session.add_message(
                MessageKind::Code,
                Some(AgentRole::Engineer),
                "Here is the generated code:",
                json!({ "code": result.code, "bounding_box": result.bounding_box }),
            );

            if let Some(validation) = &result.validation {
                if !validation.warnings.is_empty() {
                    let bullets: String = validation
                        .warnings
                        .iter()
                        .map(|w| format!("- {w}"))
                        .collect::<Vec<_>>()
                        .join("\n");
                    session.add_message(
                        MessageKind::Validation,
                        Some(AgentRole::Validator),
                        format!("A few notes:\n{bullets}"),
                        Value::Null,
                    );
                }
            }

            if !result.suggestions.is_empty() {
                let bullets: String = result
                    .suggestions
                    .iter()
                    .map(|s| format!("- {s}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                session.add_message(
                    MessageKind::Suggestion,
                    Some(AgentRole::Coordinator),
                    format!("Improvement suggestions:\n{bullets}"),
                    Value::Null,
                );
            }

            session.add_message(
                MessageKind::Question,
                Some(AgentRole::Coordinator),
                "The design is ready! Would you like changes, or should I finalize it?",
                json!({ "options": ["Finalize", "Modify", "Restart"] }),
            );
        } else {
            let reason = result
                .error
                .clone()
                .or_else(|| {
                    result
                        .validation
                        .as_ref()
                        .and_then(|v| v.errors.first().cloned())
                })
                .unwrap_or_else(|| "unknown error".to_string());

            let mut session = handle.lock().await;
            session.add_message(
                MessageKind::Agent,
                Some(AgentRole::Engineer),
                format!(
                    "Sorry, I ran into a problem: {reason}. \
                     Would you like to retry with different parameters?"
                ),
                json!({ "iterations": result.iterations }),
            );
            session.phase = ConversationPhase::Reviewing;
        }

        Ok(self.step(handle, true, false).await)
    }

    async fn handle_finalizing(
        &self,
        handle: &SessionHandle,
        provider: ProviderKind,
        model: Option<&str>,
    ) -> Result<StepResult, SessionError> {
        let last = { handle.lock().await.last_message_lower() };

        if PhaseKeywords::matches(&self.keywords.finalize, &last) {
            let mut session = handle.lock().await;
            session.phase = ConversationPhase::Complete;
            session.add_message(
                MessageKind::Agent,
                Some(AgentRole::Coordinator),
                "Excellent! The design is finalized. You can now execute and export it.",
                Value::Null,
            );
            drop(session);
            return Ok(self.step(handle, false, true).await);
        }

        if PhaseKeywords::matches(&self.keywords.modify, &last) {
            // Only ask; the next user turn carries the changes and triggers
            // the re-design.
            let mut session = handle.lock().await;
            session.add_message(
                MessageKind::Question,
                Some(AgentRole::Engineer),
                "What changes would you like?",
                Value::Null,
            );
            drop(session);
            return Ok(self.step(handle, true, false).await);
        }

        if PhaseKeywords::matches(&self.keywords.restart, &last) {
            let mut session = handle.lock().await;
            session.phase = ConversationPhase::Gathering;
            session.requirements.reset_keeping_description();
            session.generated_code = None;
            session.add_message(
                MessageKind::Question,
                Some(AgentRole::Requirements),
                "Alright, let's start over. Can you describe again what you would like to create?",
                Value::Null,
            );
            drop(session);
            return Ok(self.step(handle, true, false).await);
        }

        // Free-form text is treated as a modification request
        {
            let mut session = handle.lock().await;
            let modification = session
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            session.requirements.description =
                format!("{}\n\nRequested modification: {modification}", session.requirements.description);
            session.phase = ConversationPhase::Designing;
        }
        self.run_design_phase(handle, provider, model).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn require_session(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        self.store
            .get(session_id)
            .await
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    async fn step(&self, handle: &SessionHandle, needs_response: bool, complete: bool) -> StepResult {
        let session = handle.lock().await;
        StepResult {
            session: session.clone(),
            needs_response,
            complete,
        }
    }

    /// One specialist call: fast model, JSON out. `None` on any failure -
    /// the caller just omits the section.
    async fn run_specialist(
        &self,
        provider: ProviderKind,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Option<Value> {
        let fast = self.router.resolve(provider, ModelRole::Conversation, None);
        let content = self
            .gateway
            .generate_text(provider, &fast, system_prompt, user_prompt, SPECIALIST_MAX_TOKENS)
            .await
            .map_err(|e| warn!(error = %e, "specialist call failed"))
            .ok()?;
        extract_json_object(&content)
    }

    async fn coordinator_intro(
        &self,
        provider: ProviderKind,
        description: &str,
        has_visual: bool,
    ) -> CoordinatorIntro {
        let mut context = String::new();
        if !description.is_empty() {
            context.push_str(&format!(
                "\n\nThe user already said: \"{description}\""
            ));
        }
        if has_visual {
            context.push_str("\n\nThe user provided a reference image.");
        }

        let prompt = format!(
            "You coordinate a team of AI agents for 3D design.{context}\n\n\
             Generate:\n\
             1. A short, engaging welcome message\n\
             2. The first relevant questions to ask\n\n\
             Respond in JSON:\n\
             {{\n\
               \"greeting\": \"Welcome message...\",\n\
               \"initial_questions\": {{\n\
                 \"content\": \"Questions to ask...\",\n\
                 \"options\": [\"Option 1\", \"Option 2\"]\n\
               }}\n\
             }}"
        );

        let fast = self.router.resolve(provider, ModelRole::Conversation, None);
        let response = self
            .gateway
            .generate_text(provider, &fast, COORDINATOR_AGENT_PROMPT, &prompt, INTRO_MAX_TOKENS)
            .await;

        if let Ok(content) = response {
            if let Some(data) = extract_json_object(&content) {
                if let Some(greeting) = data["greeting"].as_str() {
                    let initial_question =
                        data["initial_questions"]["content"].as_str().map(|content| {
                            IntroQuestion {
                                content: content.to_string(),
                                options: data["initial_questions"]["options"].clone(),
                            }
                        });
                    return CoordinatorIntro {
                        greeting: greeting.to_string(),
                        initial_question,
                    };
                }
            }
        }

        // Canned fallback so the conversation always opens
        CoordinatorIntro {
            greeting: "Hello! I am your 3D design assistant. I will coordinate a team of \
                       experts to help you create your part."
                .to_string(),
            initial_question: Some(IntroQuestion {
                content: "To get started, can you describe what you would like to create? \
                          What is this part for?"
                    .to_string(),
                options: json!([]),
            }),
        }
    }
}

struct CoordinatorIntro {
    greeting: String,
    initial_question: Option<IntroQuestion>,
}

struct IntroQuestion {
    content: String,
    options: Value,
}

/// Per-agent sections of the compiled analysis message.
fn compile_analysis_summary(analyses: &[(&str, Value)]) -> String {
    let mut parts = vec!["Here is our team's analysis:\n".to_string()];

    for (agent, data) in analyses {
        match *agent {
            "designer" => {
                parts.push("**Designer:**".to_string());
                if let Some(approach) = data["design_approach"].as_str() {
                    parts.push(format!("  Approach: {approach}"));
                }
                let recommendations = string_items(&data["recommendations"], 3);
                if !recommendations.is_empty() {
                    parts.push(format!("  Recommendations: {}", recommendations.join(", ")));
                }
            }
            "physics" => {
                parts.push("**Mechanical Engineer:**".to_string());
                if let Some(assessment) = data["structural_assessment"].as_str() {
                    parts.push(format!("  Assessment: {assessment}"));
                }
                if let Some(wall) = data["recommended_wall_thickness"].as_f64() {
                    parts.push(format!("  Recommended wall thickness: {wall}mm"));
                }
            }
            "manufacturing" => {
                parts.push("**Manufacturing Expert:**".to_string());
                if let Some(score) = data["printability_score"].as_u64() {
                    parts.push(format!("  Printability score: {score}/10"));
                }
                if let Some(orientation) = data["optimal_orientation"].as_str() {
                    parts.push(format!("  Orientation: {orientation}"));
                }
                let issues = string_items(&data["potential_issues"], 2);
                if !issues.is_empty() {
                    parts.push(format!("  Watch points: {}", issues.join(", ")));
                }
            }
            _ => {}
        }
    }

    parts.join("\n")
}

/// Up to two concerns and two potential issues per specialist, five total.
fn extract_concerns(analyses: &[(&str, Value)]) -> Vec<String> {
    let mut concerns = Vec::new();
    for (_, data) in analyses {
        concerns.extend(string_items(&data["concerns"], 2));
        concerns.extend(string_items(&data["potential_issues"], 2));
    }
    concerns.truncate(MAX_CONCERNS);
    concerns
}

fn string_items(value: &Value, limit: usize) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching() {
        let keywords = PhaseKeywords::default();
        assert!(PhaseKeywords::matches(&keywords.approve, "ok, launch it"));
        assert!(PhaseKeywords::matches(&keywords.approve, "oui, lancer"));
        assert!(PhaseKeywords::matches(&keywords.finalize, "finalize please"));
        assert!(PhaseKeywords::matches(&keywords.restart, "let's restart"));
        assert!(!PhaseKeywords::matches(&keywords.modify, "looks great"));
    }

    #[test]
    fn test_compile_analysis_summary_sections() {
        let analyses = vec![
            (
                "designer",
                json!({
                    "design_approach": "rounded cylinder",
                    "recommendations": ["keep it simple", "wide base", "low center", "ignored"]
                }),
            ),
            (
                "manufacturing",
                json!({
                    "printability_score": 9,
                    "optimal_orientation": "flat on base",
                    "potential_issues": []
                }),
            ),
        ];
        let summary = compile_analysis_summary(&analyses);
        assert!(summary.contains("**Designer:**"));
        assert!(summary.contains("Approach: rounded cylinder"));
        assert!(summary.contains("keep it simple, wide base, low center"));
        assert!(!summary.contains("ignored"));
        assert!(summary.contains("Printability score: 9/10"));
        assert!(!summary.contains("**Mechanical Engineer:**"));
    }

    #[test]
    fn test_extract_concerns_caps_at_five() {
        let analyses = vec![
            (
                "designer",
                json!({"concerns": ["c1", "c2", "c3"]}),
            ),
            (
                "physics",
                json!({"concerns": ["p1", "p2"]}),
            ),
            (
                "manufacturing",
                json!({"potential_issues": ["m1", "m2", "m3"]}),
            ),
        ];
        let concerns = extract_concerns(&analyses);
        assert_eq!(concerns.len(), MAX_CONCERNS);
        // Two per list, in specialist order
        assert_eq!(concerns, vec!["c1", "c2", "p1", "p2", "m1"]);
    }

    #[test]
    fn test_extract_concerns_empty() {
        let analyses = vec![("designer", json!({"recommendations": ["r"]}))];
        assert!(extract_concerns(&analyses).is_empty());
    }
}
