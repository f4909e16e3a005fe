// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session, message, and requirements types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BuildVolume, ContextPart, ImageData, ImageMediaType};

/// Hard cap on attachments per session.
pub const MAX_SESSION_ATTACHMENTS: usize = 10;

/// Hard cap on a single attachment's decoded size.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Phases of the design conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationPhase {
    Gathering,
    Analyzing,
    Designing,
    Reviewing,
    Finalizing,
    Complete,
}

/// Kinds of messages in the conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Agent,
    Question,
    Suggestion,
    Code,
    Validation,
    System,
}

/// Specialist agent roles in the design process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Orchestrates the conversation, decides which agent speaks.
    Coordinator,
    /// Gathers requirements, asks clarifying questions.
    Requirements,
    /// Shape, aesthetics, ergonomics.
    Designer,
    /// Technical CAD implementation.
    Engineer,
    /// Structural integrity, loads, forces.
    Physics,
    /// 3D printing constraints, materials, tolerances.
    Manufacturing,
    /// Code validation and printability checks.
    Validator,
}

impl AgentRole {
    /// Resolve an agent name from model output; unknown names fall back to
    /// the requirements agent.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "coordinator" => Self::Coordinator,
            "designer" => Self::Designer,
            "engineer" => Self::Engineer,
            "physics" => Self::Physics,
            "manufacturing" => Self::Manufacturing,
            "validator" => Self::Validator,
            _ => Self::Requirements,
        }
    }
}

/// A message in the conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub kind: MessageKind,
    pub agent_role: Option<AgentRole>,
    pub content: String,
    #[serde(default)]
    pub data: Value,
    /// Milliseconds since the Unix epoch, monotonic within a session.
    pub timestamp: i64,
}

// ============================================================================
// Requirements
// ============================================================================

/// Desired dimensions, when the user has specified any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub specified: bool,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProperties {
    pub needs_structural_analysis: bool,
    #[serde(rename = "expected_load")]
    pub expected_load_kg: Option<f64>,
    pub material: String,
    #[serde(rename = "wall_thickness")]
    pub wall_thickness_mm: Option<f64>,
}

impl Default for PhysicalProperties {
    fn default() -> Self {
        Self {
            needs_structural_analysis: false,
            expected_load_kg: None,
            material: "PLA".to_string(),
            wall_thickness_mm: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aesthetics {
    pub style: String,
    pub finish: String,
    pub has_fillets: bool,
    #[serde(rename = "fillet_radius")]
    pub fillet_radius_mm: Option<f64>,
}

impl Default for Aesthetics {
    fn default() -> Self {
        Self {
            style: String::new(),
            finish: String::new(),
            has_fillets: true,
            fillet_radius_mm: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingConstraints {
    pub printer_type: String,
    pub max_build_volume: Option<BuildVolume>,
    #[serde(rename = "layer_height")]
    pub layer_height_mm: f64,
    pub needs_supports: Option<bool>,
    pub orientation_preference: Option<String>,
}

impl Default for ManufacturingConstraints {
    fn default() -> Self {
        Self {
            printer_type: "FDM".to_string(),
            max_build_volume: None,
            layer_height_mm: 0.2,
            needs_supports: None,
            orientation_preference: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConstraints {
    pub is_part_of_assembly: bool,
    pub mating_parts: Vec<String>,
    pub tolerances: HashMap<String, f64>,
}

/// Structured brief gathered from the conversation, updated by merging
/// partial agent output. Missing fields are always preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    pub description: String,
    pub purpose: String,
    pub dimensions: Dimensions,
    pub physical: PhysicalProperties,
    pub aesthetics: Aesthetics,
    pub features: Vec<String>,
    pub manufacturing: ManufacturingConstraints,
    pub assembly: AssemblyConstraints,
    /// Per-section completeness estimates in [0, 1].
    pub confidence: HashMap<String, f64>,
}

impl Default for Requirements {
    fn default() -> Self {
        let confidence = ["dimensions", "purpose", "features", "manufacturing"]
            .iter()
            .map(|section| (section.to_string(), 0.0))
            .collect();

        Self {
            description: String::new(),
            purpose: String::new(),
            dimensions: Dimensions::default(),
            physical: PhysicalProperties::default(),
            aesthetics: Aesthetics::default(),
            features: Vec::new(),
            manufacturing: ManufacturingConstraints::default(),
            assembly: AssemblyConstraints::default(),
            confidence,
        }
    }
}

impl Requirements {
    /// Reset everything except the description, for a restart.
    pub fn reset_keeping_description(&mut self) {
        let description = std::mem::take(&mut self.description);
        *self = Self {
            description,
            ..Self::default()
        };
    }

    /// Merge a partial update from the requirements agent, field by field.
    pub fn merge_update(&mut self, updates: &Value) {
        if let Some(s) = updates["description"].as_str() {
            self.description = s.to_string();
        }
        if let Some(s) = updates["purpose"].as_str() {
            self.purpose = s.to_string();
        }

        let dims = &updates["dimensions"];
        if dims.is_object() {
            if let Some(b) = dims["specified"].as_bool() {
                self.dimensions.specified = b;
            }
            merge_f64(&mut self.dimensions.length, &dims["length"]);
            merge_f64(&mut self.dimensions.width, &dims["width"]);
            merge_f64(&mut self.dimensions.height, &dims["height"]);
        }

        let phys = &updates["physical"];
        if phys.is_object() {
            if let Some(b) = phys["needs_structural_analysis"].as_bool() {
                self.physical.needs_structural_analysis = b;
            }
            merge_f64(&mut self.physical.expected_load_kg, &phys["expected_load"]);
            if let Some(s) = phys["material"].as_str() {
                self.physical.material = s.to_string();
            }
            merge_f64(
                &mut self.physical.wall_thickness_mm,
                &phys["wall_thickness"],
            );
        }

        let aest = &updates["aesthetics"];
        if aest.is_object() {
            if let Some(s) = aest["style"].as_str() {
                self.aesthetics.style = s.to_string();
            }
            if let Some(s) = aest["finish"].as_str() {
                self.aesthetics.finish = s.to_string();
            }
            if let Some(b) = aest["has_fillets"].as_bool() {
                self.aesthetics.has_fillets = b;
            }
            merge_f64(
                &mut self.aesthetics.fillet_radius_mm,
                &aest["fillet_radius"],
            );
        }

        if let Some(features) = updates["features"].as_array() {
            self.features = features
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect();
        }

        let mfg = &updates["manufacturing"];
        if mfg.is_object() {
            if let Some(s) = mfg["printer_type"].as_str() {
                self.manufacturing.printer_type = s.to_string();
            }
            if let Some(v) = mfg["layer_height"].as_f64() {
                self.manufacturing.layer_height_mm = v;
            }
            if let Some(b) = mfg["needs_supports"].as_bool() {
                self.manufacturing.needs_supports = Some(b);
            }
            if let Some(s) = mfg["orientation_preference"].as_str() {
                self.manufacturing.orientation_preference = Some(s.to_string());
            }
        }

        let asm = &updates["assembly"];
        if asm.is_object() {
            if let Some(b) = asm["is_part_of_assembly"].as_bool() {
                self.assembly.is_part_of_assembly = b;
            }
            if let Some(parts) = asm["mating_parts"].as_array() {
                self.assembly.mating_parts = parts
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
            }
            if let Some(tolerances) = asm["tolerances"].as_object() {
                for (key, value) in tolerances {
                    if let Some(v) = value.as_f64() {
                        self.assembly.tolerances.insert(key.clone(), v);
                    }
                }
            }
        }
    }

    /// Fold in confidence scores, clamped to [0, 1]. The confidence map is
    /// closed over the canonical sections; stray keys in the model's JSON
    /// are dropped so they can never gate a phase transition.
    pub fn update_confidence(&mut self, scores: &Value) {
        if let Some(scores) = scores.as_object() {
            for (section, value) in scores {
                if let (Some(slot), Some(v)) =
                    (self.confidence.get_mut(section), value.as_f64())
                {
                    *slot = v.clamp(0.0, 1.0);
                }
            }
        }
    }

    /// Build the design brief: non-empty fields concatenated in stable order.
    pub fn design_brief(&self) -> String {
        let mut parts = vec![format!("Create a 3D part: {}", self.description)];

        if !self.purpose.is_empty() {
            parts.push(format!("Purpose: {}", self.purpose));
        }

        if self.dimensions.specified {
            let mut dims = Vec::new();
            if let Some(length) = self.dimensions.length {
                dims.push(format!("length={length}mm"));
            }
            if let Some(width) = self.dimensions.width {
                dims.push(format!("width={width}mm"));
            }
            if let Some(height) = self.dimensions.height {
                dims.push(format!("height={height}mm"));
            }
            if !dims.is_empty() {
                parts.push(format!("Dimensions: {}", dims.join(", ")));
            }
        }

        if let Some(wall) = self.physical.wall_thickness_mm {
            parts.push(format!("Wall thickness: {wall}mm"));
        }

        if !self.features.is_empty() {
            parts.push(format!("Features: {}", self.features.join(", ")));
        }

        if !self.aesthetics.style.is_empty() {
            parts.push(format!("Style: {}", self.aesthetics.style));
        }

        if self.physical.material != "PLA" {
            parts.push(format!("Material: {}", self.physical.material));
        }

        if let Some(load) = self.physical.expected_load_kg {
            parts.push(format!("Expected load: {load}kg"));
        }

        if self.assembly.is_part_of_assembly {
            parts.push(format!(
                "Part of an assembly with: {}",
                self.assembly.mating_parts.join(", ")
            ));
        }

        parts.join("\n")
    }
}

fn merge_f64(target: &mut Option<f64>, value: &Value) {
    if let Some(v) = value.as_f64() {
        *target = Some(v);
    }
}

// ============================================================================
// Attachments and sessions
// ============================================================================

/// An uploaded image or sketch used as design reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    /// Base64-encoded binary payload.
    pub data: String,
    pub mime_type: String,
    pub name: String,
    pub is_sketch: bool,
}

impl Attachment {
    pub fn new(
        data: impl Into<String>,
        mime_type: impl Into<String>,
        name: impl Into<String>,
        is_sketch: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data: data.into(),
            mime_type: mime_type.into(),
            name: name.into(),
            is_sketch,
        }
    }
}

/// A live design conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    pub part_id: Option<String>,
    pub phase: ConversationPhase,
    pub messages: Vec<ConversationMessage>,
    pub requirements: Requirements,
    pub generated_code: Option<String>,
    pub attachments: Vec<Attachment>,
    pub context_parts: Vec<ContextPart>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub updated_at: i64,
}

impl ConversationSession {
    pub fn new(part_id: Option<String>, context_parts: Vec<ContextPart>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            part_id,
            phase: ConversationPhase::Gathering,
            messages: Vec::new(),
            requirements: Requirements::default(),
            generated_code: None,
            attachments: Vec::new(),
            context_parts,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message. Timestamps never go backwards within a session;
    /// simultaneous appends tie-break by arrival order.
    pub fn add_message(
        &mut self,
        kind: MessageKind,
        agent_role: Option<AgentRole>,
        content: impl Into<String>,
        data: Value,
    ) -> &ConversationMessage {
        let now = chrono::Utc::now().timestamp_millis();
        let timestamp = self
            .messages
            .last()
            .map(|m| m.timestamp.max(now))
            .unwrap_or(now);

        self.messages.push(ConversationMessage {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            agent_role,
            content: content.into(),
            data,
            timestamp,
        });
        self.updated_at = now.max(self.updated_at);

        self.messages.last().expect("just pushed")
    }

    /// Last user-visible message content, lowercased, for keyword decisions.
    pub fn last_message_lower(&self) -> String {
        self.messages
            .last()
            .map(|m| m.content.to_lowercase())
            .unwrap_or_default()
    }

    pub fn has_visual_reference(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// All attachments as vision-call payloads. Attachments with an
    /// unrecognized MIME type never make it into the session, so this is
    /// total.
    pub fn all_images(&self) -> Vec<ImageData> {
        self.attachments
            .iter()
            .filter_map(|att| {
                ImageMediaType::from_mime(&att.mime_type)
                    .map(|media_type| ImageData::new(att.data.clone(), media_type))
            })
            .collect()
    }

    /// Last `n` messages serialized as `[role]: content` lines.
    pub fn history_window(&self, n: usize) -> String {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..]
            .iter()
            .map(|m| {
                let role = m
                    .agent_role
                    .map(|r| format!("{r:?}").to_lowercase())
                    .unwrap_or_else(|| "user".to_string());
                format!("[{role}]: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of one conversation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub session: ConversationSession,
    pub needs_response: bool,
    pub complete: bool,
}
