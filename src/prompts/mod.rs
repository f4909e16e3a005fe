// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Prompt library.
//!
//! Per-role system prompts for every agent in the pipeline and the
//! conversation engine, plus keyword-triggered reference blocks for the
//! CadQuery extension libraries (fasteners, gears, gridfinity bins).

mod patterns;
mod roles;

pub use patterns::{get_all_patterns, get_relevant_patterns};
pub use roles::{
    COORDINATOR_AGENT_PROMPT, DESIGNER_AGENT_PROMPT, DESIGN_AGENT_PROMPT,
    DESIGN_WITH_IMAGE_PROMPT, MANUFACTURING_AGENT_PROMPT, OPTIMIZATION_AGENT_PROMPT,
    PHYSICS_AGENT_PROMPT, REQUIREMENTS_AGENT_PROMPT, REVIEW_AGENT_PROMPT,
    VALIDATION_AGENT_PROMPT,
};

/// System prompt for the design stage, with library reference blocks
/// appended when the user prompt mentions a known component family.
pub fn design_system_prompt(user_prompt: &str, with_images: bool) -> String {
    let base = if with_images {
        DESIGN_WITH_IMAGE_PROMPT
    } else {
        DESIGN_AGENT_PROMPT
    };

    let patterns = get_relevant_patterns(user_prompt);
    if patterns.is_empty() {
        base.to_string()
    } else {
        format!("{base}\n\n{patterns}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_system_prompt_plain() {
        let prompt = design_system_prompt("a simple cube", false);
        assert_eq!(prompt, DESIGN_AGENT_PROMPT);
    }

    #[test]
    fn test_design_system_prompt_with_triggers() {
        let prompt = design_system_prompt("a bracket with M5 screw holes", false);
        assert!(prompt.starts_with(DESIGN_AGENT_PROMPT));
        assert!(prompt.contains("cq-warehouse"));
    }

    #[test]
    fn test_design_system_prompt_vision_base() {
        let prompt = design_system_prompt("a simple cube", true);
        assert_eq!(prompt, DESIGN_WITH_IMAGE_PROMPT);
    }
}
