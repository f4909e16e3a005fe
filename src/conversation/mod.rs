// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Conversational design sessions.
//!
//! A session is a phased dialogue between the user and a team of agents:
//! requirements gathering, specialist analysis, design, review, and
//! finalization. [`store::SessionStore`] owns the live sessions;
//! [`engine::ConversationEngine`] advances them one user message at a time.

pub mod engine;
pub mod store;
mod types;

pub use engine::{ConversationEngine, PhaseKeywords};
pub use store::{CreateSessionOptions, SessionStore};
pub use types::{
    AgentRole, Attachment, ConversationMessage, ConversationPhase, ConversationSession,
    MessageKind, Requirements, StepResult, MAX_ATTACHMENT_BYTES, MAX_SESSION_ATTACHMENTS,
};
