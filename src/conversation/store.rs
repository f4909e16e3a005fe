// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory session store.
//!
//! A concurrent map of sessions, each behind its own lock so independent
//! sessions progress in parallel while mutations to any single session
//! serialize. Idle sessions are evicted after a TTL measured from
//! `updated_at`; the sweep runs as a background task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::types::{ContextPart, ImageMediaType};

use super::types::{
    Attachment, ConversationSession, MessageKind, MAX_ATTACHMENT_BYTES, MAX_SESSION_ATTACHMENTS,
};

/// Options for creating a session.
#[derive(Debug, Default)]
pub struct CreateSessionOptions {
    pub part_id: Option<String>,
    pub initial_prompt: Option<String>,
    pub attachments: Vec<Attachment>,
    pub context_parts: Vec<ContextPart>,
}

/// Shared handle to a live session.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// Keyed store of live conversation sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Create a session and return a snapshot of its initial state.
    pub async fn create(
        &self,
        options: CreateSessionOptions,
    ) -> Result<ConversationSession, SessionError> {
        let mut session = ConversationSession::new(options.part_id, options.context_parts);

        for attachment in &options.attachments {
            validate_attachment(attachment)?;
        }
        if options.attachments.len() > MAX_SESSION_ATTACHMENTS {
            return Err(SessionError::InvalidInput(format!(
                "attachment limit is {MAX_SESSION_ATTACHMENTS} per session"
            )));
        }
        session.attachments = options.attachments;

        if let Some(prompt) = options.initial_prompt {
            session.requirements.description = prompt.clone();
            session.add_message(MessageKind::User, None, prompt, serde_json::Value::Null);
        }

        if !session.attachments.is_empty() {
            let sketches = session.attachments.iter().filter(|a| a.is_sketch).count();
            let images = session.attachments.len() - sketches;
            let mut parts = Vec::new();
            if sketches > 0 {
                parts.push(format!("{sketches} sketch(es)"));
            }
            if images > 0 {
                parts.push(format!("{images} image(s)"));
            }
            session.add_message(
                MessageKind::System,
                None,
                format!("{} attached as reference", parts.join(" and ")),
                serde_json::Value::Null,
            );
        }

        let snapshot = session.clone();
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %snapshot.id, "session created");

        Ok(snapshot)
    }

    /// Get a handle to a live session.
    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// Snapshot a session's current state.
    pub async fn snapshot(&self, session_id: &str) -> Option<ConversationSession> {
        let handle = self.get(session_id).await?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Delete a session. Returns whether it existed.
    pub async fn delete(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).is_some()
    }

    /// Append an attachment without running any phase handler.
    ///
    /// Rejects unknown MIME types, oversized payloads, and appends past the
    /// per-session cap; the session is untouched on rejection.
    pub async fn add_attachment(
        &self,
        session_id: &str,
        attachment: Attachment,
    ) -> Result<String, SessionError> {
        validate_attachment(&attachment)?;

        let handle = self
            .get(session_id)
            .await
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let mut session = handle.lock().await;
        if session.attachments.len() >= MAX_SESSION_ATTACHMENTS {
            return Err(SessionError::InvalidInput(format!(
                "attachment limit is {MAX_SESSION_ATTACHMENTS} per session"
            )));
        }

        let id = attachment.id.clone();
        session.attachments.push(attachment);
        session.updated_at = chrono::Utc::now().timestamp_millis();

        Ok(id)
    }

    /// Drop sessions idle past the TTL. Returns how many were evicted.
    pub async fn evict_expired(&self) -> usize {
        let cutoff = chrono::Utc::now().timestamp_millis() - self.ttl.as_millis() as i64;

        let mut sessions = self.sessions.write().await;
        let mut expired = Vec::new();
        for (id, handle) in sessions.iter() {
            let session = handle.lock().await;
            if session.updated_at < cutoff {
                expired.push(id.clone());
            }
        }

        for id in &expired {
            sessions.remove(id);
            debug!(session_id = %id, "session evicted");
        }
        expired.len()
    }

    /// Spawn the background TTL sweep.
    pub fn spawn_ttl_sweeper(store: &Arc<SessionStore>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let evicted = store.evict_expired().await;
                if evicted > 0 {
                    info!(evicted, "TTL sweep evicted sessions");
                }
            }
        })
    }
}

fn validate_attachment(attachment: &Attachment) -> Result<(), SessionError> {
    if ImageMediaType::from_mime(&attachment.mime_type).is_none() {
        return Err(SessionError::InvalidInput(format!(
            "unsupported attachment type: {}",
            attachment.mime_type
        )));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(attachment.data.trim())
        .map_err(|_| SessionError::InvalidInput("attachment is not valid base64".to_string()))?;

    if decoded.is_empty() {
        return Err(SessionError::InvalidInput(
            "attachment is empty".to_string(),
        ));
    }
    if decoded.len() > MAX_ATTACHMENT_BYTES {
        return Err(SessionError::InvalidInput(format!(
            "attachment exceeds {} bytes",
            MAX_ATTACHMENT_BYTES
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_attachment(name: &str) -> Attachment {
        Attachment::new("aGVsbG8=", "image/png", name, false)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store
            .create(CreateSessionOptions {
                initial_prompt: Some("a cube".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let snapshot = store.snapshot(&session.id).await.unwrap();
        assert_eq!(snapshot.requirements.description, "a cube");
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].kind, MessageKind::User);
    }

    #[tokio::test]
    async fn test_create_with_attachments_adds_system_note() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store
            .create(CreateSessionOptions {
                attachments: vec![
                    Attachment::new("aGVsbG8=", "image/png", "sketch", true),
                    png_attachment("photo"),
                ],
                ..Default::default()
            })
            .await
            .unwrap();

        let note = &session.messages[0];
        assert_eq!(note.kind, MessageKind::System);
        assert!(note.content.contains("1 sketch(es)"));
        assert!(note.content.contains("1 image(s)"));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.create(CreateSessionOptions::default()).await.unwrap();
        assert!(store.delete(&session.id).await);
        assert!(!store.delete(&session.id).await);
        assert!(store.get(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn test_attachment_cap() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.create(CreateSessionOptions::default()).await.unwrap();

        for i in 0..MAX_SESSION_ATTACHMENTS {
            store
                .add_attachment(&session.id, png_attachment(&format!("img{i}")))
                .await
                .unwrap();
        }

        let result = store
            .add_attachment(&session.id, png_attachment("one too many"))
            .await;
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));

        let snapshot = store.snapshot(&session.id).await.unwrap();
        assert_eq!(snapshot.attachments.len(), MAX_SESSION_ATTACHMENTS);
    }

    #[tokio::test]
    async fn test_attachment_rejects_bad_mime() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.create(CreateSessionOptions::default()).await.unwrap();

        let result = store
            .add_attachment(
                &session.id,
                Attachment::new("aGVsbG8=", "application/pdf", "doc", false),
            )
            .await;
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_attachment_rejects_invalid_base64() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.create(CreateSessionOptions::default()).await.unwrap();

        let result = store
            .add_attachment(
                &session.id,
                Attachment::new("not//valid base64!!", "image/png", "img", false),
            )
            .await;
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_attachment_unknown_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let result = store.add_attachment("missing", png_attachment("img")).await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_evict_expired() {
        let store = SessionStore::new(Duration::from_millis(0));
        let session = store.create(CreateSessionOptions::default()).await.unwrap();

        // TTL of zero: everything idle is immediately expired
        tokio::time::sleep(Duration::from_millis(5)).await;
        let evicted = store.evict_expired().await;
        assert_eq!(evicted, 1);
        assert!(store.get(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn test_fresh_session_survives_sweep() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let session = store.create(CreateSessionOptions::default()).await.unwrap();
        assert_eq!(store.evict_expired().await, 0);
        assert!(store.get(&session.id).await.is_some());
    }
}
