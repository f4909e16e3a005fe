// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Consumed persistence contracts.
//!
//! The orchestrator does not own storage. An embedding application supplies
//! these capabilities; the core calls them at well-defined points (final
//! artifact persistence, versioning of a part before it is replaced).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::Parameter;
use crate::types::BoundingBox;

/// Outcome status recorded with a persisted part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartStatus {
    Completed,
    Failed,
}

/// Why a version snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    Manual,
    Autosave,
    AiGenerate,
    Restore,
    BeforeRestore,
}

/// A finished generation, ready to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPart {
    pub part_id: String,
    pub code: String,
    pub prompt: String,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    pub status: PartStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Stores finished parts.
#[async_trait]
pub trait PartRepository: Send + Sync {
    async fn persist(&self, part: &PersistedPart) -> Result<()>;
}

/// Snapshots a part's current code before it is replaced.
#[async_trait]
pub trait PartVersioning: Send + Sync {
    async fn snapshot(&self, part_id: &str, source: VersionSource) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_source_serializes_snake_case() {
        let json = serde_json::to_string(&VersionSource::AiGenerate).unwrap();
        assert_eq!(json, "\"ai_generate\"");
        let json = serde_json::to_string(&VersionSource::BeforeRestore).unwrap();
        assert_eq!(json, "\"before_restore\"");
    }
}
