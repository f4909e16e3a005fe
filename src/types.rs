// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for the Cadi orchestrator.
//!
//! This module defines the fundamental data structures shared across the
//! pipeline and conversation engine: bounding boxes, printer settings,
//! image payloads, and sibling-part context.

use serde::{Deserialize, Serialize};

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned extents of a generated model, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Per-axis overflow beyond a build volume. Zero on axes that fit.
    pub fn overflow_within(&self, build: &BuildVolume) -> BuildOverflow {
        BuildOverflow {
            x: (self.x - build.x).max(0.0),
            y: (self.y - build.y).max(0.0),
            z: (self.z - build.z).max(0.0),
        }
    }
}

/// A printer's maximum print envelope, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildVolume {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// How far a part exceeds the build volume on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildOverflow {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BuildOverflow {
    pub fn fits(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl std::fmt::Display for BuildOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "x=+{:.1}mm, y=+{:.1}mm, z=+{:.1}mm",
            self.x, self.y, self.z
        )
    }
}

/// Target printer constraints used for printability checks and the
/// optimization stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterSettings {
    pub build_volume: BuildVolume,
    pub layer_height_mm: f64,
    pub min_wall_thickness_mm: f64,
    pub nozzle_diameter_mm: f64,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            build_volume: BuildVolume {
                x: 220.0,
                y: 220.0,
                z: 250.0,
            },
            layer_height_mm: 0.2,
            min_wall_thickness_mm: 1.2,
            nozzle_diameter_mm: 0.4,
        }
    }
}

// ============================================================================
// Images
// ============================================================================

/// Supported image media types for vision calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Parse a MIME string; `None` for anything outside the allowed set.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

/// A base64-encoded image payload, as passed to vision-capable models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Base64-encoded binary payload.
    pub data: String,
    pub media_type: ImageMediaType,
}

impl ImageData {
    pub fn new(data: impl Into<String>, media_type: ImageMediaType) -> Self {
        Self {
            data: data.into(),
            media_type,
        }
    }
}

// ============================================================================
// Assembly context
// ============================================================================

/// A sibling part referenced for assembly coherence: the generated code of
/// another part in the same project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPart {
    pub name: String,
    pub code: String,
}

impl ContextPart {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}
