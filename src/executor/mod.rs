// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sandboxed CAD execution.
//!
//! [`CadExecutor`] is the capability the pipeline consumes; the bundled
//! [`SubprocessExecutor`] pipes a harness script to a Python interpreter on
//! stdin and reads one JSON object back. Script failures come back as a
//! structured [`ExecutionOutcome`], never as an `Err` - only the adapter
//! itself (timeout, spawn, malformed output) errors.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecutorError;
use crate::types::BoundingBox;

/// Structured result of executing a CAD script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(bounding_box: BoundingBox) -> Self {
        Self {
            success: true,
            bounding_box: Some(bounding_box),
            error: None,
            traceback: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            bounding_box: None,
            error: Some(error.into()),
            traceback: None,
        }
    }
}

/// Capability for executing CadQuery scripts in a sandbox.
#[async_trait]
pub trait CadExecutor: Send + Sync {
    async fn execute(&self, code: &str) -> Result<ExecutionOutcome, ExecutorError>;
}

/// Executes scripts in a Python subprocess with a bounded deadline.
pub struct SubprocessExecutor {
    python: String,
    timeout: Duration,
}

impl SubprocessExecutor {
    pub fn new(python: impl Into<String>, timeout: Duration) -> Self {
        Self {
            python: python.into(),
            timeout,
        }
    }

    /// Wrap user code in the harness that measures the bounding box and
    /// prints one JSON object to stdout.
    fn build_harness(code: &str) -> String {
        let indented: String = code
            .lines()
            .map(|line| format!("    {line}\n"))
            .collect();

        format!(
            r#"import json

try:
    import cadquery as cq
    import math

{indented}
    if hasattr(result, 'val'):
        shape = result.val()
    else:
        shape = result

    bbox = shape.BoundingBox()
    output = {{
        "success": True,
        "bounding_box": {{
            "x": round(bbox.xlen, 3),
            "y": round(bbox.ylen, 3),
            "z": round(bbox.zlen, 3)
        }}
    }}
    print(json.dumps(output))
except Exception as e:
    import traceback
    output = {{"success": False, "error": str(e), "traceback": traceback.format_exc()}}
    print(json.dumps(output))
"#
        )
    }

    fn parse_output(stdout: &str) -> Result<ExecutionOutcome, ExecutorError> {
        #[derive(Deserialize)]
        struct RawOutput {
            success: bool,
            bounding_box: Option<BoundingBox>,
            error: Option<String>,
            traceback: Option<String>,
        }

        let raw: RawOutput = serde_json::from_str(stdout.trim())
            .map_err(|_| ExecutorError::MalformedOutput(stdout.trim().to_string()))?;

        Ok(ExecutionOutcome {
            success: raw.success,
            bounding_box: raw.bounding_box,
            error: raw.error,
            traceback: raw.traceback,
        })
    }
}

#[async_trait]
impl CadExecutor for SubprocessExecutor {
    async fn execute(&self, code: &str) -> Result<ExecutionOutcome, ExecutorError> {
        let harness = Self::build_harness(code);

        let mut child = Command::new(&self.python)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::SpawnFailed(e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExecutorError::SpawnFailed("stdin unavailable".to_string()))?;
        stdin.write_all(harness.as_bytes()).await?;
        drop(stdin);

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(ExecutorError::Timeout(self.timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(exit = ?output.status.code(), "CAD executor finished");

        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(ExecutionOutcome::failure(if stderr.is_empty() {
                "Unknown error".to_string()
            } else {
                stderr.into_owned()
            }));
        }

        Self::parse_output(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_indents_user_code() {
        let harness = SubprocessExecutor::build_harness("a = 1\nresult = a");
        assert!(harness.contains("    a = 1\n"));
        assert!(harness.contains("    result = a\n"));
        assert!(harness.contains("BoundingBox()"));
    }

    #[test]
    fn test_parse_success_output() {
        let outcome = SubprocessExecutor::parse_output(
            r#"{"success": true, "bounding_box": {"x": 100.0, "y": 100.0, "z": 50.0}}"#,
        )
        .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.bounding_box.unwrap().z, 50.0);
    }

    #[test]
    fn test_parse_failure_output() {
        let outcome = SubprocessExecutor::parse_output(
            r#"{"success": false, "error": "BRep_API: command not done"}"#,
        )
        .unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("BRep_API"));
    }

    #[test]
    fn test_parse_malformed_output() {
        let result = SubprocessExecutor::parse_output("Traceback (most recent call last) ...");
        assert!(matches!(result, Err(ExecutorError::MalformedOutput(_))));
    }

    #[tokio::test]
    async fn test_subprocess_round_trip_without_cadquery() {
        // Uses the system python; the harness fails at `import cadquery`
        // and must still come back as a structured failure.
        let executor = SubprocessExecutor::new("python3", Duration::from_secs(10));
        match executor.execute("result = None").await {
            Ok(outcome) => assert!(!outcome.success),
            // No python on PATH is fine for this test
            Err(ExecutorError::SpawnFailed(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
