// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parameter extraction and injection.
//!
//! A generated script's leading numeric assignments are surfaced as tunable
//! parameters: the prefix of top-level `name = number` lines before the
//! first real statement. Injection rewrites only the numeric literal of a
//! named assignment, preserving the rest of the line.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum accepted parameter value in mm.
pub const MIN_PARAMETER_MM: f64 = 0.01;

/// Maximum accepted parameter value in mm.
pub const MAX_PARAMETER_MM: f64 = 10_000.0;

/// A tunable dimension surfaced from a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Value in millimetres.
    pub value: f64,
    pub unit: String,
    /// 1-indexed line of the assignment.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// A rejected parameter value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{name}' must be greater than 0 (current value: {value})")]
    NonPositive { name: String, value: f64 },

    #[error("Parameter '{name}' is too small (minimum {MIN_PARAMETER_MM}mm)")]
    TooSmall { name: String },

    #[error("Parameter '{name}' is too large (maximum {MAX_PARAMETER_MM}mm)")]
    TooLarge { name: String },
}

static RE_NUMERIC_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(-?\d+(?:\.\d+)?)\s*(?:#.*)?$").unwrap()
});

static RE_ANY_ASSIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*=").unwrap());

/// Variable-name families that look like dimensions.
static DIMENSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(length|width|height|depth|thickness|diameter|radius)$",
        r"^(x|y|z)_?(size|dim|length|width)?$",
        r"^(hole|slot|groove)_?(diameter|radius|width|depth|size)?$",
        r"^(wall|edge|corner|fillet|chamfer|bevel)_?(thickness|radius|size)?$",
        r"^(margin|offset|spacing|gap|clearance)$",
        r"^(inner|outer)_?(diameter|radius|width|height)?$",
        // Anything ending with a dimension-related suffix
        r".*(length|width|height|depth|thickness|diameter|radius|size|mm|cm)$",
        // Anything starting with a dimension-related prefix
        r"^(min|max|total|base|top|bottom|left|right|front|back)_",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Names never treated as dimensions.
const SKIP_NAMES: &[&str] = &[
    "result",
    "cq",
    "workplane",
    "shape",
    "model",
    "part",
    "i",
    "j",
    "n",
    "count",
];

/// Extracts and injects tunable parameters from CadQuery code.
#[derive(Debug, Clone, Default)]
pub struct ParameterEngine;

impl ParameterEngine {
    pub fn new() -> Self {
        Self
    }

    /// Extract the leading numeric assignments that look like dimensions.
    ///
    /// The scan allows blank lines, comments, imports, and single-line
    /// docstrings above and between assignments, and halts at the first
    /// other statement.
    pub fn extract(&self, code: &str) -> Vec<Parameter> {
        let mut parameters = Vec::new();

        for (index, line) in code.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with("import ") || trimmed.starts_with("from ") {
                continue;
            }
            if is_single_line_docstring(trimmed) {
                continue;
            }

            if let Some(captures) = RE_NUMERIC_ASSIGN.captures(trimmed) {
                let name = captures[1].to_string();
                if is_dimension_parameter(&name) {
                    if let Ok(value) = captures[2].parse::<f64>() {
                        parameters.push(Parameter {
                            name,
                            value,
                            unit: "mm".to_string(),
                            line: index + 1,
                            min: None,
                            max: None,
                        });
                    }
                }
                continue;
            }

            // Non-numeric assignments don't end the scan
            if RE_ANY_ASSIGN.is_match(trimmed) {
                continue;
            }

            // First real statement: stop
            break;
        }

        parameters
    }

    /// Rewrite the numeric literal of each named assignment, leaving all
    /// other formatting intact. Whole numbers render without a decimal point.
    pub fn inject(&self, code: &str, new_values: &HashMap<String, f64>) -> String {
        let mut lines: Vec<String> = code.lines().map(String::from).collect();

        for (index, line) in code.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("import ")
                || trimmed.starts_with("from ")
                || is_single_line_docstring(trimmed)
            {
                continue;
            }

            if let Some(captures) = RE_NUMERIC_ASSIGN.captures(trimmed) {
                let name = &captures[1];
                if let Some(value) = new_values.get(name) {
                    let value_str = format_value(*value);
                    let pattern =
                        Regex::new(&format!(r"^(\s*{}\s*=\s*)[\d\.\-]+", regex::escape(name)))
                            .expect("parameter name is a valid identifier");
                    lines[index] = pattern
                        .replace(line, format!("${{1}}{value_str}"))
                        .into_owned();
                }
                continue;
            }

            if RE_ANY_ASSIGN.is_match(trimmed) {
                continue;
            }

            break;
        }

        let mut result = lines.join("\n");
        if code.ends_with('\n') {
            result.push('\n');
        }
        result
    }

    /// Validate replacement values: each must lie in (0.01, 10000] mm.
    pub fn validate(&self, new_values: &HashMap<String, f64>) -> Result<(), ParameterError> {
        for (name, value) in new_values {
            if *value <= 0.0 {
                return Err(ParameterError::NonPositive {
                    name: name.clone(),
                    value: *value,
                });
            }
            if *value < MIN_PARAMETER_MM {
                return Err(ParameterError::TooSmall { name: name.clone() });
            }
            if *value > MAX_PARAMETER_MM {
                return Err(ParameterError::TooLarge { name: name.clone() });
            }
        }
        Ok(())
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn is_single_line_docstring(trimmed: &str) -> bool {
    for quote in ["\"\"\"", "'''"] {
        if let Some(rest) = trimmed.strip_prefix(quote) {
            return rest.ends_with(quote) && !rest.is_empty();
        }
    }
    false
}

fn is_dimension_parameter(name: &str) -> bool {
    let name_lower = name.to_lowercase();

    if SKIP_NAMES.contains(&name_lower.as_str()) {
        return false;
    }

    if DIMENSION_PATTERNS.iter().any(|p| p.is_match(&name_lower)) {
        return true;
    }

    // A short plain word assigned a number is most likely a dimension
    name_lower.chars().all(|c| c.is_ascii_alphabetic()) && name_lower.len() <= 20
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "import cadquery as cq\n\nlength = 100\nwidth = 80\nwall_thickness = 3\nresult = cq.Workplane(\"XY\").box(length, width, 20)\n";

    fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_extract_basic() {
        let params = ParameterEngine::new().extract(SAMPLE);
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["length", "width", "wall_thickness"]);
        assert_eq!(params[0].value, 100.0);
        assert_eq!(params[0].line, 3);
        assert_eq!(params[2].value, 3.0);
    }

    #[test]
    fn test_extract_halts_at_first_statement() {
        let code = "import cadquery as cq\nlength = 50\nresult = cq.Workplane(\"XY\").box(length, 10, 10)\nheight = 30\n";
        let params = ParameterEngine::new().extract(code);
        // `result = ...` is an assignment but `result` is skipped; the scan
        // continues, so `height` after it is still picked up. A bare
        // expression halts it instead.
        assert!(params.iter().any(|p| p.name == "height"));

        let code = "length = 50\nprint(length)\nheight = 30\n";
        let params = ParameterEngine::new().extract(code);
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["length"]);
    }

    #[test]
    fn test_extract_allows_docstring_and_comments() {
        let code = "\"\"\"A simple bracket.\"\"\"\n# dimensions\nlength = 40\nresult = None\n";
        let params = ParameterEngine::new().extract(code);
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].line, 3);
    }

    #[test]
    fn test_extract_halts_at_multiline_docstring() {
        let code = "\"\"\"A bracket\nwith a long description.\n\"\"\"\nlength = 40\n";
        let params = ParameterEngine::new().extract(code);
        assert!(params.is_empty());
    }

    #[test]
    fn test_extract_skips_loop_counters() {
        let code = "n = 4\ncount = 8\ndiameter = 22\nresult = None\n";
        let params = ParameterEngine::new().extract(code);
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["diameter"]);
    }

    #[test]
    fn test_extract_negative_value() {
        let code = "offset = -5\nresult = None\n";
        let params = ParameterEngine::new().extract(code);
        assert_eq!(params[0].value, -5.0);
    }

    #[test]
    fn test_inject_rewrites_only_named_line() {
        let engine = ParameterEngine::new();
        let injected = engine.inject(SAMPLE, &values(&[("length", 120.0)]));
        assert!(injected.contains("length = 120\n"));
        assert!(injected.contains("width = 80\n"));
        assert!(injected.contains("wall_thickness = 3\n"));
    }

    #[test]
    fn test_inject_integer_formatting() {
        let engine = ParameterEngine::new();
        let injected = engine.inject(SAMPLE, &values(&[("width", 90.0), ("wall_thickness", 2.5)]));
        assert!(injected.contains("width = 90\n"));
        assert!(injected.contains("wall_thickness = 2.5\n"));
    }

    #[test]
    fn test_inject_preserves_trailing_comment() {
        let code = "length = 100  # overall length\nresult = None\n";
        let injected = ParameterEngine::new().inject(code, &values(&[("length", 50.0)]));
        assert!(injected.contains("length = 50  # overall length"));
    }

    #[test]
    fn test_extract_inject_round_trip() {
        let engine = ParameterEngine::new();
        let params = engine.extract(SAMPLE);
        let same: HashMap<String, f64> =
            params.iter().map(|p| (p.name.clone(), p.value)).collect();
        let reinjected = engine.inject(SAMPLE, &same);
        assert_eq!(engine.extract(&reinjected), params);
    }

    #[test]
    fn test_inject_then_extract_sees_new_value() {
        let engine = ParameterEngine::new();
        let injected = engine.inject(SAMPLE, &values(&[("length", 120.0)]));
        let params = engine.extract(&injected);
        let length = params.iter().find(|p| p.name == "length").unwrap();
        assert_eq!(length.value, 120.0);
        let width = params.iter().find(|p| p.name == "width").unwrap();
        assert_eq!(width.value, 80.0);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let result = ParameterEngine::new().validate(&values(&[("length", 0.0)]));
        assert!(matches!(result, Err(ParameterError::NonPositive { .. })));
    }

    #[test]
    fn test_validate_rejects_tiny_and_huge() {
        let engine = ParameterEngine::new();
        assert!(matches!(
            engine.validate(&values(&[("gap", 0.005)])),
            Err(ParameterError::TooSmall { .. })
        ));
        assert!(matches!(
            engine.validate(&values(&[("length", 20_000.0)])),
            Err(ParameterError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let engine = ParameterEngine::new();
        assert!(engine.validate(&values(&[("gap", 0.01)])).is_ok());
        assert!(engine.validate(&values(&[("length", 10_000.0)])).is_ok());
    }
}
