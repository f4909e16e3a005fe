// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Static validation and auto-correction of CadQuery scripts.
//!
//! Catches common generation mistakes before anything is executed:
//! missing scaffolding, structural syntax errors, hallucinated method names,
//! known typos, and geometry antipatterns that reliably fail in the CAD
//! kernel. Corrections are purely textual; nothing here runs the code.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Result of statically validating a script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Present only when an auto-correction changed the text.
    pub corrected_code: Option<String>,
}

/// Known typos and wrong method names, rewritten in place.
struct Correction {
    pattern: &'static Lazy<Regex>,
    replacement: &'static str,
    label: &'static str,
}

static RE_ADD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.add\(").unwrap());
static RE_SUBTRACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.subtract\(").unwrap());
static RE_FILLETT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.fillett\(").unwrap());
static RE_CHAMPHER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.champher\(").unwrap());
static RE_EXTURDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.exturde\(").unwrap());
static RE_STAR_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"from cadquery import \*").unwrap());
static RE_BAD_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"import CadQuery").unwrap());

static CORRECTIONS: &[Correction] = &[
    Correction {
        pattern: &RE_ADD,
        replacement: ".union(",
        label: ".add( -> .union(",
    },
    Correction {
        pattern: &RE_SUBTRACT,
        replacement: ".cut(",
        label: ".subtract( -> .cut(",
    },
    Correction {
        pattern: &RE_FILLETT,
        replacement: ".fillet(",
        label: ".fillett( -> .fillet(",
    },
    Correction {
        pattern: &RE_CHAMPHER,
        replacement: ".chamfer(",
        label: ".champher( -> .chamfer(",
    },
    Correction {
        pattern: &RE_EXTURDE,
        replacement: ".extrude(",
        label: ".exturde( -> .extrude(",
    },
    Correction {
        pattern: &RE_STAR_IMPORT,
        replacement: "import cadquery as cq",
        label: "from cadquery import * -> import cadquery as cq",
    },
    Correction {
        pattern: &RE_BAD_IMPORT,
        replacement: "import cadquery as cq",
        label: "import CadQuery -> import cadquery as cq",
    },
];

/// Hallucinated method names that do not exist in CadQuery.
const INVALID_METHODS: &[&str] = &[
    "addSolid",
    "createBox",
    "makeBox",
    "createCylinder",
    "makeCyl",
    "addShape",
    "appendShape",
    "combineWith",
    "subtractFrom",
    "moveBy",
    "scaleBy",
    "rotateBy",
    "mirrorBy",
];

static RE_RESULT_ASSIGN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^result\s*=").unwrap());
static RE_FILLET_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.fillet\((\d+(?:\.\d+)?)\)").unwrap());
static RE_SHELL_AT_EOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\.shell\([^)]*\)\s*$").unwrap());
static RE_CYLINDER_Z_FILLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\.edges\("\|Z"\)\s*\.(?:fillet|chamfer)\("#).unwrap());

/// Validates and corrects CadQuery code before execution.
#[derive(Debug, Clone, Default)]
pub struct CodeValidator;

impl CodeValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a script and return errors, warnings, and any corrected text.
    pub fn validate(&self, code: &str) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut corrected = code.to_string();

        // Required scaffolding
        if !code.contains("import cadquery") && !code.contains("from cadquery") {
            errors.push("Missing CadQuery import statement".to_string());
            corrected = format!("import cadquery as cq\n\n{corrected}");
        }

        if !RE_RESULT_ASSIGN.is_match(code) {
            errors.push("Code does not define 'result' variable".to_string());
        }

        if let Some(message) = check_structure(code) {
            errors.push(format!("Syntax error: {message}"));
        }

        for method in INVALID_METHODS {
            if code.contains(&format!(".{method}(")) {
                errors.push(format!(
                    "Invalid method '{method}' - this does not exist in CadQuery"
                ));
            }
        }

        for correction in CORRECTIONS {
            if correction.pattern.is_match(&corrected) {
                warnings.push(format!("Auto-corrected: {}", correction.label));
                corrected = correction
                    .pattern
                    .replace_all(&corrected, correction.replacement)
                    .into_owned();
            }
        }

        warnings.extend(check_antipatterns(code));
        errors.extend(check_cylinder_fillet(code));
        if let Some(warning) = check_fillet_shell_order(code) {
            warnings.push(warning);
        }

        ValidationReport {
            is_valid: errors.is_empty(),
            corrected_code: (corrected != code).then_some(corrected),
            errors,
            warnings,
        }
    }

    /// Ordered remediation hints for a CAD execution error, keyed by known
    /// substrings of the kernel's error messages.
    pub fn get_error_fix_suggestions(&self, error_message: &str) -> Vec<String> {
        let error_lower = error_message.to_lowercase();

        struct FixRule {
            needles: &'static [&'static str],
            suggestions: &'static [&'static str],
        }

        const RULES: &[FixRule] = &[
            FixRule {
                needles: &["brep_api: command not done"],
                suggestions: &[
                    "Simplify the geometry - avoid complex loft/sweep operations",
                    "Build shapes separately and combine with .union()",
                    "Check that boolean operations (cut/union) involve intersecting shapes",
                    "Reduce fillet/chamfer radii",
                    "For organic shapes, use simple primitives (spheres, cylinders, boxes) combined",
                ],
            },
            FixRule {
                needles: &["no suitable edges", "fillet"],
                suggestions: &[
                    "Check edge selector - .edges(\"|Z\") doesn't work on cylinders",
                    "Reduce fillet radius - must be smaller than wall thickness",
                    "Apply fillet BEFORE shell, not after",
                    "Try .edges(\">Z or <Z\") for top/bottom edges",
                    "Consider removing fillet entirely for reliability",
                ],
            },
            FixRule {
                needles: &["shell"],
                suggestions: &[
                    "Reduce shell thickness - must be less than smallest dimension / 2",
                    "Select a face to remove: .faces(\">Z\").shell(-thickness)",
                    "Apply fillets BEFORE shell operation",
                    "Simplify the base shape first",
                ],
            },
            FixRule {
                needles: &["syntax"],
                suggestions: &[
                    "Check parentheses matching",
                    "Verify method chaining syntax",
                    "Check for missing commas in function arguments",
                ],
            },
            FixRule {
                needles: &["attribute", "has no attribute"],
                suggestions: &[
                    "Verify the method name exists in CadQuery",
                    "Check CadQuery documentation for correct method",
                    "Ensure you're calling methods on the right object type",
                ],
            },
        ];

        for rule in RULES {
            if rule.needles.iter().any(|n| error_lower.contains(n)) {
                return rule.suggestions.iter().map(|s| s.to_string()).collect();
            }
        }

        Vec::new()
    }
}

/// Structural check standing in for a full parse: bracket balance and
/// string termination, with the line number of the first problem.
fn check_structure(code: &str) -> Option<String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 1usize;

    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            '#' => {
                // comment runs to end of line
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '\'' | '"' => {
                let quote = c;
                // Detect triple quotes
                let mut triple = false;
                if chars.peek() == Some(&quote) {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&quote) {
                        chars.next();
                        chars.next();
                        triple = true;
                    } else {
                        // empty string ""
                        chars.next();
                        continue;
                    }
                }

                let open_line = line;
                let mut closed = false;
                let mut run = 0usize;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' if !triple => {
                            chars.next();
                        }
                        '\n' => {
                            line += 1;
                            run = 0;
                            if !triple {
                                return Some(format!("Line {open_line}: unterminated string"));
                            }
                        }
                        c if c == quote => {
                            if triple {
                                run += 1;
                                if run == 3 {
                                    closed = true;
                                    break;
                                }
                            } else {
                                closed = true;
                                break;
                            }
                        }
                        _ => run = 0,
                    }
                }
                if !closed {
                    return Some(format!("Line {open_line}: unterminated string"));
                }
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => return Some(format!("Line {line}: unmatched '{c}'")),
                }
            }
            _ => {}
        }
    }

    stack
        .first()
        .map(|(open, open_line)| format!("Line {open_line}: unclosed '{open}'"))
}

fn check_antipatterns(code: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(captures) = RE_FILLET_VALUE.captures(code) {
        if let Ok(value) = captures[1].parse::<f64>() {
            if value > 10.0 {
                warnings.push(format!(
                    "Large fillet radius ({value}mm) may cause errors - consider reducing"
                ));
            }
        }
    }

    if code.contains(".loft(") {
        warnings.push("loft() can be unreliable - ensure sections are compatible".to_string());
    }

    if code.contains(".sweep(") {
        warnings.push("sweep() can fail on complex paths - test carefully".to_string());
    }

    if RE_SHELL_AT_EOL.is_match(code) {
        if let Some(shell_pos) = code.find(".shell(") {
            if !code[..shell_pos].contains(".faces(") {
                warnings.push(
                    "shell() without face selection may give unexpected results".to_string(),
                );
            }
        }
    }

    warnings
}

/// Cylinders have no vertical edges; selecting them for fillet/chamfer is a
/// guaranteed kernel failure.
fn check_cylinder_fillet(code: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if code.contains(".cylinder(") && code.contains(".edges(\"|Z\")")
        && RE_CYLINDER_Z_FILLET.is_match(code)
    {
        errors.push(
            "Cannot use .edges(\"|Z\") on cylinders - they have no vertical edges. \
             Use .edges(\">Z\") or .edges(\"<Z\") for top/bottom edges instead."
                .to_string(),
        );
    }

    errors
}

fn check_fillet_shell_order(code: &str) -> Option<String> {
    let shell_pos = code.find(".shell(")?;
    let fillet_pos = code.rfind(".fillet(")?;

    (fillet_pos > shell_pos).then(|| {
        "fillet() applied after shell() - this often fails. Consider applying fillet before shell."
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CODE: &str = "import cadquery as cq\n\nresult = cq.Workplane(\"XY\").box(10, 10, 10)\n";

    #[test]
    fn test_valid_code_passes() {
        let report = CodeValidator::new().validate(VALID_CODE);
        assert!(report.is_valid, "errors: {:?}", report.errors);
        assert!(report.corrected_code.is_none());
    }

    #[test]
    fn test_missing_import_auto_inserted() {
        let code = "result = cq.Workplane(\"XY\").box(10, 10, 10)\n";
        let report = CodeValidator::new().validate(code);
        assert!(!report.is_valid);
        let corrected = report.corrected_code.expect("should insert import");
        assert!(corrected.starts_with("import cadquery as cq\n"));
    }

    #[test]
    fn test_missing_result_variable() {
        let code = "import cadquery as cq\nmodel = cq.Workplane(\"XY\").box(1, 1, 1)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("'result' variable")));
    }

    #[test]
    fn test_hallucinated_method_flagged() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").makeBox(1, 1, 1)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report.errors.iter().any(|e| e.contains("makeBox")));
    }

    #[test]
    fn test_typo_auto_corrected() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").box(10, 10, 10).fillett(2)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report.is_valid);
        let corrected = report.corrected_code.expect("typo should be corrected");
        assert!(corrected.contains(".fillet(2)"));
        assert!(report.warnings.iter().any(|w| w.contains("Auto-corrected")));
    }

    #[test]
    fn test_subtract_rewritten_to_cut() {
        let code = "import cadquery as cq\nhole = cq.Workplane(\"XY\").cylinder(5, 2)\nresult = cq.Workplane(\"XY\").box(10, 10, 10).subtract(hole)\n";
        let report = CodeValidator::new().validate(code);
        let corrected = report.corrected_code.unwrap();
        assert!(corrected.contains(".cut(hole)"));
    }

    #[test]
    fn test_correction_is_fixed_point() {
        let code = "result = cq.Workplane(\"XY\").box(10, 10, 10).fillett(2).subtract(x)\n";
        let first = CodeValidator::new().validate(code);
        let corrected = first.corrected_code.unwrap();
        let second = CodeValidator::new().validate(&corrected);
        assert!(second.corrected_code.is_none());
    }

    #[test]
    fn test_unbalanced_parens_reported_with_line() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").box(10, 10\n";
        let report = CodeValidator::new().validate(code);
        assert!(report
            .errors
            .iter()
            .any(|e| e.starts_with("Syntax error: Line 2")));
    }

    #[test]
    fn test_unterminated_string_reported() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY).box(1, 1, 1)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("unterminated string")));
    }

    #[test]
    fn test_triple_quoted_docstring_ok() {
        let code = "\"\"\"A bracket.\nSecond line.\n\"\"\"\nimport cadquery as cq\nresult = cq.Workplane(\"XY\").box(1, 1, 1)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report.is_valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_large_fillet_warning() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").box(50, 50, 50).fillet(15)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report.is_valid);
        assert!(report.warnings.iter().any(|w| w.contains("Large fillet")));
    }

    #[test]
    fn test_loft_and_sweep_warnings() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").circle(5).loft()\n";
        let report = CodeValidator::new().validate(code);
        assert!(report.warnings.iter().any(|w| w.contains("loft()")));
    }

    #[test]
    fn test_cylinder_vertical_edge_fillet_is_fatal() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").cylinder(50, 25).edges(\"|Z\").fillet(5)\n";
        let report = CodeValidator::new().validate(code);
        assert!(!report.is_valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("no vertical edges")));
    }

    #[test]
    fn test_cylinder_top_edge_fillet_is_fine() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").cylinder(50, 25).edges(\">Z\").fillet(2)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report.is_valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn test_fillet_after_shell_warns() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").box(20, 20, 20).faces(\">Z\").shell(-2).edges(\">Z\").fillet(1)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("fillet() applied after shell()")));
    }

    #[test]
    fn test_shell_without_face_selection_warns() {
        let code = "import cadquery as cq\nresult = cq.Workplane(\"XY\").box(20, 20, 20).shell(-2)\n";
        let report = CodeValidator::new().validate(code);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("without face selection")));
    }

    #[test]
    fn test_fix_suggestions_brep() {
        let suggestions =
            CodeValidator::new().get_error_fix_suggestions("BRep_API: command not done");
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].contains("Simplify"));
    }

    #[test]
    fn test_fix_suggestions_fillet() {
        let suggestions =
            CodeValidator::new().get_error_fix_suggestions("No suitable edges for fillet");
        assert!(suggestions.iter().any(|s| s.contains("edge selector")));
    }

    #[test]
    fn test_fix_suggestions_unknown_error() {
        let suggestions = CodeValidator::new().get_error_fix_suggestions("something exotic");
        assert!(suggestions.is_empty());
    }
}
