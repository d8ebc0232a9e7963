//! External icon validation
//!
//! Runs the converter's `validate` command against an exported icon
//! folder. On failure the tool prints newline-delimited JSON documents,
//! each optionally carrying an `errors` array of `{code, message}`.
//! Lines that are not JSON are kept as plain diagnostics.

use std::path::Path;

use iconforge_core::ToolRunner;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use crate::config::{PipelineConfig, CONVERTER_TOOL};
use crate::error::{ExportError, ExportResult};

/// One structured validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Validator error code
    pub code: String,
    /// Human-readable description
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Decoded validator output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedOutput {
    /// Errors from every parsed document
    pub issues: Vec<ValidationIssue>,
    /// Number of lines that parsed as JSON
    pub documents: usize,
    /// Non-JSON lines, verbatim
    pub diagnostics: Vec<String>,
}

/// Result of a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// No issues were reported
    pub ok: bool,
    /// Errors reported by the validator
    pub issues: Vec<ValidationIssue>,
    /// Non-JSON output lines
    pub diagnostics: Vec<String>,
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Split combined tool output into issues and diagnostics
pub fn decode_output(output: &str) -> DecodedOutput {
    let mut decoded = DecodedOutput::default();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let document: Value = match serde_json::from_str(line) {
            Ok(document) => document,
            Err(e) => {
                warn!(line, error = %e, "Validator printed a non-JSON line");
                decoded.diagnostics.push(line.to_string());
                continue;
            }
        };
        decoded.documents += 1;

        let Some(errors) = document.get("errors").and_then(Value::as_array) else {
            continue;
        };
        for error in errors {
            decoded.issues.push(ValidationIssue {
                code: error.get("code").map(field_text).unwrap_or_default(),
                message: error.get("message").map(field_text).unwrap_or_default(),
            });
        }
    }

    decoded
}

/// Drives the external validator through a [`ToolRunner`]
pub struct Validator<'a, R: ToolRunner> {
    config: &'a PipelineConfig,
    runner: R,
}

impl<'a, R: ToolRunner> Validator<'a, R> {
    /// Validator resolved through `config`
    pub fn new(config: &'a PipelineConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Arguments for validating `icon_dir`
    pub fn arguments(&self, icon_dir: &Path) -> Vec<String> {
        use iconforge_core::ComponentKind::{Model, Portal};

        vec![
            "validate".into(),
            "--format".into(),
            "json".into(),
            "-m".into(),
            self.config.relative_component_path(Model),
            "--local-model-folder".into(),
            self.config.component_folder(Model).into(),
            "-p".into(),
            self.config.relative_component_path(Portal),
            "--local-portal-folder".into(),
            self.config.component_folder(Portal).into(),
            icon_dir.display().to_string(),
        ]
    }

    /// Validate an exported icon folder. A non-zero exit with no
    /// decodable output at all is an [`ExportError::ExternalTool`].
    pub fn validate(&self, icon_dir: &Path) -> ExportResult<ValidationOutcome> {
        let _span = info_span!("validate", path = %icon_dir.display()).entered();

        let program = self.config.tool(CONVERTER_TOOL);
        let output = self.runner.run(&program, &self.arguments(icon_dir))?;

        if output.success() {
            info!("Icon passed validation");
            return Ok(ValidationOutcome {
                ok: true,
                ..Default::default()
            });
        }

        let combined = output.combined();
        let decoded = decode_output(&combined);
        if decoded.documents == 0 {
            return Err(ExportError::ExternalTool {
                tool: CONVERTER_TOOL.to_string(),
                code: output.status,
                output: combined.trim().to_string(),
            });
        }

        for issue in &decoded.issues {
            debug!(code = %issue.code, message = %issue.message, "Validation error");
        }
        warn!(errors = decoded.issues.len(), "Icon failed validation");

        Ok(ValidationOutcome {
            ok: false,
            issues: decoded.issues,
            diagnostics: decoded.diagnostics,
        })
    }
}
