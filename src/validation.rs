//! Config validation against extracted schemas.
//!
//! The runtime checks every incoming config against the resource's JSON
//! Schema before it deserializes it, so users get every problem at once
//! instead of the first serde error.
//!
//! # Example
//!
//! ```
//! use pragma_sdk::validation::validate;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "name": {"type": "string"},
//!         "count": {"type": "integer"}
//!     },
//!     "required": ["name"],
//!     "additionalProperties": false
//! });
//!
//! assert!(validate(&schema, &json!({"name": "test", "count": 42})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "test", "count": "many"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("count".to_string()));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be addressed.
    Warning,
}

/// A validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted path of the offending attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    fn with_attribute_if_not_empty(self, attribute: &str) -> Self {
        if attribute.is_empty() {
            self
        } else {
            self.with_attribute(attribute)
        }
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Render diagnostics as one line each, for error messages.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.attribute {
            Some(attr) => format!("{}: {}", attr, d.summary),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a JSON value against a JSON Schema.
///
/// Returns one diagnostic per violation; an empty list means the value is
/// valid. A schema that does not compile yields a single diagnostic.
pub fn validate(schema: &Value, value: &Value) -> Vec<Diagnostic> {
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(e) => {
            return vec![Diagnostic::error("Invalid schema").with_detail(e.to_string())];
        },
    };

    validator
        .iter_errors(value)
        .map(|e| {
            let path = pointer_to_path(&e.instance_path.to_string());
            Diagnostic::error(e.to_string()).with_attribute_if_not_empty(&path)
        })
        .collect()
}

/// Validate a JSON value, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Value, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
///
/// Use [`validate`] to get detailed error information.
pub fn is_valid(schema: &Value, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// `/a/0/b` -> `a.0.b`, unescaping JSON Pointer tokens.
fn pointer_to_path(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| part.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}
