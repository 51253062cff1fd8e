//! Compiler diagnostics.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Stable diagnostic identifiers.
pub mod codes {
    pub const SYNTAX: &str = "TF0001";
    pub const UNSUPPORTED_ITEM: &str = "TF0002";
    pub const UNSUPPORTED_EXPRESSION: &str = "TF0003";
    pub const UNREADABLE_REFERENCE: &str = "TF0101";
    pub const DUPLICATE_TYPE: &str = "TF0201";
    pub const DUPLICATE_MEMBER: &str = "TF0202";
    pub const SETTER_WITHOUT_GETTER: &str = "TF0203";
    pub const ACCESSOR_TYPE_MISMATCH: &str = "TF0204";
    pub const ACCESSOR_NAMING: &str = "TF0205";
    pub const MISSING_ACCESSOR: &str = "TF0206";
    pub const UNKNOWN_FIELD: &str = "TF0207";
    pub const UNKNOWN_TYPE: &str = "TF0208";
    pub const MISSING_CAPABILITY_MEMBER: &str = "TF0209";
    pub const UNKNOWN_INTERFACE: &str = "TF0210";
    pub const EMPTY_MODULE: &str = "TF0211";
    pub const ARG_OUT_OF_RANGE: &str = "TF0212";
    pub const VIEW_MODEL_FIELD_MISSING: &str = "TF0213";
    pub const IMAGE_ENCODING: &str = "TF0301";
    pub const NO_PROPERTIES: &str = "TF1001";
}

/// A diagnostic reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Identifier (e.g., "TF0201")
    pub id: String,

    pub message: String,

    pub severity: Severity,

    /// 1-based line and column in the compiled source, text path only.
    pub location: Option<(usize, usize)>,

    /// Type the diagnostic is about, when there is one.
    pub type_name: Option<String>,
}

impl Diagnostic {
    pub fn error(id: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            message: message.into(),
            severity: Severity::Error,
            location: None,
            type_name: None,
        }
    }

    pub fn warning(id: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(id, message)
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some((line, column));
        self
    }

    pub fn on_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Format the diagnostic for terminal display.
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();

        let level_str = match self.severity {
            Severity::Error => "\x1b[1;31merror\x1b[0m",
            Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
        };
        output.push_str(&format!("{level_str}[{}]: {}\n", self.id, self.message));

        match (&self.type_name, self.location) {
            (Some(ty), Some((line, column))) => {
                output.push_str(&format!("  \x1b[1;34m-->\x1b[0m {ty} at {line}:{column}\n"))
            }
            (Some(ty), None) => output.push_str(&format!("  \x1b[1;34m-->\x1b[0m {ty}\n")),
            (None, Some((line, column))) => {
                output.push_str(&format!("  \x1b[1;34m-->\x1b[0m {line}:{column}\n"))
            }
            (None, None) => {}
        }

        output
    }

    /// Format the diagnostic for JSON output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "message": self.message,
            "severity": self.severity,
            "type": self.type_name,
            "location": self.location.map(|(line, column)| {
                serde_json::json!({ "line": line, "column": column })
            }),
        })
    }
}
