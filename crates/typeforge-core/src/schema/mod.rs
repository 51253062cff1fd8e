//! Tabular schema input and its translation into canonical members.

mod naming;
mod translator;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::PrimitiveKind;

pub use naming::{
    CONTEXT_FIELD, is_valid_identifier, list_field_name, pluralize, validate_identifier,
    view_model_name,
};
pub use translator::{MemberOrigin, SchemaTranslator, TranslatedMember, TranslatedSchema};

/// One column of a tabular source. Column order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub kind: PrimitiveKind,
}

impl SchemaColumn {
    pub fn new(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A schema as read from disk.
///
/// ```json
/// { "name": "Employee", "namespace": "Hr",
///   "columns": [{ "name": "Id", "kind": "int32" }],
///   "capabilities": ["IExtendedProperties"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Base type name.
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub columns: Vec<SchemaColumn>,
    /// Capability interfaces merged into generated view-models.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl SchemaDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        validate_identifier(&doc.name)?;
        Ok(doc)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_document_from_json() {
        let doc = SchemaDocument::from_json(
            r#"{"name":"Employee","columns":[{"name":"Id","kind":"int32"},{"name":"Hired","kind":"date"}]}"#,
        )
        .unwrap();

        assert_eq!(doc.name, "Employee");
        assert_eq!(doc.namespace, None);
        assert!(doc.capabilities.is_empty());
        assert_eq!(doc.columns[1], SchemaColumn::new("Hired", PrimitiveKind::Date));
    }

    #[test]
    fn test_schema_document_rejects_unknown_kind() {
        let err = SchemaDocument::from_json(
            r#"{"name":"Employee","columns":[{"name":"Id","kind":"uuid"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_schema_document_rejects_bad_type_name() {
        let err = SchemaDocument::from_json(r#"{"name":"Bad Name","columns":[]}"#).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation { .. }));
    }
}
