//! Identifier validation and deterministic naming.

use heck::ToSnakeCase;

use crate::error::{Error, Result};

/// Words that cannot be used as identifiers in generated source.
const RESERVED: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
    "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Whether `name` can name a generated type or member.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if name == "_" {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !RESERVED.contains(&name)
}

/// Reject names that are not valid identifiers.
pub fn validate_identifier(name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(Error::schema(name, "not a valid identifier"))
    }
}

/// English pluralization of a lowercase word.
///
/// consonant + `y` → `ies`; `s`, `x`, `z`, `ch`, `sh` → `es`; otherwise `s`.
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c.to_ascii_lowercase())) {
            return format!("{stem}ies");
        }
    }
    if word.ends_with(['s', 'x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Backing list field of a view-model over `base` (`Employee` → `_employees`).
pub fn list_field_name(base: &str) -> String {
    format!("_{}", pluralize(&base.to_snake_case()))
}

/// Field holding a view-model's context handle.
pub const CONTEXT_FIELD: &str = "_context";

/// View-model type synthesized over `base` (`Employee` → `EmployeeVM`).
pub fn view_model_name(base: &str) -> String {
    format!("{base}VM")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("Id"));
        assert!(is_valid_identifier("_hidden"));
        assert!(is_valid_identifier("Column2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("_"));
        assert!(!is_valid_identifier("2nd"));
        assert!(!is_valid_identifier("first name"));
        assert!(!is_valid_identifier("naïve"));
        assert!(!is_valid_identifier("struct"));
    }

    #[test]
    fn test_validate_identifier_error() {
        let err = validate_identifier("order-id").unwrap_err();
        assert!(err.to_string().contains("order-id"));
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("employee"), "employees");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("branch"), "branches");
        assert_eq!(pluralize("wish"), "wishes");
    }

    #[test]
    fn test_list_field_name() {
        assert_eq!(list_field_name("Employee"), "_employees");
        assert_eq!(list_field_name("Category"), "_categories");
        assert_eq!(list_field_name("OrderLine"), "_order_lines");
        assert_eq!(list_field_name("Box"), "_boxes");
    }

    #[test]
    fn test_view_model_name() {
        assert_eq!(view_model_name("Employee"), "EmployeeVM");
    }
}
