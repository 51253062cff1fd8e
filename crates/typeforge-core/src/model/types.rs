//! Primitive kinds, type references and constant literals.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Primitive data kind of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Int32,
    Int64,
    Float64,
    Bool,
    String,
    Date,
    Decimal,
    Object,
}

impl PrimitiveKind {
    /// All kinds, in declaration order.
    pub const ALL: [PrimitiveKind; 8] = [
        Self::Int32,
        Self::Int64,
        Self::Float64,
        Self::Bool,
        Self::String,
        Self::Date,
        Self::Decimal,
        Self::Object,
    ];

    /// The canonical zero/empty value a fresh instance holds for this kind.
    pub fn default_literal(self) -> Literal {
        match self {
            Self::Int32 => Literal::Int32(0),
            Self::Int64 => Literal::Int64(0),
            Self::Float64 => Literal::Float64(0.0),
            Self::Bool => Literal::Bool(false),
            Self::String => Literal::String(String::new()),
            Self::Date => Literal::Date(min_date()),
            Self::Decimal => Literal::Decimal(Decimal::ZERO),
            Self::Object => Literal::Null,
        }
    }

    /// Rust spelling used by the source backend.
    pub fn rust_type(self) -> &'static str {
        match self {
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::Float64 => "f64",
            Self::Bool => "bool",
            Self::String => "String",
            Self::Date => "NaiveDateTime",
            Self::Decimal => "Decimal",
            Self::Object => "Value",
        }
    }

    /// Inverse of [`PrimitiveKind::rust_type`].
    pub fn from_rust_type(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.rust_type() == name)
    }

    /// Schema spelling (`int32`, `string`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Date => "date",
            Self::Decimal => "decimal",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The minimum date value (0001-01-01 00:00:00).
pub fn min_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Reference to a type from a member signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Void,
    Primitive(PrimitiveKind),
    Named(String),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn list_of(element: TypeRef) -> Self {
        Self::List(Box::new(element))
    }

    /// Named types referenced anywhere inside this reference.
    pub fn named_types(&self) -> Vec<&str> {
        match self {
            Self::Named(name) => vec![name.as_str()],
            Self::List(inner) => inner.named_types(),
            Self::Void | Self::Primitive(_) => Vec::new(),
        }
    }

    /// Default literal held by a field of this type.
    pub fn default_literal(&self) -> Literal {
        match self {
            Self::Primitive(kind) => kind.default_literal(),
            Self::Void | Self::Named(_) | Self::List(_) => Literal::Null,
        }
    }

    /// Rust spelling used by the source backend.
    ///
    /// Lists are nullable and render as `Option<Vec<T>>`; named types render by name.
    pub fn rust_type(&self) -> String {
        match self {
            Self::Void => "()".to_string(),
            Self::Primitive(kind) => kind.rust_type().to_string(),
            Self::Named(name) => name.clone(),
            Self::List(inner) => format!("Option<Vec<{}>>", inner.rust_type()),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "list<{inner}>"),
        }
    }
}

/// A serializable constant: field defaults and `LoadConst` operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    String(String),
    Date(NaiveDateTime),
    Decimal(Decimal),
}

impl Literal {
    /// Whether a literal can be stored in a slot of type `ty`.
    pub fn fits(&self, ty: &TypeRef) -> bool {
        match (self, ty) {
            (Self::Null, TypeRef::Primitive(PrimitiveKind::Object))
            | (Self::Null, TypeRef::Named(_))
            | (Self::Null, TypeRef::List(_)) => true,
            (_, TypeRef::Primitive(PrimitiveKind::Object)) => true,
            (Self::Int32(_), TypeRef::Primitive(PrimitiveKind::Int32))
            | (Self::Int64(_), TypeRef::Primitive(PrimitiveKind::Int64))
            | (Self::Float64(_), TypeRef::Primitive(PrimitiveKind::Float64))
            | (Self::Bool(_), TypeRef::Primitive(PrimitiveKind::Bool))
            | (Self::String(_), TypeRef::Primitive(PrimitiveKind::String))
            | (Self::Date(_), TypeRef::Primitive(PrimitiveKind::Date))
            | (Self::Decimal(_), TypeRef::Primitive(PrimitiveKind::Decimal)) => true,
            _ => false,
        }
    }
}
