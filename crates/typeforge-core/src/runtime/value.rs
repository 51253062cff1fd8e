//! Dynamic values held by instances of loaded types.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::model::{Literal, PrimitiveKind, TypeRef};

use super::instance::Instance;

/// A runtime value.
///
/// Objects have reference semantics: cloning a `Value::Object` shares the
/// instance, and equality on objects is identity.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    String(String),
    Date(NaiveDateTime),
    Decimal(Decimal),
    Object(Instance),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value can be stored in a slot of type `ty`.
    pub fn fits(&self, ty: &TypeRef) -> bool {
        match (self, ty) {
            (_, TypeRef::Void) => false,
            (_, TypeRef::Primitive(PrimitiveKind::Object)) => true,
            (Self::Null, TypeRef::Named(_) | TypeRef::List(_)) => true,
            (Self::Object(instance), TypeRef::Named(name)) => instance.type_name() == name,
            (Self::List(_), TypeRef::List(_)) => true,
            (value, TypeRef::Primitive(kind)) => value.kind() == Some(*kind),
            _ => false,
        }
    }

    /// Primitive kind of a scalar value.
    pub fn kind(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Int32(_) => Some(PrimitiveKind::Int32),
            Self::Int64(_) => Some(PrimitiveKind::Int64),
            Self::Float64(_) => Some(PrimitiveKind::Float64),
            Self::Bool(_) => Some(PrimitiveKind::Bool),
            Self::String(_) => Some(PrimitiveKind::String),
            Self::Date(_) => Some(PrimitiveKind::Date),
            Self::Decimal(_) => Some(PrimitiveKind::Decimal),
            Self::Null | Self::Object(_) | Self::List(_) => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Object(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Int32(v) => write!(f, "Int32({v})"),
            Self::Int64(v) => write!(f, "Int64({v})"),
            Self::Float64(v) => write!(f, "Float64({v:?})"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::String(v) => write!(f, "String({v:?})"),
            Self::Date(v) => write!(f, "Date({v})"),
            Self::Decimal(v) => write!(f, "Decimal({v})"),
            Self::Object(instance) => write!(f, "Object({instance:?})"),
            Self::List(items) => f.debug_list().entries(items).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Date(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Object(instance) => write!(f, "{}", instance.type_name()),
            Self::List(items) => write!(f, "[{} item(s)]", items.len()),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Self::Null,
            Literal::Int32(v) => Self::Int32(*v),
            Literal::Int64(v) => Self::Int64(*v),
            Literal::Float64(v) => Self::Float64(*v),
            Literal::Bool(v) => Self::Bool(*v),
            Literal::String(v) => Self::String(v.clone()),
            Literal::Date(v) => Self::Date(*v),
            Literal::Decimal(v) => Self::Decimal(*v),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    i32 => Int32,
    i64 => Int64,
    f64 => Float64,
    bool => Bool,
    String => String,
    NaiveDateTime => Date,
    Decimal => Decimal,
    Instance => Object,
    Vec<Value> => List,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::min_date;

    #[test]
    fn test_literal_conversion() {
        assert_eq!(Value::from(&Literal::Int32(3)), Value::Int32(3));
        assert_eq!(Value::from(&Literal::Date(min_date())), Value::Date(min_date()));
        assert!(Value::from(&Literal::Null).is_null());
    }

    #[test]
    fn test_fits() {
        let int = TypeRef::Primitive(PrimitiveKind::Int32);
        assert!(Value::from(1).fits(&int));
        assert!(!Value::from(1i64).fits(&int));
        assert!(!Value::Null.fits(&int));
        assert!(Value::Null.fits(&TypeRef::named("Employee")));
        assert!(Value::List(Vec::new()).fits(&TypeRef::list_of(int.clone())));
        assert!(Value::from("x").fits(&TypeRef::Primitive(PrimitiveKind::Object)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("Alice").to_string(), "Alice");
        assert_eq!(Value::List(vec![Value::Null]).to_string(), "[1 item(s)]");
    }
}
