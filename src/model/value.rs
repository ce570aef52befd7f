//! Attribute values held by `ATTRIBUTE` properties.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DataType;

/// Primitive or opaque attribute value.
///
/// Covers the data types a descriptor table can declare:
/// - Scalars: Bool, Int, Float, String
/// - Enumerations: symbolic literal of a registered enumeration
/// - Opaque: anything the producer can only render as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum { enumeration: String, literal: String },
    Opaque(String),
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Enum { .. } => "ENUM",
            Value::Opaque(_) => "OPAQUE",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// Whether this value may be stored in a slot declared with `data_type`.
    /// `Null` fits every data type; enum literals are checked by the metamodel.
    pub fn conforms_to(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Null, _) => true,
            (Value::Bool(_), DataType::Bool) => true,
            (Value::Int(_), DataType::Int) => true,
            (Value::Float(_), DataType::Float) => true,
            (Value::String(_), DataType::String) => true,
            (Value::Enum { enumeration, .. }, DataType::Enum(name)) => enumeration == name,
            (_, DataType::Opaque) => true,
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Opaque(s) => Some(s),
            Value::Enum { literal, .. } => Some(literal),
            _ => None,
        }
    }

    /// Wire form: `None` for null, otherwise the `Display` rendering.
    pub fn to_wire(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Parse a wire string back into a value of the given data type.
    pub fn parse(data_type: &DataType, text: &str) -> Option<Value> {
        match data_type {
            DataType::String => Some(Value::String(text.to_owned())),
            DataType::Int => text.parse().ok().map(Value::Int),
            DataType::Float => text.parse().ok().map(Value::Float),
            DataType::Bool => match text {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            DataType::Enum(name) => Some(Value::Enum {
                enumeration: name.clone(),
                literal: text.to_owned(),
            }),
            DataType::Opaque => Some(Value::Opaque(text.to_owned())),
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

/// Unquoted rendering; this is the wire stringification. Floats always
/// carry a fraction or exponent (`2.0`, `1e20`) and infinities are spelled out.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) if v.is_infinite() => f.write_str(if *v > 0.0 { "Infinity" } else { "-Infinity" }),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Enum { literal, .. } => write!(f, "{literal}"),
            Value::Opaque(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_wire_stringification() {
        assert_eq!(Value::Int(12345).to_wire().as_deref(), Some("12345"));
        assert_eq!(Value::Bool(false).to_wire().as_deref(), Some("false"));
        assert_eq!(Value::Float(2.5).to_wire().as_deref(), Some("2.5"));
        assert_eq!(Value::Null.to_wire(), None);
        let e = Value::Enum { enumeration: "Visibility".into(), literal: "PUBLIC".into() };
        assert_eq!(e.to_wire().as_deref(), Some("PUBLIC"));
    }

    #[test]
    fn test_float_wire_form_keeps_fraction() {
        assert_eq!(Value::Float(2.0).to_wire().as_deref(), Some("2.0"));
        assert_eq!(Value::Float(-0.5).to_wire().as_deref(), Some("-0.5"));
        assert_eq!(Value::Float(f64::INFINITY).to_wire().as_deref(), Some("Infinity"));
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_wire().as_deref(), Some("-Infinity"));
        for v in [2.0, 1e20, f64::INFINITY, f64::NEG_INFINITY] {
            let wire = Value::Float(v).to_wire().unwrap();
            assert_eq!(Value::parse(&DataType::Float, &wire), Some(Value::Float(v)), "{wire}");
        }
        // an integral float is not an integer
        assert_eq!(Value::Float(2.0).as_int(), None);
        assert_eq!(Value::parse(&DataType::Int, "2").and_then(|v| v.as_int()), Some(2));
    }

    #[test]
    fn test_parse_by_data_type() {
        assert_eq!(Value::parse(&DataType::Int, "7"), Some(Value::Int(7)));
        assert_eq!(Value::parse(&DataType::Int, "seven"), None);
        assert_eq!(Value::parse(&DataType::Bool, "true"), Some(Value::Bool(true)));
        assert_eq!(Value::parse(&DataType::Bool, "yes"), None);
    }

    #[test]
    fn test_conformance() {
        assert!(Value::Null.conforms_to(&DataType::Int));
        assert!(Value::Int(1).conforms_to(&DataType::Int));
        assert!(!Value::Int(1).conforms_to(&DataType::String));
        assert!(Value::Int(1).conforms_to(&DataType::Opaque));
    }
}
