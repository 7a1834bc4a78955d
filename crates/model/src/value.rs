use serde::Serialize;
use std::fmt;

/// A single typed attribute value as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Int(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v) => Some(*v as i64),
            AttributeValue::Boolean(v) => Some(if *v { 1 } else { 0 }),
            AttributeValue::String(v) => v.trim().parse::<i64>().ok(),
            AttributeValue::Null => None,
            AttributeValue::Array(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            AttributeValue::String(v) => v.trim().parse::<f64>().ok(),
            AttributeValue::Null => None,
            AttributeValue::Array(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Int(v) => Some(*v != 0),
            AttributeValue::Float(v) => Some(*v != 0.0),
            AttributeValue::Boolean(v) => Some(*v),
            AttributeValue::String(v) => match v.trim().to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            AttributeValue::Null => None,
            AttributeValue::Array(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Boolean(v) => write!(f, "{v}"),
            AttributeValue::String(v) => write!(f, "{v}"),
            AttributeValue::Array(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_plain_json_scalars() {
        assert_eq!(
            serde_json::to_string(&AttributeValue::Null).unwrap(),
            "null"
        );
        assert_eq!(
            serde_json::to_string(&AttributeValue::Int(42)).unwrap(),
            "42"
        );
        assert_eq!(
            serde_json::to_string(&AttributeValue::Float(4.5)).unwrap(),
            "4.5"
        );
        assert_eq!(
            serde_json::to_string(&AttributeValue::Boolean(true)).unwrap(),
            "true"
        );
        assert_eq!(
            serde_json::to_string(&AttributeValue::String("hi".into())).unwrap(),
            "\"hi\""
        );
        assert_eq!(
            serde_json::to_string(&AttributeValue::Array(vec![
                AttributeValue::Int(1),
                AttributeValue::String("a".into()),
            ]))
            .unwrap(),
            "[1,\"a\"]"
        );
    }

    #[test]
    fn coerces_between_scalar_kinds() {
        assert_eq!(AttributeValue::Float(4.23).as_i64(), Some(4));
        assert_eq!(AttributeValue::Int(1).as_bool(), Some(true));
        assert_eq!(AttributeValue::String("7".into()).as_f64(), Some(7.0));
        assert_eq!(AttributeValue::String("maybe".into()).as_bool(), None);
        assert_eq!(AttributeValue::Null.as_i64(), None);
    }
}
