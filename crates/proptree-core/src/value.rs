//! Scalar values and the value-type tag carried by every record.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};

/// The type tag of a property record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// UTF-8 text
    String,
    /// 32-bit signed integer
    Int,
    /// 32-bit float
    Float,
    /// Boolean
    Bool,
    /// A group of child properties
    Subtree,
}

impl ValueType {
    /// Whether this tag describes a scalar leaf.
    #[must_use]
    pub fn is_scalar(self) -> bool {
        !matches!(self, ValueType::Subtree)
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Subtree => write!(f, "subtree"),
        }
    }
}

/// A typed leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Text value
    String(String),
    /// Integer value
    Int(i32),
    /// Float value
    Float(f32),
    /// Boolean value
    Bool(bool),
}

impl Scalar {
    /// The record tag for this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Scalar::String(_) => ValueType::String,
            Scalar::Int(_) => ValueType::Int,
            Scalar::Float(_) => ValueType::Float,
            Scalar::Bool(_) => ValueType::Bool,
        }
    }

    /// Textual wire form of the value.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Parse the wire form of a value of the given type.
    ///
    /// Booleans must be exactly `true` or `false`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MalformedValue`] if `text` is not a valid literal
    /// for `value_type`, or if `value_type` is [`ValueType::Subtree`]. The
    /// error's `name` is left empty for the caller to fill in.
    pub fn parse(value_type: ValueType, text: &str) -> Result<Self, SyncError> {
        let parsed = match value_type {
            ValueType::String => Some(Scalar::String(text.to_string())),
            ValueType::Int => text.parse().ok().map(Scalar::Int),
            ValueType::Float => text.parse().ok().map(Scalar::Float),
            ValueType::Bool => match text {
                "true" => Some(Scalar::Bool(true)),
                "false" => Some(Scalar::Bool(false)),
                _ => None,
            },
            ValueType::Subtree => None,
        };
        parsed.ok_or_else(|| SyncError::MalformedValue {
            name: String::new(),
            value_type,
            text: text.to_string(),
        })
    }

    /// Zero value of a scalar type; `None` for [`ValueType::Subtree`].
    #[must_use]
    pub fn default_for(value_type: ValueType) -> Option<Self> {
        match value_type {
            ValueType::String => Some(Scalar::String(String::new())),
            ValueType::Int => Some(Scalar::Int(0)),
            ValueType::Float => Some(Scalar::Float(0.0)),
            ValueType::Bool => Some(Scalar::Bool(false)),
            ValueType::Subtree => None,
        }
    }

    /// Render for a tree dump: strings quoted, everything else bare.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Scalar::String(s) => format!("{s:?}"),
            other => other.to_text(),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}
