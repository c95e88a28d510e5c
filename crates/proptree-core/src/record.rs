//! The self-describing property record exchanged between producer and consumer.
//!
//! A record carries its own type tag, so a consumer can materialize a node
//! without knowing anything about the producer's tree in advance. Scalars
//! travel as text.

use crate::value::{Scalar, ValueType};
use serde::{Deserialize, Serialize};

/// Wire description of one property and, for subtrees, its changed children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Property name, unique among its siblings
    pub name: String,
    /// Producer clock reading when the record was built
    pub timestamp: u64,
    /// Tombstone marker
    #[serde(default)]
    pub deleted: bool,
    /// Type tag, present even on tombstones
    pub value_type: ValueType,
    /// Textual scalar value; absent for subtrees and tombstones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Child records; only subtrees carry any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PropertyRecord>,
}

impl PropertyRecord {
    /// Build a scalar record.
    #[must_use]
    pub fn scalar(name: impl Into<String>, timestamp: u64, value: &Scalar) -> Self {
        Self {
            name: name.into(),
            timestamp,
            deleted: false,
            value_type: value.value_type(),
            value: Some(value.to_text()),
            children: Vec::new(),
        }
    }

    /// Build a subtree record.
    #[must_use]
    pub fn subtree(name: impl Into<String>, timestamp: u64, children: Vec<PropertyRecord>) -> Self {
        Self {
            name: name.into(),
            timestamp,
            deleted: false,
            value_type: ValueType::Subtree,
            value: None,
            children,
        }
    }

    /// Build a tombstone. The type tag is informational only.
    #[must_use]
    pub fn tombstone(name: impl Into<String>, timestamp: u64, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            timestamp,
            deleted: true,
            value_type,
            value: None,
            children: Vec::new(),
        }
    }

    /// Number of records in this tree, including `self`.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(PropertyRecord::count).sum::<usize>()
    }

    /// Check the structural invariants of this record and all descendants.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending record.
    pub fn validate(&self) -> Result<(), RecordError> {
        let fail = |reason: &'static str| RecordError::Invariant {
            name: self.name.clone(),
            reason,
        };

        if self.deleted {
            if self.value.is_some() {
                return Err(fail("tombstone carries a value"));
            }
            if !self.children.is_empty() {
                return Err(fail("tombstone carries children"));
            }
            return Ok(());
        }

        match self.value_type {
            ValueType::Subtree => {
                if self.value.is_some() {
                    return Err(fail("subtree carries a scalar value"));
                }
                self.children.iter().try_for_each(PropertyRecord::validate)
            }
            _ => {
                if self.value.is_none() {
                    return Err(fail("scalar record without a value"));
                }
                if !self.children.is_empty() {
                    return Err(fail("scalar record carries children"));
                }
                Ok(())
            }
        }
    }
}

/// Structural problems with a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// A record violates the schema invariants
    #[error("invalid record '{name}': {reason}")]
    Invariant {
        /// Name of the offending record
        name: String,
        /// What is wrong with it
        reason: &'static str,
    },
}
