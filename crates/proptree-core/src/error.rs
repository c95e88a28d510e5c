//! Errors raised by tree operations.
//!
//! Every error here is local to one node and one call. None of them leaves a
//! tree in a partially written state.

use crate::value::ValueType;

/// Errors from encoding or merging property trees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    /// Scalar text is not a valid literal for its declared type
    #[error("malformed {value_type} value for '{name}': {text:?}")]
    MalformedValue {
        /// Property name
        name: String,
        /// Declared type
        value_type: ValueType,
        /// Offending text
        text: String,
    },
    /// Incoming type is incompatible with the existing node
    #[error("type conflict on '{name}': existing {existing}, incoming {incoming}")]
    TypeConflict {
        /// Property name
        name: String,
        /// Type of the node already in the tree
        existing: ValueType,
        /// Type carried by the incoming record or value
        incoming: ValueType,
    },
    /// A forced encode found nothing to send
    #[error("'{name}' has no pending change to encode")]
    StaleEncode {
        /// Property name
        name: String,
    },
    /// A group already has a child with this name
    #[error("duplicate child '{name}'")]
    DuplicateChild {
        /// Property name
        name: String,
    },
    /// One or more nodes could not be merged
    #[error("merge finished with {} issue(s)", .0.len())]
    Merge(Vec<MergeIssue>),
}

/// A node-scoped merge failure, addressed by its path from the merge root.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeIssue {
    /// Slash-separated path of the node
    pub path: String,
    /// What went wrong
    pub error: SyncError,
}

impl std::fmt::Display for MergeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}
