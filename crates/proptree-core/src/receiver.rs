//! Consumer-side property tree.
//!
//! The tree is built lazily from incoming records: a node comes into existence
//! the first time its name is mentioned under its parent, is updated in place
//! by later records, and is dropped together with its subtree when a tombstone
//! for it arrives. Records are applied in arrival order; embedded timestamps are
//! stored but never used to resolve conflicts.
//!
//! Failures are scoped to a single node. A malformed scalar or a type conflict
//! is recorded in the [`MergeReport`] and the merge carries on with the siblings.

use crate::dump::{render_object, DumpNode};
use crate::error::{MergeIssue, SyncError};
use crate::record::PropertyRecord;
use crate::value::{Scalar, ValueType};
use indexmap::map::Entry;
use indexmap::IndexMap;

/// A node of the consumer tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverProperty {
    timestamp: u64,
    value: ReceiverValue,
}

/// Payload of a consumer node.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverValue {
    /// A scalar leaf
    Leaf(Scalar),
    /// A group of named children
    Group(GroupReceiverProperty),
}

/// Named children in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupReceiverProperty {
    children: IndexMap<String, ReceiverProperty>,
}

/// Outcome of merging one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Nodes created
    pub created: usize,
    /// Existing nodes the record was applied to
    pub updated: usize,
    /// Nodes removed by tombstones (subtrees count once)
    pub deleted: usize,
    /// Node-scoped failures; everything else was applied
    pub issues: Vec<MergeIssue>,
}

impl MergeReport {
    /// Whether every node merged cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Turn a report with issues into [`SyncError::Merge`].
    ///
    /// # Errors
    ///
    /// Returns the collected issues if any node failed to merge.
    pub fn into_result(self) -> Result<Self, SyncError> {
        if self.issues.is_empty() {
            Ok(self)
        } else {
            Err(SyncError::Merge(self.issues))
        }
    }
}

impl ReceiverProperty {
    /// A fresh node of the kind implied by `value_type`, holding a zero value.
    fn empty(value_type: ValueType, timestamp: u64) -> Self {
        let value = match Scalar::default_for(value_type) {
            Some(scalar) => ReceiverValue::Leaf(scalar),
            None => ReceiverValue::Group(GroupReceiverProperty::default()),
        };
        Self { timestamp, value }
    }

    /// Producer timestamp of the last record applied to this node.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The node payload.
    #[must_use]
    pub fn value(&self) -> &ReceiverValue {
        &self.value
    }

    /// Type tag of the node.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match &self.value {
            ReceiverValue::Leaf(scalar) => scalar.value_type(),
            ReceiverValue::Group(_) => ValueType::Subtree,
        }
    }

    /// The scalar, if this is a leaf.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.value {
            ReceiverValue::Leaf(scalar) => Some(scalar),
            ReceiverValue::Group(_) => None,
        }
    }

    /// The group, if this is one.
    #[must_use]
    pub fn as_group(&self) -> Option<&GroupReceiverProperty> {
        match &self.value {
            ReceiverValue::Group(group) => Some(group),
            ReceiverValue::Leaf(_) => None,
        }
    }
}

impl DumpNode for ReceiverProperty {
    fn scalar(&self) -> Option<&Scalar> {
        self.as_scalar()
    }

    fn entries(&self) -> Vec<(&str, &Self)> {
        self.as_group().map(GroupReceiverProperty::entries).unwrap_or_default()
    }
}

impl GroupReceiverProperty {
    /// Direct child by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ReceiverProperty> {
        self.children.get(name)
    }

    /// Descendant by slash-separated path.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&ReceiverProperty> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = self.children.get(segments.next()?)?;
        segments.try_fold(first, |node, segment| node.as_group()?.get(segment))
    }

    /// Children in first-seen order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &ReceiverProperty)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the group has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Apply one record addressed to a child of this group.
    pub fn merge(&mut self, record: &PropertyRecord) -> MergeReport {
        let mut report = MergeReport::default();
        self.merge_into(record, "", &mut report);
        report
    }

    fn merge_into(&mut self, record: &PropertyRecord, parent: &str, report: &mut MergeReport) {
        let path = if parent.is_empty() {
            record.name.clone()
        } else {
            format!("{parent}/{}", record.name)
        };

        if record.deleted {
            if self.children.shift_remove(&record.name).is_some() {
                report.deleted += 1;
            }
            return;
        }

        if let Some(existing) = self.children.get(&record.name) {
            if existing.value_type() != record.value_type {
                report.issues.push(MergeIssue {
                    path,
                    error: SyncError::TypeConflict {
                        name: record.name.clone(),
                        existing: existing.value_type(),
                        incoming: record.value_type,
                    },
                });
                return;
            }
        }

        let child = match self.children.entry(record.name.clone()) {
            Entry::Occupied(entry) => {
                report.updated += 1;
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                report.created += 1;
                entry.insert(ReceiverProperty::empty(record.value_type, record.timestamp))
            }
        };

        match &mut child.value {
            ReceiverValue::Group(group) => {
                for sub in &record.children {
                    group.merge_into(sub, &path, report);
                }
            }
            ReceiverValue::Leaf(value) => {
                let text = record.value.as_deref().unwrap_or_default();
                match Scalar::parse(record.value_type, text) {
                    Ok(parsed) => *value = parsed,
                    Err(mut error) => {
                        if let SyncError::MalformedValue { name, .. } = &mut error {
                            name.clone_from(&record.name);
                        }
                        report.issues.push(MergeIssue { path, error });
                    }
                }
            }
        }

        child.timestamp = record.timestamp;
    }

    fn entries(&self) -> Vec<(&str, &ReceiverProperty)> {
        self.children().collect()
    }
}

/// Root of a consumer tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverTree {
    created_at: u64,
    root: GroupReceiverProperty,
}

impl ReceiverTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new(created_at: u64) -> Self {
        Self {
            created_at,
            root: GroupReceiverProperty::default(),
        }
    }

    /// When the tree was created, in the consumer's clock.
    #[must_use]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// The root group.
    #[must_use]
    pub fn root(&self) -> &GroupReceiverProperty {
        &self.root
    }

    /// Descendant by slash-separated path, e.g. `Portfolio/TICKER1/Price`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ReceiverProperty> {
        self.root.get_path(path)
    }

    /// Merge one record into the root.
    pub fn merge(&mut self, record: &PropertyRecord) -> MergeReport {
        let report = self.root.merge(record);
        tracing::debug!(
            name = %record.name,
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            issues = report.issues.len(),
            "Merged record"
        );
        report
    }

    /// Render the tree as `{ "<name>": ... }`.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        render_object(&self.root.entries(), 0, &mut out);
        out
    }
}
