//! Producer-side property tree.
//!
//! Every node carries a dirty flag. Mutations set the flag on the mutated node
//! only; encoding walks the tree and emits a record for each node that is dirty
//! or has dirty descendants, clearing flags as it goes. Unchanged siblings are
//! left out of the record entirely.

use crate::clock::Clock;
use crate::dump::{render_object, DumpNode};
use crate::error::SyncError;
use crate::record::PropertyRecord;
use crate::value::{Scalar, ValueType};

/// A node of the producer tree.
#[derive(Debug, Clone)]
pub enum SenderProperty {
    /// A typed scalar
    Leaf(LeafSenderProperty),
    /// A named group of children
    Group(GroupSenderProperty),
}

/// A scalar leaf. Its type is fixed at construction.
#[derive(Debug, Clone)]
pub struct LeafSenderProperty {
    name: String,
    value: Scalar,
    dirty: bool,
}

/// A group that exclusively owns an ordered list of children.
#[derive(Debug, Clone)]
pub struct GroupSenderProperty {
    name: String,
    children: Vec<SenderProperty>,
    /// Children removed since the last encode, as (name, type)
    removed: Vec<(String, ValueType)>,
    dirty: bool,
}

impl SenderProperty {
    /// Create a leaf holding `value`.
    #[must_use]
    pub fn leaf(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        SenderProperty::Leaf(LeafSenderProperty {
            name: name.into(),
            value: value.into(),
            dirty: true,
        })
    }

    /// Create a group from an ordered list of children.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateChild`] if two children share a name.
    pub fn group(
        name: impl Into<String>,
        children: impl IntoIterator<Item = SenderProperty>,
    ) -> Result<Self, SyncError> {
        let mut group = GroupSenderProperty::new(name);
        for child in children {
            group.add_child(child)?;
        }
        Ok(SenderProperty::Group(group))
    }

    /// Create a group with no children.
    #[must_use]
    pub fn empty_group(name: impl Into<String>) -> Self {
        SenderProperty::Group(GroupSenderProperty::new(name))
    }

    /// The node name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            SenderProperty::Leaf(leaf) => &leaf.name,
            SenderProperty::Group(group) => &group.name,
        }
    }

    /// The record tag this node encodes with.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            SenderProperty::Leaf(leaf) => leaf.value.value_type(),
            SenderProperty::Group(_) => ValueType::Subtree,
        }
    }

    /// This node's own dirty flag. Descendants are not consulted.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        match self {
            SenderProperty::Leaf(leaf) => leaf.dirty,
            SenderProperty::Group(group) => group.dirty,
        }
    }

    /// Whether the next [`encode_dirty`](Self::encode_dirty) would emit anything.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        match self {
            SenderProperty::Leaf(leaf) => leaf.dirty,
            SenderProperty::Group(group) => {
                group.dirty
                    || !group.removed.is_empty()
                    || group.children.iter().any(SenderProperty::has_pending)
            }
        }
    }

    /// Mark this node and every descendant dirty, so the next encode is a full snapshot.
    pub fn mark_all_dirty(&mut self) {
        match self {
            SenderProperty::Leaf(leaf) => leaf.dirty = true,
            SenderProperty::Group(group) => {
                group.dirty = true;
                group
                    .children
                    .iter_mut()
                    .for_each(SenderProperty::mark_all_dirty);
            }
        }
    }

    /// Encode everything that changed since the last encode and clear the flags.
    ///
    /// A leaf is emitted only if dirty. A group is emitted if it is dirty, has
    /// pending removals, or any descendant produced a record; its children
    /// sequence holds tombstones for removed children followed by the records of
    /// changed children, in child order. Returns `None` if nothing changed.
    pub fn encode_dirty(&mut self, clock: &dyn Clock) -> Option<PropertyRecord> {
        match self {
            SenderProperty::Leaf(leaf) => {
                if !leaf.dirty {
                    return None;
                }
                leaf.dirty = false;
                Some(PropertyRecord::scalar(&leaf.name, clock.now(), &leaf.value))
            }
            SenderProperty::Group(group) => group.encode_dirty(clock),
        }
    }

    /// Tombstone for this node. Ignores and does not touch dirty state.
    #[must_use]
    pub fn encode_delete(&self, clock: &dyn Clock) -> PropertyRecord {
        PropertyRecord::tombstone(self.name(), clock.now(), self.value_type())
    }

    /// Encode now, for callers that require a change to be pending.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StaleEncode`] if nothing changed since the last encode.
    pub fn encode_now(&mut self, clock: &dyn Clock) -> Result<PropertyRecord, SyncError> {
        let record = self.encode_dirty(clock).ok_or_else(|| SyncError::StaleEncode {
            name: self.name().to_string(),
        })?;
        tracing::debug!(
            name = %record.name,
            records = record.count(),
            "Forced encode"
        );
        Ok(record)
    }

    /// Find a descendant by slash-separated path relative to this node.
    ///
    /// The empty path addresses `self`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&SenderProperty> {
        segments(path).try_fold(self, |node, segment| match node {
            SenderProperty::Group(group) => group.child(segment),
            SenderProperty::Leaf(_) => None,
        })
    }

    /// Mutable variant of [`get`](Self::get).
    #[must_use]
    pub fn get_mut(&mut self, path: &str) -> Option<&mut SenderProperty> {
        segments(path).try_fold(self, |node, segment| match node {
            SenderProperty::Group(group) => group.child_mut(segment),
            SenderProperty::Leaf(_) => None,
        })
    }

    /// Set the value of the leaf at `path`.
    ///
    /// Returns `Ok(false)` if no leaf lives at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TypeConflict`] if the value's type differs from the leaf's.
    pub fn set_value_at(&mut self, path: &str, value: impl Into<Scalar>) -> Result<bool, SyncError> {
        match self.get_mut(path) {
            Some(SenderProperty::Leaf(leaf)) => leaf.set_value(value).map(|()| true),
            _ => Ok(false),
        }
    }

    /// The leaf view of this node, if it is one.
    #[must_use]
    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafSenderProperty> {
        match self {
            SenderProperty::Leaf(leaf) => Some(leaf),
            SenderProperty::Group(_) => None,
        }
    }

    /// The group view of this node, if it is one.
    #[must_use]
    pub fn as_group_mut(&mut self) -> Option<&mut GroupSenderProperty> {
        match self {
            SenderProperty::Group(group) => Some(group),
            SenderProperty::Leaf(_) => None,
        }
    }

    /// Render this node as `{ "<name>": ... }`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        render_object(&[(self.name(), self)], 0, &mut out);
        out
    }
}

impl DumpNode for SenderProperty {
    fn scalar(&self) -> Option<&Scalar> {
        match self {
            SenderProperty::Leaf(leaf) => Some(&leaf.value),
            SenderProperty::Group(_) => None,
        }
    }

    fn entries(&self) -> Vec<(&str, &Self)> {
        match self {
            SenderProperty::Leaf(_) => Vec::new(),
            SenderProperty::Group(group) => group
                .children
                .iter()
                .map(|child| (child.name(), child))
                .collect(),
        }
    }
}

impl LeafSenderProperty {
    /// The node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current value.
    #[must_use]
    pub fn value(&self) -> &Scalar {
        &self.value
    }

    /// Replace the value and mark the leaf dirty.
    ///
    /// The leaf is marked dirty even if the new value equals the old one.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TypeConflict`] if `value` has a different type than
    /// the leaf was built with. The stored value is unchanged in that case.
    pub fn set_value(&mut self, value: impl Into<Scalar>) -> Result<(), SyncError> {
        let value = value.into();
        if value.value_type() != self.value.value_type() {
            return Err(SyncError::TypeConflict {
                name: self.name.clone(),
                existing: self.value.value_type(),
                incoming: value.value_type(),
            });
        }
        self.value = value;
        self.dirty = true;
        Ok(())
    }
}

impl GroupSenderProperty {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            removed: Vec::new(),
            dirty: true,
        }
    }

    /// The node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Children in order.
    pub fn children(&self) -> impl Iterator<Item = &SenderProperty> {
        self.children.iter()
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

    /// Direct child by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&SenderProperty> {
        self.children.iter().find(|child| child.name() == name)
    }

    /// Mutable direct child by name.
    #[must_use]
    pub fn child_mut(&mut self, name: &str) -> Option<&mut SenderProperty> {
        self.children.iter_mut().find(|child| child.name() == name)
    }

    /// Append a child and mark the group dirty.
    ///
    /// The whole child subtree is marked dirty as well, so a node that was
    /// detached from this or another group is sent again in full.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateChild`] if a child with the same name exists.
    pub fn add_child(&mut self, child: SenderProperty) -> Result<(), SyncError> {
        if self.child(child.name()).is_some() {
            return Err(SyncError::DuplicateChild {
                name: child.name().to_string(),
            });
        }
        let mut child = child;
        child.mark_all_dirty();
        self.children.push(child);
        self.dirty = true;
        Ok(())
    }

    /// Detach and return the child named `name`, marking the group dirty.
    ///
    /// A tombstone for the child is emitted by the group's next encode.
    pub fn remove_child(&mut self, name: &str) -> Option<SenderProperty> {
        let index = self.children.iter().position(|child| child.name() == name)?;
        let child = self.children.remove(index);
        self.removed
            .push((child.name().to_string(), child.value_type()));
        self.dirty = true;
        tracing::trace!(group = %self.name, child = name, "Removed child");
        Some(child)
    }

    fn encode_dirty(&mut self, clock: &dyn Clock) -> Option<PropertyRecord> {
        let timestamp = clock.now();
        let mut records: Vec<PropertyRecord> = self
            .removed
            .drain(..)
            .map(|(name, value_type)| PropertyRecord::tombstone(name, timestamp, value_type))
            .collect();
        records.extend(
            self.children
                .iter_mut()
                .filter_map(|child| child.encode_dirty(clock)),
        );

        if records.is_empty() && !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(PropertyRecord::subtree(&self.name, timestamp, records))
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
