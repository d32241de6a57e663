//! Plain values describing where a node sits in its forest.

use serde::{Deserialize, Serialize};

use crate::error::NestedSetError;

/// Interval bounds and depth of one node.
///
/// A node `a` is an ancestor of `b` exactly when `a.left < b.left` and
/// `a.right > b.right`; the parent is the ancestor whose level is one less.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub right: i32,
    pub level: i32,
}

impl Bounds {
    pub const fn new(left: i32, right: i32, level: i32) -> Self {
        Self { left, right, level }
    }

    /// Bounds of the only node of a fresh forest.
    pub const fn root() -> Self {
        Self::new(1, 2, 0)
    }

    /// `right - left`.
    pub fn span(&self) -> i32 {
        self.right - self.left
    }

    /// Index space consumed by the node and its descendants (`span + 1`).
    pub fn width(&self) -> i32 {
        self.span() + 1
    }

    pub fn is_root(&self) -> bool {
        self.level == 0
    }

    pub fn is_leaf(&self) -> bool {
        self.span() <= 1
    }

    pub fn descendant_count(&self) -> i32 {
        (self.span() - 1) / 2
    }

    /// Strict containment: `other` is a descendant of `self`.
    pub fn contains(&self, other: &Bounds) -> bool {
        self.left < other.left && self.right > other.right
    }

    pub fn contains_or_eq(&self, other: &Bounds) -> bool {
        self.left <= other.left && self.right >= other.right
    }

    pub fn is_parent_of(&self, other: &Bounds) -> bool {
        self.contains(other) && self.level + 1 == other.level
    }

    /// Rejects bounds that no consistent forest can contain.
    pub fn validate(&self) -> Result<(), NestedSetError> {
        if self.left < 1 || self.right <= self.left || self.level < 0 {
            return Err(NestedSetError::invariant(format!(
                "malformed bounds left={} right={} level={}",
                self.left, self.right, self.level
            )));
        }
        Ok(())
    }
}

/// Where a node should be attached.
///
/// Passed explicitly to insert and move operations; it is never stored.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ParentRef<Id> {
    /// Attach directly under the forest root.
    Root,
    /// Attach under the node with this id.
    Node(Id),
}

impl<Id> Default for ParentRef<Id> {
    fn default() -> Self {
        Self::Root
    }
}

impl<Id> ParentRef<Id> {
    pub fn node(id: Id) -> Self {
        Self::Node(id)
    }
}

impl<Id> From<Option<Id>> for ParentRef<Id> {
    fn from(value: Option<Id>) -> Self {
        match value {
            Some(id) => Self::Node(id),
            None => Self::Root,
        }
    }
}
