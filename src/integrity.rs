//! Read-only verification of the nested-set invariants of one forest.

use serde::Serialize;

use crate::node::Bounds;

/// A single broken invariant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation<Id> {
    /// A non-empty forest must have exactly one node at level 0.
    RootCount { found: usize },
    /// The root must span `[1, 2N]`.
    RootBounds { id: Id, bounds: Bounds, expected_right: i32 },
    /// `right <= left`.
    EmptyInterval { id: Id, bounds: Bounds },
    /// Two intervals overlap without one containing the other.
    Overlap { outer: Id, inner: Id },
    /// A node's level disagrees with the depth implied by its interval.
    LevelMismatch { id: Id, expected: i32, found: i32 },
    /// The sorted bounds are not exactly `1..=2N`.
    NotDense { position: i32, found: i32 },
}

/// Outcome of [`check`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct IntegrityReport<Id> {
    pub nodes: usize,
    pub violations: Vec<Violation<Id>>,
}

impl<Id> IntegrityReport<Id> {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every invariant over all rows of one forest.
pub fn check<Id: Clone>(rows: &[(Id, Bounds)]) -> IntegrityReport<Id> {
    let mut violations = Vec::new();
    let total = rows.len() as i32 * 2;

    let roots: Vec<&(Id, Bounds)> = rows.iter().filter(|(_, b)| b.level == 0).collect();
    if !rows.is_empty() && roots.len() != 1 {
        violations.push(Violation::RootCount { found: roots.len() });
    }
    for (id, bounds) in roots {
        if bounds.left != 1 || bounds.right != total {
            violations.push(Violation::RootBounds {
                id: id.clone(),
                bounds: *bounds,
                expected_right: total,
            });
        }
    }

    for (id, bounds) in rows {
        if bounds.right <= bounds.left {
            violations.push(Violation::EmptyInterval {
                id: id.clone(),
                bounds: *bounds,
            });
        }
    }

    let mut edges: Vec<i32> = rows.iter().flat_map(|(_, b)| [b.left, b.right]).collect();
    edges.sort_unstable();
    if let Some((position, found)) = (1..)
        .zip(edges)
        .find(|(position, found)| position != found)
    {
        violations.push(Violation::NotDense { position, found });
    }

    let mut ordered: Vec<&(Id, Bounds)> = rows.iter().collect();
    ordered.sort_by_key(|(_, b)| b.left);
    let mut open: Vec<&(Id, Bounds)> = Vec::new();
    for node in ordered {
        let (id, bounds) = node;
        while open.last().is_some_and(|(_, top)| top.right < bounds.left) {
            open.pop();
        }
        let expected = match open.last() {
            Some((outer, top)) => {
                if bounds.right >= top.right {
                    violations.push(Violation::Overlap {
                        outer: outer.clone(),
                        inner: id.clone(),
                    });
                }
                top.level + 1
            }
            None => 0,
        };
        if bounds.level != expected {
            violations.push(Violation::LevelMismatch {
                id: id.clone(),
                expected,
                found: bounds.level,
            });
        }
        open.push(node);
    }

    IntegrityReport {
        nodes: rows.len(),
        violations,
    }
}
