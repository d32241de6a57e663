//! Pure interval arithmetic for structural mutations.
//!
//! Every function takes bounds captured before the first write and returns the
//! ordered list of [`Shift`] statements that carries a forest from one valid
//! state to the next. Each shift is a single `UPDATE ... SET col = col + delta
//! WHERE predicate` and must run after the previous one has been applied to
//! every row; the statements are not commutative.
//!
//! Nothing here touches a database, which lets the same plans drive the SQL
//! executor in [`crate::repository`] and in-memory forests in tests.

use crate::axis::{Cmp, Field, Predicate, Term};
use crate::error::NestedSetError;
use crate::node::Bounds;

/// One range-scoped update: add the deltas to every row matching `filter`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Shift {
    pub filter: Predicate,
    pub left: i32,
    pub right: i32,
    pub level: i32,
}

impl Shift {
    pub fn new(filter: Predicate) -> Self {
        Self {
            filter,
            left: 0,
            right: 0,
            level: 0,
        }
    }

    pub fn left(mut self, delta: i32) -> Self {
        self.left = delta;
        self
    }

    pub fn right(mut self, delta: i32) -> Self {
        self.right = delta;
        self
    }

    pub fn both(self, delta: i32) -> Self {
        self.left(delta).right(delta)
    }

    pub fn level(mut self, delta: i32) -> Self {
        self.level = delta;
        self
    }

    pub fn is_noop(&self) -> bool {
        self.left == 0 && self.right == 0 && self.level == 0
    }

    /// Apply to one row; returns whether the row matched.
    pub fn apply(&self, bounds: &mut Bounds) -> bool {
        if !self.filter.matches(bounds) {
            return false;
        }
        bounds.left += self.left;
        bounds.right += self.right;
        bounds.level += self.level;
        true
    }
}

/// Run `shifts` in order over an in-memory set of rows.
pub fn apply_all<'a, I>(shifts: &[Shift], rows: I)
where
    I: IntoIterator<Item = &'a mut Bounds>,
{
    let mut rows: Vec<&mut Bounds> = rows.into_iter().collect();
    for shift in shifts {
        for row in rows.iter_mut() {
            shift.apply(row);
        }
    }
}

/// Shifts and final bounds for a new node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Insertion {
    pub bounds: Bounds,
    pub shifts: Vec<Shift>,
}

/// Open a two-slot gap at the end of `parent` for a new last child.
///
/// The shifts must run before the new row is written so it is never shifted itself.
pub fn insert(parent: Bounds) -> Insertion {
    let point = parent.right;
    Insertion {
        bounds: Bounds::new(point, point + 1, parent.level + 1),
        shifts: vec![
            Shift::new(Predicate::new([Term::new(Field::Left, Cmp::Gt, point)])).left(2),
            Shift::new(Predicate::new([Term::new(Field::Right, Cmp::Ge, point)])).right(2),
        ],
    }
}

/// Shifts and final bounds for a subtree moved under a new parent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Relocation {
    pub bounds: Bounds,
    pub shifts: Vec<Shift>,
}

/// Move `subject` and its descendants to become the last child of `parent`.
///
/// Returns `Ok(None)` when `parent` already is the subject's parent.
pub fn relocate(subject: Bounds, parent: Bounds) -> Result<Option<Relocation>, NestedSetError> {
    subject.validate()?;
    parent.validate()?;
    if subject.is_root() {
        return Err(NestedSetError::RootImmovable);
    }
    if subject.contains_or_eq(&parent) {
        return Err(NestedSetError::Cycle);
    }
    if parent.is_parent_of(&subject) {
        return Ok(None);
    }

    let width = subject.width();
    let mut shifts = vec![
        // make room after the parent's last child
        Shift::new(Predicate::new([
            Term::new(Field::Left, Cmp::Gt, parent.left),
            Term::new(Field::Right, Cmp::Gt, parent.right),
        ]))
        .both(width),
        Shift::new(Predicate::ancestors_or_self_of(&parent)).right(width),
    ];

    let mut current = subject;
    for shift in &shifts {
        shift.apply(&mut current);
    }

    // the gap opened at the parent's original right bound
    shifts.push(
        Shift::new(Predicate::descendants_or_self_of(&current))
            .both(parent.right - current.left)
            .level(parent.level + 1 - subject.level),
    );

    let closing = [
        Shift::new(Predicate::new([
            Term::new(Field::Left, Cmp::Gt, current.left),
            Term::new(Field::Right, Cmp::Gt, current.right),
        ]))
        .both(-width),
        Shift::new(Predicate::ancestors_of(&current)).right(-width),
    ];

    let mut bounds = Bounds::new(parent.right, parent.right + subject.span(), parent.level + 1);
    for shift in &closing {
        shift.apply(&mut bounds);
    }
    shifts.extend(closing);

    Ok(Some(Relocation { bounds, shifts }))
}

/// Exchange two adjacent sibling subtrees; `first` must directly precede `second`.
///
/// `park` must be at least the forest root's right bound: the later subtree is
/// moved past it while the earlier one slides over, so the two ranges never
/// overlap inside one statement.
pub fn swap(first: Bounds, second: Bounds, park: i32) -> Result<Vec<Shift>, NestedSetError> {
    first.validate()?;
    second.validate()?;
    if first.level != second.level || first.right + 1 != second.left {
        return Err(NestedSetError::invariant(format!(
            "nodes ({}, {}) and ({}, {}) are not adjacent siblings",
            first.left, first.right, second.left, second.right
        )));
    }
    if park < second.right {
        return Err(NestedSetError::invariant(
            "parking offset lies inside the forest",
        ));
    }

    Ok(vec![
        Shift::new(Predicate::descendants_or_self_of(&second)).both(park),
        Shift::new(Predicate::descendants_or_self_of(&first)).both(second.width()),
        Shift::new(Predicate::new([Term::new(
            Field::Left,
            Cmp::Ge,
            second.left + park,
        )]))
        .both(-(park + first.width())),
    ])
}

/// Close the two-slot gap left by removing `leaf`.
pub fn remove_leaf(leaf: Bounds) -> Result<Vec<Shift>, NestedSetError> {
    leaf.validate()?;
    if !leaf.is_leaf() {
        return Err(NestedSetError::invariant(format!(
            "node ({}, {}) still has descendants",
            leaf.left, leaf.right
        )));
    }
    Ok(vec![
        Shift::new(Predicate::new([Term::new(Field::Left, Cmp::Gt, leaf.left)])).left(-2),
        Shift::new(Predicate::new([Term::new(Field::Right, Cmp::Gt, leaf.right)])).right(-2),
    ])
}

/// Flattened layout for `count` rows: a root followed by `count - 1` children.
pub fn flatten(count: usize) -> Result<Vec<Bounds>, NestedSetError> {
    let total = i32::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(2))
        .ok_or_else(|| NestedSetError::invariant("forest too large to renumber"))?;

    Ok((0..count as i32)
        .map(|index| {
            if index == 0 {
                Bounds::new(1, total, 0)
            } else {
                Bounds::new(2 * index, 2 * index + 1, 1)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(shifts: &[Shift], rows: &mut [Bounds]) {
        apply_all(shifts, rows.iter_mut());
    }

    #[test]
    fn insert_appends_last_child() {
        let mut root = Bounds::root();

        let first = insert(root);
        assert_eq!(first.bounds, Bounds::new(2, 3, 1));
        run(&first.shifts, std::slice::from_mut(&mut root));
        assert_eq!(root, Bounds::new(1, 4, 0));

        let mut rows = [root, first.bounds];
        let second = insert(rows[0]);
        run(&second.shifts, &mut rows);
        assert_eq!(second.bounds, Bounds::new(4, 5, 1));
        assert_eq!(rows, [Bounds::new(1, 6, 0), Bounds::new(2, 3, 1)]);
    }

    #[test]
    fn insert_under_nested_parent_shifts_following_nodes() {
        // root(1,6) -> a(2,3), b(4,5); insert under a
        let mut rows = [
            Bounds::new(1, 6, 0),
            Bounds::new(2, 3, 1),
            Bounds::new(4, 5, 1),
        ];
        let insertion = insert(rows[1]);
        run(&insertion.shifts, &mut rows);
        assert_eq!(insertion.bounds, Bounds::new(3, 4, 2));
        assert_eq!(
            rows,
            [
                Bounds::new(1, 8, 0),
                Bounds::new(2, 5, 1),
                Bounds::new(6, 7, 1),
            ]
        );
    }

    #[test]
    fn remove_leaf_closes_gap() {
        let mut rows = [Bounds::new(1, 6, 0), Bounds::new(4, 5, 1)];
        let shifts = remove_leaf(Bounds::new(2, 3, 1)).unwrap();
        run(&shifts, &mut rows);
        assert_eq!(rows, [Bounds::new(1, 4, 0), Bounds::new(2, 3, 1)]);
    }

    #[test]
    fn remove_leaf_rejects_inner_node() {
        assert!(remove_leaf(Bounds::new(1, 4, 0)).is_err());
    }

    #[test]
    fn relocate_to_later_sibling() {
        // root(1,8) -> a(2,5) -> c(3,4); b(6,7). Move c under b.
        let mut rows = [
            Bounds::new(1, 8, 0),
            Bounds::new(2, 5, 1),
            Bounds::new(3, 4, 2),
            Bounds::new(6, 7, 1),
        ];
        let relocation = relocate(rows[2], rows[3]).unwrap().unwrap();
        run(&relocation.shifts, &mut rows);
        assert_eq!(
            rows,
            [
                Bounds::new(1, 8, 0),
                Bounds::new(2, 3, 1),
                Bounds::new(5, 6, 2),
                Bounds::new(4, 7, 1),
            ]
        );
        assert_eq!(relocation.bounds, rows[2]);
    }

    #[test]
    fn relocate_to_earlier_sibling() {
        // root(1,8) -> a(2,3); b(4,7) -> c(5,6). Move c under a.
        let mut rows = [
            Bounds::new(1, 8, 0),
            Bounds::new(2, 3, 1),
            Bounds::new(4, 7, 1),
            Bounds::new(5, 6, 2),
        ];
        let relocation = relocate(rows[3], rows[1]).unwrap().unwrap();
        run(&relocation.shifts, &mut rows);
        assert_eq!(
            rows,
            [
                Bounds::new(1, 8, 0),
                Bounds::new(2, 5, 1),
                Bounds::new(6, 7, 1),
                Bounds::new(3, 4, 2),
            ]
        );
        assert_eq!(relocation.bounds, rows[3]);
    }

    #[test]
    fn relocate_subtree_up_one_level() {
        // root(1,10) -> a(2,9) -> b(3,8) -> c(4,5), d(6,7). Move b under root.
        let mut rows = [
            Bounds::new(1, 10, 0),
            Bounds::new(2, 9, 1),
            Bounds::new(3, 8, 2),
            Bounds::new(4, 5, 3),
            Bounds::new(6, 7, 3),
        ];
        let relocation = relocate(rows[2], rows[0]).unwrap().unwrap();
        run(&relocation.shifts, &mut rows);
        assert_eq!(
            rows,
            [
                Bounds::new(1, 10, 0),
                Bounds::new(2, 3, 1),
                Bounds::new(4, 9, 1),
                Bounds::new(5, 6, 2),
                Bounds::new(7, 8, 2),
            ]
        );
    }

    #[test]
    fn relocate_rejects_cycles_and_root() {
        let root = Bounds::new(1, 8, 0);
        let a = Bounds::new(2, 5, 1);
        let c = Bounds::new(3, 4, 2);
        assert!(matches!(relocate(a, c), Err(NestedSetError::Cycle)));
        assert!(matches!(relocate(a, a), Err(NestedSetError::Cycle)));
        assert!(matches!(relocate(root, a), Err(NestedSetError::RootImmovable)));
    }

    #[test]
    fn relocate_under_current_parent_is_noop() {
        let root = Bounds::new(1, 4, 0);
        let a = Bounds::new(2, 3, 1);
        assert_eq!(relocate(a, root).unwrap(), None);
    }

    #[test]
    fn swap_exchanges_subtrees() {
        // root(1,8) -> a(2,3); b(4,7) -> c(5,6). Swap a and b.
        let original = [
            Bounds::new(1, 8, 0),
            Bounds::new(2, 3, 1),
            Bounds::new(4, 7, 1),
            Bounds::new(5, 6, 2),
        ];
        let mut rows = original;
        let shifts = swap(rows[1], rows[2], rows[0].right).unwrap();
        run(&shifts, &mut rows);
        assert_eq!(
            rows,
            [
                Bounds::new(1, 8, 0),
                Bounds::new(6, 7, 1),
                Bounds::new(2, 5, 1),
                Bounds::new(3, 4, 2),
            ]
        );

        let back = swap(rows[2], rows[1], rows[0].right).unwrap();
        run(&back, &mut rows);
        assert_eq!(rows, original);
    }

    #[test]
    fn swap_rejects_non_adjacent_nodes() {
        let a = Bounds::new(2, 3, 1);
        let c = Bounds::new(6, 7, 1);
        assert!(swap(a, c, 10).is_err());
    }

    #[test]
    fn flatten_lays_out_root_and_children() {
        let layout = flatten(5).unwrap();
        assert_eq!(
            layout,
            vec![
                Bounds::new(1, 10, 0),
                Bounds::new(2, 3, 1),
                Bounds::new(4, 5, 1),
                Bounds::new(6, 7, 1),
                Bounds::new(8, 9, 1),
            ]
        );
        assert!(flatten(0).unwrap().is_empty());
        assert_eq!(flatten(1).unwrap(), vec![Bounds::new(1, 2, 0)]);
    }
}
