//! Range predicates answering structural questions about a forest.
//!
//! A [`Predicate`] is a conjunction of comparisons on a row's `left`, `right`,
//! `level` or `right - left`. The same predicate is evaluated in memory by the
//! planner and rendered as a SeaORM [`Condition`] by the repository, so the
//! shift statements issued to the database select exactly the rows the planner
//! reasoned about. Group scoping is added separately by the caller.

use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition};

use crate::node::Bounds;
use crate::traits::NestedSetModel;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Field {
    Left,
    Right,
    Level,
    /// `right - left`.
    Span,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Cmp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Term {
    pub field: Field,
    pub cmp: Cmp,
    pub value: i32,
}

impl Term {
    pub const fn new(field: Field, cmp: Cmp, value: i32) -> Self {
        Self { field, cmp, value }
    }

    pub fn matches(&self, bounds: &Bounds) -> bool {
        let actual = match self.field {
            Field::Left => bounds.left,
            Field::Right => bounds.right,
            Field::Level => bounds.level,
            Field::Span => bounds.span(),
        };
        match self.cmp {
            Cmp::Lt => actual < self.value,
            Cmp::Le => actual <= self.value,
            Cmp::Eq => actual == self.value,
            Cmp::Ge => actual >= self.value,
            Cmp::Gt => actual > self.value,
        }
    }

    fn expr<M: NestedSetModel>(&self) -> SimpleExpr {
        let value = self.value;
        let column = match self.field {
            Field::Left => M::left_column(),
            Field::Right => M::right_column(),
            Field::Level => M::level_column(),
            Field::Span => {
                let span = Expr::expr(Expr::col(M::right_column()).sub(Expr::col(M::left_column())));
                return match self.cmp {
                    Cmp::Lt => span.lt(value),
                    Cmp::Le => span.lte(value),
                    Cmp::Eq => span.eq(value),
                    Cmp::Ge => span.gte(value),
                    Cmp::Gt => span.gt(value),
                };
            }
        };
        match self.cmp {
            Cmp::Lt => column.lt(value),
            Cmp::Le => column.lte(value),
            Cmp::Eq => column.eq(value),
            Cmp::Ge => column.gte(value),
            Cmp::Gt => column.gt(value),
        }
    }
}

/// Conjunction of [`Term`]s. The empty predicate matches every row.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    pub fn new(terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            terms: terms.into_iter().collect(),
        }
    }

    pub fn root() -> Self {
        Self::new([Term::new(Field::Level, Cmp::Eq, 0)])
    }

    pub fn not_root() -> Self {
        Self::new([Term::new(Field::Level, Cmp::Gt, 0)])
    }

    pub fn leaf() -> Self {
        Self::new([Term::new(Field::Span, Cmp::Le, 1)])
    }

    pub fn parent_of(node: &Bounds) -> Self {
        Self::ancestors_of(node).and_term(Term::new(Field::Level, Cmp::Eq, node.level - 1))
    }

    pub fn children_of(node: &Bounds) -> Self {
        Self::descendants_of(node).and_term(Term::new(Field::Level, Cmp::Eq, node.level + 1))
    }

    pub fn ancestors_of(node: &Bounds) -> Self {
        Self::new([
            Term::new(Field::Left, Cmp::Lt, node.left),
            Term::new(Field::Right, Cmp::Gt, node.right),
        ])
    }

    pub fn descendants_of(node: &Bounds) -> Self {
        Self::new([
            Term::new(Field::Left, Cmp::Gt, node.left),
            Term::new(Field::Right, Cmp::Lt, node.right),
        ])
    }

    pub fn ancestors_or_self_of(node: &Bounds) -> Self {
        Self::new([
            Term::new(Field::Left, Cmp::Le, node.left),
            Term::new(Field::Right, Cmp::Ge, node.right),
        ])
    }

    pub fn descendants_or_self_of(node: &Bounds) -> Self {
        Self::new([
            Term::new(Field::Left, Cmp::Ge, node.left),
            Term::new(Field::Right, Cmp::Le, node.right),
        ])
    }

    pub fn and(mut self, other: Predicate) -> Self {
        self.terms.extend(other.terms);
        self
    }

    pub fn and_term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn matches(&self, bounds: &Bounds) -> bool {
        self.terms.iter().all(|term| term.matches(bounds))
    }

    /// Render as a SeaORM condition over the model's interval columns.
    pub fn condition<M: NestedSetModel>(&self) -> Condition {
        self.terms
            .iter()
            .fold(Condition::all(), |condition, term| condition.add(term.expr::<M>()))
    }
}

/// Structural relationship to a reference node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Axis {
    Parent,
    Child,
    Ancestor,
    Descendant,
    AncestorOrSelf,
    DescendantOrSelf,
}

impl Axis {
    pub fn predicate(self, node: &Bounds) -> Predicate {
        match self {
            Axis::Parent => Predicate::parent_of(node),
            Axis::Child => Predicate::children_of(node),
            Axis::Ancestor => Predicate::ancestors_of(node),
            Axis::Descendant => Predicate::descendants_of(node),
            Axis::AncestorOrSelf => Predicate::ancestors_or_self_of(node),
            Axis::DescendantOrSelf => Predicate::descendants_or_self_of(node),
        }
    }
}
