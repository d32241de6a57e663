use std::marker::PhantomData;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, TransactionTrait,
};
use tracing::{debug, warn};

use crate::axis::{Axis, Cmp, Field, Predicate, Term};
use crate::config::NestedSetConfig;
use crate::error::NestedSetError;
use crate::integrity::{self, IntegrityReport};
use crate::lock::ForestTransaction;
use crate::node::{Bounds, ParentRef};
use crate::plan::{self, Shift};
use crate::traits::NestedSetModel;

/// Repository exposing the nested-set operations for a given model.
///
/// Reads accept any SeaORM connection and are scoped to the forest of the
/// node (or group) they are given. Structural mutations require a
/// [`ForestTransaction`]; the caller commits it once the operation succeeds.
#[derive(Debug, Default)]
pub struct NestedSetRepository<M>
where
    M: NestedSetModel,
{
    _marker: PhantomData<M>,
}

impl<M> NestedSetRepository<M>
where
    M: NestedSetModel,
{
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn config(&self) -> &'static NestedSetConfig {
        M::nested_set_config()
    }

    fn ensure_supported(conn: &impl ConnectionTrait) -> Result<(), NestedSetError> {
        match conn.get_database_backend() {
            DbBackend::Postgres | DbBackend::Sqlite => Ok(()),
            _ => Err(NestedSetError::UnsupportedBackend),
        }
    }

    fn scoped(group: &M::Group) -> Select<M::Entity> {
        M::Entity::find().filter(M::group_condition(group))
    }

    fn matching(group: &M::Group, predicate: &Predicate) -> Select<M::Entity> {
        Self::scoped(group).filter(predicate.condition::<M>())
    }

    /// Open a locked transaction on the forest identified by `group`.
    pub async fn begin<C>(
        &self,
        db: &C,
        group: M::Group,
    ) -> Result<ForestTransaction<M>, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        ForestTransaction::begin(db, group).await
    }

    pub async fn find<C: ConnectionTrait>(
        &self,
        conn: &C,
        group: &M::Group,
        id: &M::Id,
    ) -> Result<Option<M>, NestedSetError> {
        Self::ensure_supported(conn)?;
        let node = Self::scoped(group)
            .filter(M::id_column().eq(M::id_to_value(id)))
            .one(conn)
            .await?;
        Ok(node)
    }

    pub async fn root<C: ConnectionTrait>(
        &self,
        conn: &C,
        group: &M::Group,
    ) -> Result<Option<M>, NestedSetError> {
        Self::ensure_supported(conn)?;
        let mut roots = Self::matching(group, &Predicate::root())
            .order_by_asc(M::left_column())
            .all(conn)
            .await?;
        if roots.len() > 1 {
            return Err(NestedSetError::invariant(format!(
                "forest {group:?} has {} roots",
                roots.len()
            )));
        }
        Ok(roots.pop())
    }

    /// Roots of every forest in the table.
    pub async fn roots<C: ConnectionTrait>(&self, conn: &C) -> Result<Vec<M>, NestedSetError> {
        Self::ensure_supported(conn)?;
        let rows = M::Entity::find()
            .filter(Predicate::root().condition::<M>())
            .order_by_asc(M::id_column())
            .all(conn)
            .await?;
        Ok(rows)
    }

    /// Every node of a forest in pre-order.
    pub async fn forest<C: ConnectionTrait>(
        &self,
        conn: &C,
        group: &M::Group,
    ) -> Result<Vec<M>, NestedSetError> {
        Self::ensure_supported(conn)?;
        let rows = Self::scoped(group)
            .order_by_asc(M::left_column())
            .all(conn)
            .await?;
        Ok(rows)
    }

    /// Nodes standing in `axis` relation to `model`, ordered by `left`.
    pub async fn axis<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
        axis: Axis,
    ) -> Result<Vec<M>, NestedSetError> {
        Self::ensure_supported(conn)?;
        let rows = Self::matching(&model.group(), &axis.predicate(&model.bounds()))
            .order_by_asc(M::left_column())
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn parent<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Option<M>, NestedSetError> {
        Self::ensure_supported(conn)?;
        let bounds = model.bounds();
        if bounds.is_root() {
            return Ok(None);
        }
        let parent = Self::matching(&model.group(), &Predicate::parent_of(&bounds))
            .one(conn)
            .await?;
        Ok(parent)
    }

    pub async fn children<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        self.axis(conn, model, Axis::Child).await
    }

    pub async fn ancestors<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        self.axis(conn, model, Axis::Ancestor).await
    }

    pub async fn ancestors_or_self<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        self.axis(conn, model, Axis::AncestorOrSelf).await
    }

    pub async fn descendants<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        self.axis(conn, model, Axis::Descendant).await
    }

    pub async fn descendants_or_self<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        self.axis(conn, model, Axis::DescendantOrSelf).await
    }

    /// Leaf descendants of `model`, or `model` itself when it is a leaf.
    pub async fn leaves<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Vec<M>, NestedSetError> {
        Self::ensure_supported(conn)?;
        let predicate = Predicate::descendants_or_self_of(&model.bounds()).and(Predicate::leaf());
        let rows = Self::matching(&model.group(), &predicate)
            .order_by_asc(M::left_column())
            .all(conn)
            .await?;
        Ok(rows)
    }

    pub async fn prev_sibling<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Option<M>, NestedSetError> {
        self.sibling(conn, model, Cmp::Lt).await
    }

    pub async fn next_sibling<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
    ) -> Result<Option<M>, NestedSetError> {
        self.sibling(conn, model, Cmp::Gt).await
    }

    async fn sibling<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: &M,
        direction: Cmp,
    ) -> Result<Option<M>, NestedSetError> {
        let Some(parent) = self.parent(conn, model).await? else {
            return Ok(None);
        };
        let bounds = model.bounds();
        let predicate = Predicate::children_of(&parent.bounds())
            .and_term(Term::new(Field::Left, direction, bounds.left));
        let query = Self::matching(&model.group(), &predicate);
        let query = if direction == Cmp::Lt {
            query.order_by_desc(M::left_column())
        } else {
            query.order_by_asc(M::left_column())
        };
        Ok(query.one(conn).await?)
    }

    /// Report every invariant violation in the forest without changing it.
    pub async fn check_integrity<C: ConnectionTrait>(
        &self,
        conn: &C,
        group: &M::Group,
    ) -> Result<IntegrityReport<M::Id>, NestedSetError> {
        let rows = self
            .forest(conn, group)
            .await?
            .iter()
            .map(|node| (node.id(), node.bounds()))
            .collect::<Vec<_>>();
        let report = integrity::check(&rows);
        if !report.is_valid() {
            warn!(
                entity = self.config().entity_name(),
                ?group,
                violations = report.violations.len(),
                "forest failed integrity check"
            );
        }
        Ok(report)
    }

    /// Create the root of an empty forest.
    pub async fn create_root(&self, txn: &ForestTransaction<M>) -> Result<M, NestedSetError> {
        let conn = txn.connection();
        let group = txn.group();
        if self.root(conn, group).await?.is_some() {
            return Err(NestedSetError::RootExists);
        }
        let orphans = Self::scoped(group).count(conn).await?;
        if orphans > 0 {
            return Err(NestedSetError::invariant(format!(
                "forest {group:?} has {orphans} nodes but no root"
            )));
        }

        let mut active = M::ActiveModel::default();
        M::prepare_root(&mut active);
        M::set_group(&mut active, group);
        M::set_bounds(&mut active, Bounds::root());
        let root = active.insert(conn).await?;
        debug!(entity = self.config().entity_name(), ?group, "created forest root");
        Ok(root)
    }

    /// Return the forest root, creating it when automatic creation is enabled.
    pub async fn ensure_root(&self, txn: &ForestTransaction<M>) -> Result<M, NestedSetError> {
        match self.root(txn.connection(), txn.group()).await? {
            Some(root) => Ok(root),
            None if self.config().auto_create_root() => self.create_root(txn).await,
            None => Err(NestedSetError::MissingRoot),
        }
    }

    async fn resolve_parent(
        &self,
        txn: &ForestTransaction<M>,
        parent: ParentRef<M::Id>,
    ) -> Result<M, NestedSetError> {
        match parent {
            ParentRef::Root => self.ensure_root(txn).await,
            ParentRef::Node(id) => self
                .find(txn.connection(), txn.group(), &id)
                .await?
                .ok_or_else(|| NestedSetError::ParentNotFound(format!("{id:?}"))),
        }
    }

    async fn reload(&self, txn: &ForestTransaction<M>, id: &M::Id) -> Result<M, NestedSetError> {
        self.find(txn.connection(), txn.group(), id)
            .await?
            .ok_or_else(|| NestedSetError::NodeNotFound(format!("{id:?}")))
    }

    /// Insert `active` as the last child of `parent`.
    ///
    /// Interval columns and group columns of `active` are overwritten.
    pub async fn insert(
        &self,
        txn: &ForestTransaction<M>,
        mut active: M::ActiveModel,
        parent: ParentRef<M::Id>,
    ) -> Result<M, NestedSetError> {
        let parent = self.resolve_parent(txn, parent).await?;
        let parent_bounds = parent.bounds();
        parent_bounds.validate()?;

        let insertion = plan::insert(parent_bounds);
        self.run(txn, &insertion.shifts).await?;

        M::set_bounds(&mut active, insertion.bounds);
        M::set_group(&mut active, txn.group());
        let model = active.insert(txn.connection()).await?;
        debug!(
            entity = self.config().entity_name(),
            id = ?model.id(),
            parent = ?parent.id(),
            "inserted node"
        );
        Ok(model)
    }

    /// Move `model` and its descendants to become the last child of `parent`.
    pub async fn move_to(
        &self,
        txn: &ForestTransaction<M>,
        model: &M,
        parent: ParentRef<M::Id>,
    ) -> Result<M, NestedSetError> {
        let subject = self.reload(txn, &model.id()).await?;
        if subject.bounds().is_root() {
            return Err(NestedSetError::RootImmovable);
        }
        let target = self.resolve_parent(txn, parent).await?;

        let Some(relocation) = plan::relocate(subject.bounds(), target.bounds())? else {
            return Ok(subject);
        };
        self.run(txn, &relocation.shifts).await?;
        debug!(
            entity = self.config().entity_name(),
            id = ?subject.id(),
            parent = ?target.id(),
            "moved subtree"
        );
        self.reload(txn, &subject.id()).await
    }

    /// Swap `model` with its preceding sibling. Returns `false` when it is already first.
    pub async fn move_prev(
        &self,
        txn: &ForestTransaction<M>,
        model: &M,
    ) -> Result<bool, NestedSetError> {
        let node = self.reload(txn, &model.id()).await?;
        match self.prev_sibling(txn.connection(), &node).await? {
            Some(prev) => {
                self.swap(txn, &prev, &node).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Swap `model` with its following sibling. Returns `false` when it is already last.
    pub async fn move_next(
        &self,
        txn: &ForestTransaction<M>,
        model: &M,
    ) -> Result<bool, NestedSetError> {
        let node = self.reload(txn, &model.id()).await?;
        match self.next_sibling(txn.connection(), &node).await? {
            Some(next) => {
                self.swap(txn, &node, &next).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Make `model` the first child of its parent; returns the number of swaps.
    pub async fn move_first(
        &self,
        txn: &ForestTransaction<M>,
        model: &M,
    ) -> Result<usize, NestedSetError> {
        let mut steps = 0;
        while self.move_prev(txn, model).await? {
            steps += 1;
        }
        Ok(steps)
    }

    /// Make `model` the last child of its parent; returns the number of swaps.
    pub async fn move_last(
        &self,
        txn: &ForestTransaction<M>,
        model: &M,
    ) -> Result<usize, NestedSetError> {
        let mut steps = 0;
        while self.move_next(txn, model).await? {
            steps += 1;
        }
        Ok(steps)
    }

    async fn swap(
        &self,
        txn: &ForestTransaction<M>,
        first: &M,
        second: &M,
    ) -> Result<(), NestedSetError> {
        let root = self
            .root(txn.connection(), txn.group())
            .await?
            .ok_or_else(|| NestedSetError::invariant("siblings found in a forest without root"))?;
        let shifts = plan::swap(first.bounds(), second.bounds(), root.bounds().right)?;
        self.run(txn, &shifts).await?;
        debug!(
            entity = self.config().entity_name(),
            first = ?first.id(),
            second = ?second.id(),
            "swapped siblings"
        );
        Ok(())
    }

    /// Delete `model` and all of its descendants, deepest first.
    ///
    /// Every row goes through its active model, so delete hooks of the
    /// entity run once per removed node. Returns the number of removed rows.
    pub async fn delete(
        &self,
        txn: &ForestTransaction<M>,
        model: &M,
    ) -> Result<u64, NestedSetError> {
        let target = model.id();
        let mut removed = 0;
        loop {
            let current = self.reload(txn, &target).await?;
            let bounds = current.bounds();
            let leaf = if bounds.is_leaf() {
                current
            } else {
                let predicate = Predicate::descendants_of(&bounds).and(Predicate::leaf());
                Self::matching(txn.group(), &predicate)
                    .order_by_asc(M::left_column())
                    .one(txn.connection())
                    .await?
                    .ok_or_else(|| {
                        NestedSetError::invariant(format!(
                            "node {target:?} spans ({}, {}) but has no leaf below it",
                            bounds.left, bounds.right
                        ))
                    })?
            };

            let last = leaf.id() == target;
            self.remove_leaf(txn, leaf).await?;
            removed += 1;
            if last {
                break;
            }
        }
        debug!(
            entity = self.config().entity_name(),
            id = ?target,
            removed,
            "deleted subtree"
        );
        Ok(removed)
    }

    async fn remove_leaf(&self, txn: &ForestTransaction<M>, leaf: M) -> Result<(), NestedSetError> {
        let shifts = plan::remove_leaf(leaf.bounds())?;
        self.run(txn, &shifts).await?;
        leaf.into_active_model().delete(txn.connection()).await?;
        Ok(())
    }

    /// Renumber a damaged forest as a root with every other node as its direct child.
    ///
    /// Rows are taken in `level`, then `left`, then id order: the first becomes
    /// the root `(1, 2N, 0)` and the rest get `(2, 3)`, `(4, 5)`, ... at level 1.
    /// Any deeper structure is discarded; this is a last-resort repair, never
    /// run automatically. Returns the number of renumbered rows.
    pub async fn reset_tree(&self, txn: &ForestTransaction<M>) -> Result<u64, NestedSetError> {
        let conn = txn.connection();
        let group = txn.group();
        let rows = Self::scoped(group)
            .order_by_asc(M::level_column())
            .order_by_asc(M::left_column())
            .order_by_asc(M::id_column())
            .all(conn)
            .await?;
        let layout = plan::flatten(rows.len())?;

        warn!(
            entity = self.config().entity_name(),
            ?group,
            nodes = rows.len(),
            "flattening forest"
        );
        for (row, bounds) in rows.iter().zip(layout) {
            M::Entity::update_many()
                .col_expr(M::left_column(), Expr::value(bounds.left))
                .col_expr(M::right_column(), Expr::value(bounds.right))
                .col_expr(M::level_column(), Expr::value(bounds.level))
                .filter(M::group_condition(group))
                .filter(M::id_column().eq(M::id_to_value(&row.id())))
                .exec(conn)
                .await?;
        }
        Ok(rows.len() as u64)
    }

    async fn run(&self, txn: &ForestTransaction<M>, shifts: &[Shift]) -> Result<(), NestedSetError> {
        for shift in shifts {
            Self::apply_shift(txn.connection(), txn.group(), shift).await?;
        }
        Ok(())
    }

    async fn apply_shift(
        conn: &DatabaseTransaction,
        group: &M::Group,
        shift: &Shift,
    ) -> Result<u64, NestedSetError> {
        if shift.is_noop() {
            return Ok(0);
        }
        let mut update = M::Entity::update_many();
        if shift.left != 0 {
            update = update.col_expr(
                M::left_column(),
                Expr::col(M::left_column()).add(shift.left),
            );
        }
        if shift.right != 0 {
            update = update.col_expr(
                M::right_column(),
                Expr::col(M::right_column()).add(shift.right),
            );
        }
        if shift.level != 0 {
            update = update.col_expr(
                M::level_column(),
                Expr::col(M::level_column()).add(shift.level),
            );
        }
        let result = update
            .filter(M::group_condition(group))
            .filter(shift.filter.condition::<M>())
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }
}
