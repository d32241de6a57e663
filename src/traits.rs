use std::fmt::Debug;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, EntityTrait, FromQueryResult,
    IntoActiveModel, Value,
};
use serde::Serialize;

use crate::config::NestedSetConfig;
use crate::node::Bounds;

/// Trait implemented by SeaORM `Model` types stored as nested sets.
///
/// Implementations are normally provided by the `#[derive(NestedSetModel)]` macro.
/// `Group` is the tuple of forest-scoping column values, `()` when the table
/// holds a single forest.
pub trait NestedSetModel:
    Clone + Send + Sync + 'static + IntoActiveModel<Self::ActiveModel> + FromQueryResult
{
    type Entity: EntityTrait<Model = Self>;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send;
    type Id: Clone + Debug + PartialEq + Send + Sync + 'static;
    type Group: Clone + Debug + PartialEq + Serialize + Send + Sync + 'static;

    fn nested_set_config() -> &'static NestedSetConfig;

    fn id(&self) -> Self::Id;
    fn id_to_value(id: &Self::Id) -> Value;

    fn bounds(&self) -> Bounds;
    fn set_bounds(active: &mut Self::ActiveModel, bounds: Bounds);

    fn group(&self) -> Self::Group;
    fn set_group(active: &mut Self::ActiveModel, group: &Self::Group);
    /// Equality match on every group column.
    fn group_condition(group: &Self::Group) -> Condition;

    /// Fill payload columns of an automatically created root.
    fn prepare_root(active: &mut Self::ActiveModel);

    fn id_column() -> <Self::Entity as EntityTrait>::Column;
    fn left_column() -> <Self::Entity as EntityTrait>::Column;
    fn right_column() -> <Self::Entity as EntityTrait>::Column;
    fn level_column() -> <Self::Entity as EntityTrait>::Column;
}
