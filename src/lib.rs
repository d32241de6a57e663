//! SeaORM-centric nested set implementation.
//!
//! Each node stores an interval (`left`, `right`) and a `level`; a node is an
//! ancestor of another exactly when its interval strictly contains the other's.
//! Ancestry, descent and sibling order are answered with range comparisons,
//! and structural changes are carried out as ordered sequences of range-scoped
//! `UPDATE`s inside one transaction. One table may hold several independent
//! forests, told apart by a tuple of group columns.
//!
//! PostgreSQL and SQLite connections are supported. On PostgreSQL every
//! structural mutation holds an advisory lock on its forest.

pub mod axis;
pub mod config;
pub mod error;
pub mod integrity;
pub mod lock;
pub mod node;
pub mod plan;
pub mod repository;
pub mod traits;

pub mod prelude {
    //! Convenient re-exports for consumers.
    pub use crate::axis::Axis;
    pub use crate::config::{AdvisoryLockStrategy, NestedSetConfig, NestedSetOptions};
    pub use crate::error::{ErrorKind, NestedSetError};
    pub use crate::lock::ForestTransaction;
    pub use crate::node::{Bounds, ParentRef};
    pub use crate::repository::NestedSetRepository;
    pub use crate::traits::NestedSetModel;
}

pub use axis::{Axis, Predicate};
pub use config::{AdvisoryLockKey, AdvisoryLockStrategy, NestedSetConfig, NestedSetOptions};
pub use error::{ErrorKind, NestedSetError};
pub use integrity::{IntegrityReport, Violation};
pub use lock::ForestTransaction;
pub use nested_set_macros::NestedSetModel as NestedSetModelDerive;
#[doc(hidden)]
pub use nested_set_macros::NestedSetModel;
pub use node::{Bounds, ParentRef};
pub use repository::NestedSetRepository;
pub use traits::NestedSetModel;
