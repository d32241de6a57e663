use thiserror::Error;

/// Errors returned by the nested-set APIs.
#[derive(Debug, Error)]
pub enum NestedSetError {
    #[error("nested-set currently supports PostgreSQL and SQLite connections only")]
    UnsupportedBackend,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("failed to encode forest group: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("node {0} does not exist in this forest")]
    NodeNotFound(String),

    #[error("parent node {0} does not exist in this forest")]
    ParentNotFound(String),

    #[error("forest has no root and automatic root creation is disabled")]
    MissingRoot,

    #[error("forest already has a root node")]
    RootExists,

    #[error("the root node of a forest cannot be moved")]
    RootImmovable,

    #[error("cannot move a node under itself or one of its descendants")]
    Cycle,

    #[error("nested-set invariant violation: {0}")]
    Invariant(String),
}

/// Coarse classification of [`NestedSetError`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The request cannot start: bad backend, missing root or unknown node.
    Configuration,
    /// The request would break (or found broken) the interval invariants.
    Invariant,
    /// The backing store failed; the whole operation must be rolled back.
    Storage,
}

impl NestedSetError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant(detail.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedBackend
            | Self::NodeNotFound(_)
            | Self::ParentNotFound(_)
            | Self::MissingRoot
            | Self::RootExists => ErrorKind::Configuration,
            Self::RootImmovable | Self::Cycle | Self::Invariant(_) => ErrorKind::Invariant,
            Self::Database(_) | Self::Sqlx(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }
}
