use crc32fast::Hasher;
use serde::Serialize;

use crate::error::NestedSetError;

/// Static configuration describing how a SeaORM model stores its nested sets.
#[derive(Clone, Debug)]
pub struct NestedSetConfig {
    entity_name: String,
    left_column: String,
    right_column: String,
    level_column: String,
    group_columns: Vec<String>,
    auto_create_root: bool,
    advisory_lock_strategy: AdvisoryLockStrategy,
}

impl NestedSetConfig {
    /// Create a new configuration for the logical entity name.
    pub fn new(entity_name: impl Into<String>) -> Self {
        let entity_name = entity_name.into();
        let default_lock =
            AdvisoryLockStrategy::Namespaced(AdvisoryLockKey::derived_from(&entity_name));

        Self {
            entity_name,
            left_column: "lft".to_string(),
            right_column: "rgt".to_string(),
            level_column: "level".to_string(),
            group_columns: Vec::new(),
            auto_create_root: true,
            advisory_lock_strategy: default_lock,
        }
    }

    /// Merge options produced by [`NestedSetOptions`].
    pub(crate) fn apply_options(mut self, options: NestedSetOptions) -> Self {
        if let Some(left_column) = options.left_column {
            self.left_column = left_column;
        }
        if let Some(right_column) = options.right_column {
            self.right_column = right_column;
        }
        if let Some(level_column) = options.level_column {
            self.level_column = level_column;
        }
        if let Some(group_columns) = options.group_columns {
            self.group_columns = group_columns;
        }
        if let Some(auto_create_root) = options.auto_create_root {
            self.auto_create_root = auto_create_root;
        }
        if let Some(strategy) = options.advisory_lock_strategy {
            self.advisory_lock_strategy = strategy;
        }
        self
    }

    /// Human-readable Rust struct name for the entity.
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn left_column(&self) -> &str {
        &self.left_column
    }

    pub fn right_column(&self) -> &str {
        &self.right_column
    }

    pub fn level_column(&self) -> &str {
        &self.level_column
    }

    /// Columns whose values together identify a forest. Empty for a single forest.
    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    /// Whether the first access to an empty forest creates its root.
    pub fn auto_create_root(&self) -> bool {
        self.auto_create_root
    }

    /// Advisory lock strategy (PostgreSQL only).
    pub fn advisory_lock_strategy(&self) -> &AdvisoryLockStrategy {
        &self.advisory_lock_strategy
    }
}

/// Builder-style options consumed by the derive macro.
#[derive(Clone, Debug, Default)]
pub struct NestedSetOptions {
    left_column: Option<String>,
    right_column: Option<String>,
    level_column: Option<String>,
    group_columns: Option<Vec<String>>,
    auto_create_root: Option<bool>,
    advisory_lock_strategy: Option<AdvisoryLockStrategy>,
}

impl NestedSetOptions {
    pub fn left_column(mut self, value: impl Into<String>) -> Self {
        self.left_column = Some(value.into());
        self
    }

    pub fn right_column(mut self, value: impl Into<String>) -> Self {
        self.right_column = Some(value.into());
        self
    }

    pub fn level_column(mut self, value: impl Into<String>) -> Self {
        self.level_column = Some(value.into());
        self
    }

    pub fn group_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn auto_create_root(mut self, enabled: bool) -> Self {
        self.auto_create_root = Some(enabled);
        self
    }

    pub fn advisory_lock_strategy(mut self, strategy: AdvisoryLockStrategy) -> Self {
        self.advisory_lock_strategy = Some(strategy);
        self
    }

    pub fn apply(self, base: NestedSetConfig) -> NestedSetConfig {
        base.apply_options(self)
    }
}

/// Key used for PostgreSQL advisory locks.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AdvisoryLockKey(String);

impl AdvisoryLockKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Narrow the key to one forest so unrelated forests never contend.
    pub fn for_forest<G: Serialize>(&self, group: &G) -> Result<String, NestedSetError> {
        let encoded = serde_json::to_string(group)?;
        let mut hasher = Hasher::new();
        hasher.update(encoded.as_bytes());
        Ok(format!("{}::{:x}", self.0, hasher.finalize()))
    }

    fn derived_from(entity: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(entity.as_bytes());
        let crc = hasher.finalize();
        Self(format!("nested-set::{entity}::{crc:x}"))
    }
}

/// Configuration describing how to acquire advisory locks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AdvisoryLockStrategy {
    Disabled,
    Namespaced(AdvisoryLockKey),
}

impl AdvisoryLockStrategy {
    pub fn key(&self) -> Option<&AdvisoryLockKey> {
        match self {
            AdvisoryLockStrategy::Disabled => None,
            AdvisoryLockStrategy::Namespaced(key) => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_override_defaults() {
        let config = NestedSetOptions::default()
            .left_column("lhs")
            .group_columns(["tenant_id", "menu"])
            .auto_create_root(false)
            .advisory_lock_strategy(AdvisoryLockStrategy::Disabled)
            .apply(NestedSetConfig::new("Category"));

        assert_eq!(config.left_column(), "lhs");
        assert_eq!(config.right_column(), "rgt");
        assert_eq!(config.group_columns(), ["tenant_id", "menu"]);
        assert!(!config.auto_create_root());
        assert!(config.advisory_lock_strategy().key().is_none());
    }

    #[test]
    fn forest_keys_differ_per_group() {
        let config = NestedSetConfig::new("Category");
        let key = config
            .advisory_lock_strategy()
            .key()
            .expect("namespaced by default");
        assert!(key.as_str().starts_with("nested-set::Category::"));

        let first = key.for_forest(&(1,)).unwrap();
        let second = key.for_forest(&(2,)).unwrap();
        assert_ne!(first, second);
        assert_eq!(first, key.for_forest(&(1,)).unwrap());
    }
}
