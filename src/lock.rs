use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbBackend, Statement, TransactionTrait, Value,
};
use tracing::debug;

use crate::config::AdvisoryLockStrategy;
use crate::error::NestedSetError;
use crate::traits::NestedSetModel;

/// Transaction bound to one forest of `M`.
///
/// Every structural mutation takes a reference to this type, so writes always
/// happen inside a transaction and are scoped to the forest's group. On
/// PostgreSQL a transaction-level advisory lock keyed by the forest is held
/// until commit or rollback. Dropping the value without committing rolls the
/// transaction back.
pub struct ForestTransaction<M>
where
    M: NestedSetModel,
{
    txn: DatabaseTransaction,
    group: M::Group,
}

impl<M> ForestTransaction<M>
where
    M: NestedSetModel,
{
    /// Begin a transaction (a savepoint when `db` is already a transaction)
    /// and lock the forest identified by `group`.
    pub async fn begin<C>(db: &C, group: M::Group) -> Result<Self, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let backend = db.get_database_backend();
        if !matches!(backend, DbBackend::Postgres | DbBackend::Sqlite) {
            return Err(NestedSetError::UnsupportedBackend);
        }

        let key = match M::nested_set_config().advisory_lock_strategy() {
            AdvisoryLockStrategy::Namespaced(key) if backend == DbBackend::Postgres => {
                Some(key.for_forest(&group)?)
            }
            _ => None,
        };

        let txn = db.begin().await?;

        if let Some(ref key) = key {
            if let Err(err) = acquire_lock(&txn, key).await {
                let _ = txn.rollback().await;
                return Err(err);
            }
            debug!(key = key.as_str(), "acquired forest lock");
        }

        Ok(Self { txn, group })
    }

    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Group values of the locked forest.
    pub fn group(&self) -> &M::Group {
        &self.group
    }

    pub async fn commit(self) -> Result<(), NestedSetError> {
        self.txn.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), NestedSetError> {
        self.txn.rollback().await?;
        Ok(())
    }
}

async fn acquire_lock(txn: &DatabaseTransaction, key: &str) -> Result<(), NestedSetError> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1))",
        vec![Value::from(key)],
    ))
    .await?;
    Ok(())
}
