use crate::error::Result;
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    Serializable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

fn set_transaction_statement(isolation: IsolationLevel, access: AccessMode) -> &'static str {
    match (isolation, access) {
        (IsolationLevel::ReadCommitted, AccessMode::ReadWrite) => {
            "SET TRANSACTION ISOLATION LEVEL READ COMMITTED READ WRITE"
        }
        (IsolationLevel::ReadCommitted, AccessMode::ReadOnly) => {
            "SET TRANSACTION ISOLATION LEVEL READ COMMITTED READ ONLY"
        }
        (IsolationLevel::Serializable, AccessMode::ReadWrite) => {
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ WRITE"
        }
        (IsolationLevel::Serializable, AccessMode::ReadOnly) => {
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ ONLY"
        }
    }
}

/// Opens transactions with an explicit isolation level and access mode.
///
/// The returned transaction rolls back when dropped; callers commit only once every step of the
/// operation has succeeded, so any `?` on the way out discards the whole unit.
#[derive(Debug, Clone)]
pub struct TxManager {
    pool: PgPool,
}

impl TxManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(
        &self,
        isolation: IsolationLevel,
        access: AccessMode,
    ) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(set_transaction_statement(isolation, access))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    pub async fn serializable(&self) -> Result<Transaction<'static, Postgres>> {
        self.begin(IsolationLevel::Serializable, AccessMode::ReadWrite)
            .await
    }

    pub async fn read_committed(&self) -> Result<Transaction<'static, Postgres>> {
        self.begin(IsolationLevel::ReadCommitted, AccessMode::ReadWrite)
            .await
    }

    pub async fn read_only_committed(&self) -> Result<Transaction<'static, Postgres>> {
        self.begin(IsolationLevel::ReadCommitted, AccessMode::ReadOnly)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_per_level() {
        assert_eq!(
            set_transaction_statement(IsolationLevel::Serializable, AccessMode::ReadWrite),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ WRITE"
        );
        assert!(
            set_transaction_statement(IsolationLevel::ReadCommitted, AccessMode::ReadOnly)
                .ends_with("READ COMMITTED READ ONLY")
        );
    }
}
