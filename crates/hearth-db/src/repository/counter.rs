//! # Counter Repository
//!
//! Named integer counters. Order numbers come from the `order_counter` row.
//!
//! ## Atomic Increment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO counters (key, value) VALUES (?1, ?2)                      │
//! │  ON CONFLICT (key) DO UPDATE                                            │
//! │      SET value = MAX(counters.value + 1, excluded.value)                │
//! │  RETURNING value                                                        │
//! │                                                                         │
//! │  One statement: SQLite's write lock makes read-add-write indivisible,   │
//! │  so two callers can never be handed the same value.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use hearth_schedule::{CounterStore, StoreResult};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for named counters.
#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: SqlitePool,
}

impl CounterRepository {
    /// Creates a new CounterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CounterRepository { pool }
    }

    /// Increments `key`, creating it at `floor` if missing.
    pub async fn increment(&self, key: &str, floor: i64) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counters (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE
                SET value = MAX(counters.value + 1, excluded.value)
            RETURNING value
            "#,
        )
        .bind(key)
        .bind(floor)
        .fetch_one(&self.pool)
        .await?;

        debug!(key, value, "Counter incremented");
        Ok(value)
    }

    /// Raises `key` to at least `value`.
    pub async fn raise(&self, key: &str, value: i64) -> DbResult<i64> {
        let stored: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counters (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE
                SET value = MAX(counters.value, excluded.value)
            RETURNING value
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<i64>> {
        let value = sqlx::query_scalar("SELECT value FROM counters WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }
}

#[async_trait]
impl CounterStore for CounterRepository {
    async fn atomic_increment(&self, key: &str, floor: i64) -> StoreResult<i64> {
        Ok(self.increment(key, floor).await?)
    }

    async fn raise_to(&self, key: &str, value: i64) -> StoreResult<i64> {
        Ok(self.raise(key, value).await?)
    }

    async fn current(&self, key: &str) -> StoreResult<Option<i64>> {
        Ok(self.get(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_increment_starts_at_floor() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counters = db.counters();

        assert_eq!(counters.get("order_counter").await.unwrap(), None);
        assert_eq!(counters.increment("order_counter", 101).await.unwrap(), 101);
        assert_eq!(counters.increment("order_counter", 101).await.unwrap(), 102);
        assert_eq!(counters.get("order_counter").await.unwrap(), Some(102));
    }

    #[tokio::test]
    async fn test_counter_below_floor_jumps() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counters = db.counters();

        counters.raise("order_counter", 5).await.unwrap();
        assert_eq!(counters.increment("order_counter", 101).await.unwrap(), 101);
    }

    #[tokio::test]
    async fn test_raise_never_lowers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counters = db.counters();

        assert_eq!(counters.raise("k", 100).await.unwrap(), 100);
        assert_eq!(counters.raise("k", 40).await.unwrap(), 100);
        assert_eq!(counters.increment("k", 1).await.unwrap(), 101);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_distinct() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counters = Arc::new(db.counters());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let counters = counters.clone();
                tokio::spawn(async move { counters.increment("order_counter", 101).await })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap().unwrap()));
        }
        assert_eq!(seen.len(), 32);
        assert_eq!(seen.iter().min(), Some(&101));
        assert_eq!(seen.iter().max(), Some(&132));
    }
}
