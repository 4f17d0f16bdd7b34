//! Concurrent row storage with per-row locking.
//!
//! [`Table`] stores rows in a `HashMap` where each row is individually
//! protected by a [`tokio::sync::RwLock`]. Reads of one row run
//! concurrently, writes to different rows run concurrently, and writes to
//! the same row are serialized.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::MarketError;

/// Shared handle to one locked row.
pub type Row<V> = Arc<RwLock<V>>;

/// Keyed table of individually locked rows.
///
/// The outer lock is held only long enough to find or insert a row handle;
/// it is never held across a row lock acquisition.
#[derive(Debug)]
pub struct Table<K, V> {
    entity: &'static str,
    rows: RwLock<HashMap<K, Row<V>>>,
}

impl<K, V> Table<K, V>
where
    K: Copy + Eq + Hash + Into<uuid::Uuid>,
{
    /// Creates an empty table whose lookups report `entity` when missing.
    #[must_use]
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a new row.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Conflict`] if the key is taken (should never
    /// happen with UUID v4 keys).
    pub async fn insert(&self, key: K, value: V) -> Result<Row<V>, MarketError> {
        let mut map = self.rows.write().await;
        if map.contains_key(&key) {
            let id: uuid::Uuid = key.into();
            return Err(MarketError::Conflict(format!(
                "{} {id} already exists",
                self.entity
            )));
        }
        let row = Arc::new(RwLock::new(value));
        map.insert(key, Arc::clone(&row));
        Ok(row)
    }

    /// Returns the row handle for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if no such row exists.
    pub async fn get(&self, key: K) -> Result<Row<V>, MarketError> {
        let map = self.rows.read().await;
        map.get(&key)
            .cloned()
            .ok_or_else(|| MarketError::not_found(self.entity, key))
    }

    /// Returns handles to every row, in no particular order.
    pub async fn rows(&self) -> Vec<Row<V>> {
        self.rows.read().await.values().cloned().collect()
    }

    /// Returns the number of rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` if the table has no rows.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

impl<K, V> Table<K, V>
where
    K: Copy + Eq + Hash + Into<uuid::Uuid>,
    V: Clone,
{
    /// Returns a copy of the row taken under its read lock.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if no such row exists.
    pub async fn snapshot(&self, key: K) -> Result<V, MarketError> {
        let row = self.get(key).await?;
        let value = row.read().await.clone();
        Ok(value)
    }

    /// Returns copies of every row matching `keep`.
    pub async fn collect<F>(&self, mut keep: F) -> Vec<V>
    where
        F: FnMut(&V) -> bool,
    {
        let mut out = Vec::new();
        for row in self.rows().await {
            let value = row.read().await;
            if keep(&value) {
                out.push(value.clone());
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ListingId;

    #[tokio::test]
    async fn insert_then_get() {
        let table: Table<ListingId, u32> = Table::new("listing");
        let id = ListingId::new();
        let Ok(_) = table.insert(id, 7).await else {
            panic!("insert should succeed");
        };
        let Ok(value) = table.snapshot(id).await else {
            panic!("row should exist");
        };
        assert_eq!(value, 7);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_key_conflicts() {
        let table: Table<ListingId, u32> = Table::new("listing");
        let id = ListingId::new();
        let _ = table.insert(id, 1).await;
        assert!(matches!(
            table.insert(id, 2).await,
            Err(MarketError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let table: Table<ListingId, u32> = Table::new("listing");
        assert!(table.is_empty().await);
        assert!(matches!(
            table.get(ListingId::new()).await,
            Err(MarketError::NotFound { entity: "listing", .. })
        ));
    }

    #[tokio::test]
    async fn row_writes_are_visible_through_other_handles() {
        let table: Table<ListingId, u32> = Table::new("listing");
        let id = ListingId::new();
        let Ok(row) = table.insert(id, 0).await else {
            panic!("insert should succeed");
        };
        *row.write().await += 5;
        assert_eq!(table.collect(|v| *v > 1).await, vec![5]);
    }
}
