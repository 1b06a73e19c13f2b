//! In-memory document store.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::query::Query;
use crate::tables::Tables;
use crate::DocumentStore;

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, table: &str, doc: Value) -> StoreResult<u64> {
        self.tables.write().await.insert(table, doc)
    }

    async fn search(&self, table: &str, query: &Query) -> StoreResult<Vec<(u64, Value)>> {
        Ok(self.tables.read().await.search(table, query))
    }

    async fn update(&self, table: &str, partial: Value, ids: &[u64]) -> StoreResult<()> {
        self.tables.write().await.update(table, &partial, ids)
    }

    async fn all(&self, table: &str) -> StoreResult<Vec<(u64, Value)>> {
        Ok(self.tables.read().await.all(table))
    }
}
