//! Document store for nonlocal game records.
//!
//! Records are plain JSON objects grouped in named tables. The store assigns
//! each inserted document an integer id, supports equality search over
//! dotted field paths, and merges partial updates into documents by id. It
//! does not enforce references between tables.
//!
//! Two implementations are provided:
//!
//! - [`JsonDocumentStore`]: one JSON file holding every table
//! - [`MemoryStore`]: volatile, for tests

mod error;
mod json_store;
mod memory;
mod query;
pub mod records;
mod tables;

pub use error::{StoreError, StoreResult};
pub use json_store::JsonDocumentStore;
pub use memory::MemoryStore;
pub use query::{Field, Query};

use async_trait::async_trait;
use serde_json::Value;

/// Table-style document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and return its id.
    async fn insert(&self, table: &str, doc: Value) -> StoreResult<u64>;

    /// Documents matching `query`, in id order.
    async fn search(&self, table: &str, query: &Query) -> StoreResult<Vec<(u64, Value)>>;

    /// Merge the top-level keys of `partial` into each document in `ids`.
    async fn update(&self, table: &str, partial: Value, ids: &[u64]) -> StoreResult<()>;

    /// Every document of a table, in id order.
    async fn all(&self, table: &str) -> StoreResult<Vec<(u64, Value)>>;
}
