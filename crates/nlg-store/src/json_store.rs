//! JSON file-backed document store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::tables::Tables;
use crate::DocumentStore;

/// Document store persisted to a single JSON file.
///
/// The file holds every table as `{"table": {"<id>": {...}}}` with sorted
/// keys and four-space indentation. The whole file is rewritten after each
/// mutation while the write lock is held, so writers are serialised.
pub struct JsonDocumentStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl JsonDocumentStore {
    /// Open the database at `path`, creating an empty one if it is missing.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let tables = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Tables::default(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Creating new database file");
                Tables::default()
            }
            Err(e) => return Err(StoreError::IoError(e)),
        };

        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tables: &Tables) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        tables.to_sorted().serialize(&mut ser)?;

        fs::write(&self.path, buf).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn insert(&self, table: &str, doc: Value) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let id = tables.insert(table, doc)?;
        self.persist(&tables).await?;
        Ok(id)
    }

    async fn search(&self, table: &str, query: &Query) -> StoreResult<Vec<(u64, Value)>> {
        Ok(self.tables.read().await.search(table, query))
    }

    async fn update(&self, table: &str, partial: Value, ids: &[u64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.update(table, &partial, ids)?;
        self.persist(&tables).await
    }

    async fn all(&self, table: &str) -> StoreResult<Vec<(u64, Value)>> {
        Ok(self.tables.read().await.all(table))
    }
}
