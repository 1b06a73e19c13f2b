//! Shared helpers for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use nlg_ingest::Config;
use nlg_store::JsonDocumentStore;

/// Open the configured database file.
pub async fn open_store(config: &Config) -> Result<Arc<JsonDocumentStore>> {
    let path = config.db_path();
    let store = JsonDocumentStore::open(&path)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(store))
}
