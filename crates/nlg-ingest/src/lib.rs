//! Ingestion of vendor data into the nonlocal game record store.
//!
//! [`ingest`] looks up the G14 game, builds the adapters enabled in the
//! [`Config`], and hands them to the [`Coordinator`], which persists every
//! record they return.

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod vendor;

use std::sync::Arc;

use nlg_core::IngestResult;
use nlg_store::DocumentStore;
use nlg_store::records::find_game_by_name;
use tracing::info;

pub use catalog::{G14, ensure_default_games};
pub use config::{AdapterKind, Config, ConfigError};
pub use coordinator::{Coordinator, IngestSummary};
pub use vendor::{VendorAdapter, build_adapters};

/// Run every enabled adapter for the G14 game and persist the results.
pub async fn ingest(config: &Config, store: Arc<dyn DocumentStore>) -> IngestResult<IngestSummary> {
    let game = find_game_by_name(store.as_ref(), G14).await?;
    let adapters = build_adapters(config, &game)?;
    info!(
        game = %game.name,
        adapters = adapters.len(),
        data_folder = %config.data_folder.display(),
        "Starting ingestion"
    );

    let mut coordinator = Coordinator::new(store, &config.data_folder);
    coordinator.run(adapters).await
}
