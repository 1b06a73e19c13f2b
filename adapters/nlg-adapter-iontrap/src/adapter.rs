//! Trapped-ion adapter.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use nlg_core::{Adapter, IngestRecord, IngestResult, NonlocalGame, run_blocking};
use tracing::info;

use crate::mapping::CircuitMapping;
use crate::sources::{CIRCUITS, Source};

/// Reads the Duke collaboration exports and the IonQ win rates.
pub struct IonTrapAdapter {
    game: NonlocalGame,
    data_folder: PathBuf,
}

impl IonTrapAdapter {
    pub fn new(game: NonlocalGame, data_folder: impl Into<PathBuf>) -> Self {
        Self {
            game,
            data_folder: data_folder.into(),
        }
    }
}

#[async_trait]
impl Adapter for IonTrapAdapter {
    fn name(&self) -> &str {
        "iontrap"
    }

    async fn ingest(&self) -> IngestResult<Vec<IngestRecord>> {
        let circuit_dir = self.data_folder.join(CIRCUITS);
        let mapping = run_blocking(move || Ok(CircuitMapping::load(&circuit_dir)?)).await?;
        let mapping = Arc::new(mapping);

        let tasks = Source::ALL.into_iter().map(|source| {
            let game = self.game.clone();
            let data_folder = self.data_folder.clone();
            let mapping = Arc::clone(&mapping);
            run_blocking(move || source.load(&game, &data_folder, &mapping))
        });

        let records = try_join_all(tasks).await?;
        info!(adapter = self.name(), experiments = records.len(), "Ingested trapped-ion data");
        Ok(records)
    }
}
