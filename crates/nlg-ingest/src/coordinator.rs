//! Runs the adapters and persists their records.
//!
//! Adapters run concurrently as tasks on the runtime. Their results are
//! consumed in completion order; the records of one adapter are persisted
//! one at a time in the order the adapter returned them. The coordinator is
//! the only writer to the store.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use nlg_core::{Adapter, Experiment, IngestError, IngestResult, RawHistogram, RelPath};
use nlg_store::records::{EXPERIMENTS, GAMES};
use nlg_store::{DocumentStore, Query};
use serde_json::json;
use tracing::{debug, info};

/// Folder under the data folder receiving histogram artifacts.
pub const ARTIFACT_DIR: &str = "experiments";

/// Counts reported after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub experiments: usize,
    pub histograms: usize,
    /// Experiments inserted per adapter name.
    pub per_adapter: BTreeMap<String, usize>,
}

pub struct Coordinator {
    store: Arc<dyn DocumentStore>,
    data_folder: PathBuf,
    known_games: HashSet<String>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn DocumentStore>, data_folder: impl Into<PathBuf>) -> Self {
        Self {
            store,
            data_folder: data_folder.into(),
            known_games: HashSet::new(),
        }
    }

    /// Ingest every adapter's records.
    ///
    /// The first adapter failure aborts the run; records already persisted
    /// stay in the store.
    pub async fn run<A>(&mut self, adapters: Vec<A>) -> IngestResult<IngestSummary>
    where
        A: Adapter + 'static,
    {
        let mut pending: FuturesUnordered<_> = adapters
            .into_iter()
            .map(|adapter| {
                tokio::spawn(async move {
                    let name = adapter.name().to_string();
                    let result = adapter.ingest().await;
                    (name, result)
                })
            })
            .collect();

        let mut summary = IngestSummary::default();
        while let Some(joined) = pending.next().await {
            let (name, result) =
                joined.map_err(|e| IngestError::Task(format!("adapter task failed: {e}")))?;
            let records = result?;
            info!(adapter = %name, records = records.len(), "Adapter finished");

            let mut inserted = 0;
            for (experiment, histogram) in records {
                let has_histogram = histogram.is_some();
                self.add_experiment(experiment, histogram.as_ref()).await?;
                inserted += 1;
                if has_histogram {
                    summary.histograms += 1;
                }
            }
            summary.experiments += inserted;
            *summary.per_adapter.entry(name).or_default() += inserted;
        }

        info!(
            experiments = summary.experiments,
            histograms = summary.histograms,
            "Ingestion complete"
        );
        Ok(summary)
    }

    /// Persist one experiment and, when present, its histogram.
    ///
    /// The experiment is inserted with `has_counts` set. A histogram is
    /// written to `experiments/result_<id>.json` and the stored
    /// `circuit_data.result_path` is patched to point at it.
    pub async fn add_experiment(
        &mut self,
        mut experiment: Experiment,
        histogram: Option<&RawHistogram>,
    ) -> IngestResult<u64> {
        self.check_game(&experiment).await?;

        experiment.set_attribute("has_counts", histogram.is_some());
        let id = self
            .store
            .insert(EXPERIMENTS, serde_json::to_value(&experiment)?)
            .await?;

        if let Some(histogram) = histogram {
            let relative = format!("{ARTIFACT_DIR}/result_{id}.json");
            let path = self.data_folder.join(&relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, serde_json::to_vec(histogram)?).await?;

            experiment.circuit_data.result_path = RelPath::new(&relative);
            let patch = json!({ "circuit_data": serde_json::to_value(&experiment.circuit_data)? });
            self.store.update(EXPERIMENTS, patch, &[id]).await?;
            debug!(id, path = %relative, circuits = histogram.len(), "Wrote histogram");
        }

        Ok(id)
    }

    /// The experiment's game must resolve to exactly one stored game.
    async fn check_game(&mut self, experiment: &Experiment) -> IngestResult<()> {
        let key = experiment.game_id.to_string();
        if self.known_games.contains(&key) {
            return Ok(());
        }
        let matches = self
            .store
            .search(GAMES, &Query::field("id").eq(key.as_str()))
            .await?;
        if matches.len() != 1 {
            return Err(IngestError::GameLookup {
                name: key,
                matches: matches.len(),
            });
        }
        self.known_games.insert(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use nlg_core::{CircuitData, CircuitResult, Counts, Device, NonlocalGame, Outcome, Winrate};
    use nlg_store::MemoryStore;
    use nlg_store::records::{insert_game, list_experiments};

    struct FixedAdapter {
        name: &'static str,
        records: Vec<(Experiment, Option<RawHistogram>)>,
    }

    #[async_trait]
    impl Adapter for FixedAdapter {
        fn name(&self) -> &str {
            self.name
        }

        async fn ingest(&self) -> IngestResult<Vec<nlg_core::IngestRecord>> {
            if self.name == "broken" {
                return Err(IngestError::InconsistentShots {
                    run: "run-1".into(),
                    shots: vec![999, 1000],
                });
            }
            Ok(self.records.clone())
        }
    }

    fn experiment(game: &NonlocalGame, strategy: &str) -> Experiment {
        let date = chrono::Utc.with_ymd_and_hms(2024, 10, 9, 0, 0, 0).unwrap();
        let circuit_data = CircuitData {
            strategy: strategy.into(),
            shots: 2000,
            num_circuits: 2,
            qasm_path: RelPath::new("raw_data/duke_collab/circuits"),
            result_path: RelPath::new("raw_data/duke_collab/Blue data.txt"),
        };
        let win_rate = Winrate::from_circuit_winrates(game, &[0.95, 0.80], 2000).unwrap();
        Experiment::new(game, date, Device::trapped_ion("duke", "blue"), win_rate, circuit_data)
    }

    fn histogram() -> RawHistogram {
        let mut counts = Counts::new();
        counts.insert(Outcome(0, 0), 1900);
        counts.insert(Outcome(1, 2), 100);
        [
            CircuitResult::new(0, 0, 0.95).with_counts(counts),
            CircuitResult::new(0, 1, 0.80),
        ]
        .into_iter()
        .collect()
    }

    async fn setup() -> (tempfile::TempDir, Arc<MemoryStore>, NonlocalGame) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let game = NonlocalGame::new("G14", 86.0 / 88.0, 1.0);
        insert_game(store.as_ref(), &game).await.unwrap();
        (dir, store, game)
    }

    #[tokio::test]
    async fn test_add_experiment_writes_histogram_and_patches_path() {
        let (dir, store, game) = setup().await;
        let mut coordinator = Coordinator::new(store.clone(), dir.path());

        let id = coordinator
            .add_experiment(experiment(&game, "bell_pair"), Some(&histogram()))
            .await
            .unwrap();

        let artifact = dir.path().join("experiments").join(format!("result_{id}.json"));
        let written: RawHistogram =
            serde_json::from_slice(&std::fs::read(&artifact).unwrap()).unwrap();
        assert_eq!(written, histogram());

        let (_, stored) = list_experiments(store.as_ref()).await.unwrap().remove(0);
        assert_eq!(
            stored.circuit_data.result_path.as_str(),
            format!("experiments/result_{id}.json")
        );
        assert_eq!(stored.circuit_data.strategy, "bell_pair");
        assert_eq!(
            stored.attributes.get("has_counts"),
            Some(&nlg_core::AttributeValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_add_experiment_without_histogram() {
        let (dir, store, game) = setup().await;
        let mut coordinator = Coordinator::new(store.clone(), dir.path());

        coordinator.add_experiment(experiment(&game, "4q"), None).await.unwrap();

        let (_, stored) = list_experiments(store.as_ref()).await.unwrap().remove(0);
        assert_eq!(stored.circuit_data.result_path.as_str(), "raw_data/duke_collab/Blue data.txt");
        assert_eq!(
            stored.attributes.get("has_counts"),
            Some(&nlg_core::AttributeValue::Bool(false))
        );
        assert!(!dir.path().join("experiments").exists());
    }

    #[tokio::test]
    async fn test_unknown_game_is_rejected() {
        let (dir, store, _) = setup().await;
        let mut coordinator = Coordinator::new(store.clone(), dir.path());
        let stranger = NonlocalGame::new("CHSH", 0.75, 0.85);

        let err = coordinator
            .add_experiment(experiment(&stranger, "4q"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::GameLookup { matches: 0, .. }));
        assert!(list_experiments(store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_persists_every_adapter() {
        let (dir, store, game) = setup().await;
        let mut coordinator = Coordinator::new(store.clone(), dir.path());

        let adapters = vec![
            FixedAdapter {
                name: "first",
                records: vec![
                    (experiment(&game, "a"), Some(histogram())),
                    (experiment(&game, "b"), None),
                ],
            },
            FixedAdapter {
                name: "second",
                records: vec![(experiment(&game, "c"), None)],
            },
            FixedAdapter {
                name: "empty",
                records: Vec::new(),
            },
        ];
        let summary = coordinator.run(adapters).await.unwrap();

        assert_eq!(summary.experiments, 3);
        assert_eq!(summary.histograms, 1);
        assert_eq!(summary.per_adapter["first"], 2);
        assert_eq!(summary.per_adapter["second"], 1);
        assert_eq!(summary.per_adapter["empty"], 0);

        let strategies: Vec<_> = list_experiments(store.as_ref())
            .await
            .unwrap()
            .into_iter()
            .map(|(_, e)| e.circuit_data.strategy)
            .collect();
        let a = strategies.iter().position(|s| s == "a").unwrap();
        let b = strategies.iter().position(|s| s == "b").unwrap();
        assert!(a < b);
    }

    #[tokio::test]
    async fn test_run_propagates_adapter_failure() {
        let (dir, store, _) = setup().await;
        let mut coordinator = Coordinator::new(store, dir.path());

        let adapters = vec![FixedAdapter {
            name: "broken",
            records: Vec::new(),
        }];
        let err = coordinator.run(adapters).await.unwrap_err();
        assert!(matches!(err, IngestError::InconsistentShots { .. }));
    }
}
