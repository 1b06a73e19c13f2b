//! Typed access to the `games` and `experiments` tables.

use nlg_core::{Experiment, IngestError, IngestResult, NonlocalGame};
use serde_json::Value;

use crate::DocumentStore;
use crate::query::Query;

/// Table holding [`NonlocalGame`] records.
pub const GAMES: &str = "games";
/// Table holding [`Experiment`] records.
pub const EXPERIMENTS: &str = "experiments";

/// Look up the single game called `name`.
///
/// Zero or several matches are a consistency error.
pub async fn find_game_by_name(
    store: &dyn DocumentStore,
    name: &str,
) -> IngestResult<NonlocalGame> {
    let mut matches = store.search(GAMES, &Query::field("name").eq(name)).await?;
    if matches.len() != 1 {
        return Err(IngestError::GameLookup {
            name: name.to_string(),
            matches: matches.len(),
        });
    }

    let (_, doc) = matches.remove(0);
    Ok(serde_json::from_value(doc)?)
}

/// Insert a game record, returning its document id.
pub async fn insert_game(store: &dyn DocumentStore, game: &NonlocalGame) -> IngestResult<u64> {
    let doc = serde_json::to_value(game)?;
    Ok(store.insert(GAMES, doc).await?)
}

/// All games with their document ids.
pub async fn list_games(store: &dyn DocumentStore) -> IngestResult<Vec<(u64, NonlocalGame)>> {
    decode_all(store.all(GAMES).await?)
}

/// All experiments with their document ids.
pub async fn list_experiments(
    store: &dyn DocumentStore,
) -> IngestResult<Vec<(u64, Experiment)>> {
    decode_all(store.all(EXPERIMENTS).await?)
}

fn decode_all<T: serde::de::DeserializeOwned>(docs: Vec<(u64, Value)>) -> IngestResult<Vec<(u64, T)>> {
    docs.into_iter()
        .map(|(id, doc)| Ok((id, serde_json::from_value(doc)?)))
        .collect()
}
