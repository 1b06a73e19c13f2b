//! Games known to the curated database.

use nlg_core::papers::oddities_paper;
use nlg_core::{IngestResult, NonlocalGame, Object};
use nlg_store::records::{GAMES, insert_game};
use nlg_store::{DocumentStore, Query};
use tracing::{debug, info};

/// Name of the G14 graph-colouring game.
pub const G14: &str = "G14";

/// The G14 graph-colouring game.
pub fn g14() -> NonlocalGame {
    NonlocalGame::new(G14, 86.0 / 88.0, 1.0)
        .with_publication(oddities_paper())
        .with_tag("graph-coloring")
        .with_object(Object::new(
            "graph",
            "NetworkX definition of the G14 graph",
            "games/g14/g14.nx",
        ))
}

pub fn default_games() -> Vec<NonlocalGame> {
    vec![g14()]
}

/// Register every default game whose name is not stored yet. Returns the
/// ids of the inserted games.
pub async fn ensure_default_games(store: &dyn DocumentStore) -> IngestResult<Vec<u64>> {
    let mut inserted = Vec::new();
    for game in default_games() {
        let existing = store.search(GAMES, &Query::field("name").eq(game.name.as_str())).await?;
        if !existing.is_empty() {
            debug!(game = %game.name, "Game already registered");
            continue;
        }
        let id = insert_game(store, &game).await?;
        info!(game = %game.name, id, "Registered game");
        inserted.push(id);
    }
    Ok(inserted)
}
