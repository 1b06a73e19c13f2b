//! Games command implementation.

use anyhow::Result;
use console::style;
use nlg_ingest::Config;
use nlg_store::records::list_games;

use super::common::open_store;

/// Execute the games command.
pub async fn execute(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let games = list_games(store.as_ref()).await?;

    if games.is_empty() {
        println!("No games found. Run `nlg init` first.");
        return Ok(());
    }

    println!(
        "  {:<4}  {:<10}  {:<9}  {:<9}  {}",
        style("ID").bold(),
        style("NAME").bold(),
        style("CLASSICAL").bold(),
        style("QUANTUM").bold(),
        style("TAGS").bold()
    );
    for (id, game) in &games {
        println!(
            "  {:<4}  {:<10}  {:<9.4}  {:<9.4}  {}",
            id,
            game.name,
            game.optimal_classical_value,
            game.optimal_quantum_value,
            game.tags.join(", ")
        );
    }
    Ok(())
}
