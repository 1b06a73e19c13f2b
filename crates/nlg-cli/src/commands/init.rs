//! Init command implementation.

use anyhow::Result;
use console::style;
use nlg_ingest::{Config, ensure_default_games};

use super::common::open_store;

/// Execute the init command.
pub async fn execute(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let inserted = ensure_default_games(store.as_ref()).await?;

    if inserted.is_empty() {
        println!("{} Default games already registered.", style("✓").green().bold());
    } else {
        println!(
            "{} Registered {} game(s) in {}",
            style("✓").green().bold(),
            inserted.len(),
            store.path().display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlg_store::JsonDocumentStore;
    use nlg_store::records::list_games;

    #[tokio::test]
    async fn test_init_registers_games_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_folder = dir.path().to_path_buf();

        execute(&config).await.unwrap();
        execute(&config).await.unwrap();

        let db = dir.path().join("db.json");
        assert!(db.is_file());
        let store = JsonDocumentStore::open(&db).await.unwrap();
        let games = list_games(&store).await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].1.name, nlg_ingest::G14);
    }
}
