//! Ingest command implementation.

use std::sync::Arc;

use anyhow::Result;
use console::style;
use nlg_ingest::Config;
use nlg_store::DocumentStore;

use super::common::open_store;

/// Execute the ingest command.
pub async fn execute(config: &Config) -> Result<()> {
    config.validate()?;
    let store: Arc<dyn DocumentStore> = open_store(config).await?;

    println!(
        "{} Ingesting from {}",
        style("→").cyan().bold(),
        config.data_folder.display()
    );
    let summary = nlg_ingest::ingest(config, store).await?;

    for (adapter, count) in &summary.per_adapter {
        println!("  {:<12} {:>5} experiment(s)", style(adapter).bold(), count);
    }
    println!(
        "{} Stored {} experiment(s), {} with histograms",
        style("✓").green().bold(),
        summary.experiments,
        summary.histograms
    );
    Ok(())
}
