//! Experiments command implementation.

use anyhow::Result;
use console::style;
use nlg_core::Experiment;
use nlg_ingest::Config;
use nlg_store::records::list_experiments;

use super::common::open_store;

fn row(id: u64, experiment: &Experiment, decimals: u32) -> String {
    format!(
        "  {:<5}  {:<10}  {:<28}  {:<10}  {:>6}  {:<12}  {:.3e}",
        id,
        experiment.date.format("%Y-%m-%d"),
        format!("{}/{}", experiment.device.provider, experiment.device.name),
        experiment.circuit_data.strategy,
        experiment.circuit_data.shots,
        experiment.win_rate.to_str(decimals),
        experiment.win_rate.p_value,
    )
}

/// Execute the experiments command.
pub async fn execute(config: &Config, decimals: u32) -> Result<()> {
    let store = open_store(config).await?;
    let experiments = list_experiments(store.as_ref()).await?;

    if experiments.is_empty() {
        println!("No experiments found.");
        return Ok(());
    }

    println!("{} {} experiment(s):\n", style("→").cyan().bold(), experiments.len());
    println!(
        "  {:<5}  {:<10}  {:<28}  {:<10}  {:>6}  {:<12}  {}",
        style("ID").bold(),
        style("DATE").bold(),
        style("DEVICE").bold(),
        style("STRATEGY").bold(),
        style("SHOTS").bold(),
        style("WIN RATE %").bold(),
        style("P-VALUE").bold()
    );
    for (id, experiment) in &experiments {
        println!("{}", row(*id, experiment, decimals));
    }
    Ok(())
}
