//! List command - show stored datasets

use anyhow::{Context, Result};
use fx_strategies::storage::DataStorage;

pub fn run(config_path: String, instrument: Option<String>, data_dir: Option<String>) -> Result<()> {
    // The data directory alone is enough; a missing config file is fine here
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => super::load_config(&config_path)
            .map(|c| c.storage.data_dir)
            .unwrap_or_else(|_| fx_strategies::config::StorageConfig::default().data_dir),
    };

    let storage = DataStorage::new(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir))?;
    let datasets = storage.list_available_data(instrument.as_deref())?;

    if datasets.is_empty() {
        println!("No datasets found in {}", data_dir);
        return Ok(());
    }

    println!(
        "\n{:<10} {:<6} {:<10} {:<10} {:>8}  {}",
        "INSTRUMENT", "GRAN", "FROM", "TO", "RECORDS", "PATH"
    );
    println!("{}", "-".repeat(80));
    for d in &datasets {
        println!(
            "{:<10} {:<6} {:<10} {:<10} {:>8}  {}",
            d.instrument,
            d.granularity,
            d.from_date,
            d.to_date,
            d.record_count,
            d.path.display()
        );
    }
    println!("\n{} dataset(s)", datasets.len());

    Ok(())
}
