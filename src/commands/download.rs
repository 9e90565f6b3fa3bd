//! Download command - fetch historical candles from OANDA into CSV datasets

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use fx_strategies::config::Environment;
use fx_strategies::data::{parse_date, HistoryFetcher};
use fx_strategies::oanda::OandaClient;
use fx_strategies::storage::DataStorage;
use fx_strategies::{Candle, FxError, Granularity, PriceSide};
use itertools::Itertools;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

pub struct DownloadArgs {
    pub config_path: String,
    pub instruments: String,
    pub granularity: String,
    pub from: String,
    pub to: Option<String>,
    pub price: String,
    pub output: Option<String>,
    pub append: bool,
    pub overwrite: bool,
    pub live: bool,
}

pub fn run(args: DownloadArgs) -> Result<()> {
    let config = super::load_config(&args.config_path)?;
    let environment = Environment::from_live_flag(args.live);

    let granularity: Granularity = args.granularity.parse()?;
    let price_side: PriceSide = args.price.parse()?;
    let from = parse_date(&args.from)?;
    let to = match &args.to {
        Some(s) => parse_date(s)?,
        None => Utc::now(),
    };
    if from > to {
        bail!(FxError::InvalidRange {
            from: args.from.clone(),
            to: args.to.clone().unwrap_or_else(|| "now".to_string()),
        });
    }

    let instruments: Vec<String> = args
        .instruments
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .unique()
        .collect();
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.storage.data_dir.clone());

    info!("Starting data download from OANDA ({})", environment);

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOADING HISTORICAL DATA FROM OANDA");
    println!("{}", "=".repeat(60));
    println!("  Instruments: {:?}", instruments);
    println!("  Granularity: {}", granularity);
    println!(
        "  Range:       {} -> {}",
        from.format("%Y-%m-%d %H:%M"),
        to.format("%Y-%m-%d %H:%M")
    );
    println!("  Price:       {:?}", price_side);
    println!("  Output:      {}", output);
    println!("{}\n", "=".repeat(60));

    let client = OandaClient::new(&config, environment).context("Failed to create OANDA client")?;
    let fetcher = HistoryFetcher::with_delay(&client, config.settings.request_delay());
    let storage = DataStorage::new(&output)
        .with_context(|| format!("Failed to open data directory {}", output))?;

    println!("  Fetching {} instrument(s)...", instruments.len());
    let mut fetched = fetcher.fetch_multiple(&instruments, granularity, from, to, price_side);

    let mut total_candles = 0;
    let mut success_count = 0;

    for instrument in &instruments {
        print!("  Saving {} {}... ", instrument, granularity);
        io::stdout().flush()?;

        // fetch_multiple already logged why a missing instrument failed
        let Some(candles) = fetched.remove(instrument) else {
            println!("✗ Fetch failed (see log)");
            continue;
        };

        match store(&storage, &candles, instrument, granularity, &args, from, to) {
            Ok(path) => {
                total_candles += candles.len();
                success_count += 1;
                println!("✓ {} candles -> {}", candles.len(), path.display());
            }
            Err(e) => {
                println!("✗ Error: {:#}", e);
                warn!("Skipping {}: {:#}", instrument, e);
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOAD COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Successful: {}/{}", success_count, instruments.len());
    println!("  Total candles: {}", total_candles);
    println!("{}", "=".repeat(60));

    if success_count == 0 && !instruments.is_empty() {
        bail!("No instruments downloaded");
    }

    Ok(())
}

fn store(
    storage: &DataStorage,
    candles: &[Candle],
    instrument: &str,
    granularity: Granularity,
    args: &DownloadArgs,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<PathBuf> {
    if candles.is_empty() {
        bail!(FxError::no_data(format!("no {} candles in range", instrument)));
    }

    if args.append {
        let existing = storage
            .list_available_data(Some(instrument))?
            .into_iter()
            .filter(|d| d.granularity == granularity.code())
            .max_by(|a, b| a.to_date.cmp(&b.to_date));

        if let Some(dataset) = existing {
            return storage
                .append_to_existing(candles, &dataset.path)
                .with_context(|| format!("Failed to append to {}", dataset.path.display()));
        }
        info!("No existing {} {} dataset, creating one", instrument, granularity);
    }

    storage
        .save_to_csv(candles, instrument, granularity, from, to, args.overwrite)
        .context("Failed to save dataset")
}
