//! Close command - close an instrument's open position before the daily close

use anyhow::{Context, Result};
use fx_strategies::config::Environment;
use fx_strategies::oanda::OandaClient;
use tracing::info;

pub fn run(config_path: String, instrument: Option<String>, live: bool, dry_run: bool) -> Result<()> {
    let config = super::load_config(&config_path)?;
    let environment = Environment::from_live_flag(live);
    let instrument = instrument.unwrap_or_else(|| config.trading.instrument.clone());

    info!(
        "EOD close: {} | environment={} | dry_run={}",
        instrument, environment, dry_run
    );

    let client = OandaClient::new(&config, environment).context("Failed to create OANDA client")?;

    let Some(position) = client
        .open_position(&instrument)
        .context("Failed to fetch open positions")?
    else {
        info!("No open position for {}", instrument);
        return Ok(());
    };

    info!(
        "Open position: long={} short={}",
        position.long_units, position.short_units
    );

    if dry_run {
        info!("[DRY RUN] Position not closed");
        return Ok(());
    }

    let response = client
        .close_position(&position)
        .with_context(|| format!("Failed to close position for {}", instrument))?;

    info!(
        "Position closed: transaction {}",
        response.last_transaction_id.as_deref().unwrap_or("unknown")
    );
    Ok(())
}
