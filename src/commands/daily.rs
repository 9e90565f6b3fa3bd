//! Daily command - detect a signal on the daily close and place a bracketed order
//!
//! Intended to run once a day shortly after the broker's daily candle closes.
//! Any failure aborts the run with a non-zero exit so the scheduler can alert.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use fx_strategies::config::Environment;
use fx_strategies::data::{complete_only, HistoryFetcher};
use fx_strategies::oanda::OandaClient;
use fx_strategies::risk::plan_order;
use fx_strategies::strategies::create_detector;
use fx_strategies::{Granularity, PriceSide};
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};

pub fn run(
    config_path: String,
    instrument: Option<String>,
    strategy: Option<String>,
    live: bool,
    dry_run: bool,
) -> Result<()> {
    let config = super::load_config(&config_path)?;
    let environment = Environment::from_live_flag(live);
    let instrument = instrument.unwrap_or_else(|| config.trading.instrument.clone());
    let strategy_name = strategy.unwrap_or_else(|| config.strategy_name.clone());

    let detector = create_detector(&strategy_name, &config.strategy)?;

    info!(
        "Starting daily runner: {} | environment={} | strategy={} | dry_run={}",
        instrument, environment, strategy_name, dry_run
    );

    let client = OandaClient::new(&config, environment).context("Failed to create OANDA client")?;
    let fetcher = HistoryFetcher::with_delay(&client, config.settings.request_delay());

    let to = Utc::now();
    let from = to - Duration::days(config.trading.lookback_days);
    info!("Fetching daily candles from {}", from.format("%Y-%m-%d"));

    let candles = fetcher
        .fetch(&instrument, Granularity::D, from, to, PriceSide::Mid)
        .with_context(|| format!("Failed to fetch daily candles for {}", instrument))?;
    if candles.is_empty() {
        bail!("No data retrieved for {}", instrument);
    }

    let candles = complete_only(candles);
    if candles.len() < config.trading.min_candles {
        bail!(
            "Insufficient complete candles ({}), need at least {}",
            candles.len(),
            config.trading.min_candles
        );
    }
    if candles.len() < detector.min_bars() {
        warn!(
            "{} needs {} bars but only {} are available; increase trading.lookback_days",
            detector.name(),
            detector.min_bars(),
            candles.len()
        );
    }

    let Some(signal) = detector.detect(&candles) else {
        info!("No signal detected, exiting cleanly");
        return Ok(());
    };

    info!(
        "Signal detected: side={} entry~{:.5} sl_dist={:.5}",
        signal.side, signal.entry_price, signal.stop_distance
    );

    let account = client
        .account_summary()
        .context("Failed to fetch account summary")?;
    let balance = account
        .balance
        .to_f64()
        .context("Account balance is not representable")?;
    info!("Account balance: {} {}", account.balance, account.currency);

    let plan = plan_order(
        &signal,
        balance,
        config.trading.risk_percent,
        detector.risk_reward(),
    )?;

    if plan.units == 0 {
        warn!("Position size rounds to zero units, skipping order");
        return Ok(());
    }

    info!(
        "Order: {} {} {} units | entry~{:.5} | sl={:.5} | tp={:.5}",
        instrument,
        plan.side.to_string().to_uppercase(),
        plan.units,
        plan.entry_price,
        plan.stop_loss,
        plan.take_profit
    );

    if dry_run {
        info!("[DRY RUN] Order not placed");
        return Ok(());
    }

    let response = client
        .place_market_order(&instrument, plan.units, plan.stop_loss, plan.take_profit)
        .with_context(|| format!("Failed to place order for {}", instrument))?;

    if !response.is_filled() {
        bail!("Order for {} was not filled", instrument);
    }

    info!(
        "Order filled: transaction {}",
        response.last_transaction_id.as_deref().unwrap_or("unknown")
    );
    Ok(())
}
