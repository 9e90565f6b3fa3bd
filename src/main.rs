//! Forex toolkit - main entry point
//!
//! Subcommands:
//! - download: fetch historical candles into CSV datasets
//! - daily: detect a signal on the daily close and place a bracketed order
//! - close: close an instrument's open position before the daily close
//! - size: offline position size calculator
//! - list: show stored datasets

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "fx-strategies")]
#[command(about = "Forex data retrieval, signal detection and position sizing for OANDA", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "configs/oanda.json")]
    config: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for per-run log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download historical candles to CSV
    Download {
        /// Instruments (comma-separated). E.g., "EUR_USD,GBP_USD"
        #[arg(short, long, default_value = "EUR_USD")]
        instruments: String,

        /// Candle granularity (S5 .. M). E.g., "M15", "H1", "D"
        #[arg(short, long, default_value = "H1")]
        granularity: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// End date (YYYY-MM-DD), defaults to now
        #[arg(long)]
        to: Option<String>,

        /// Price side: M (mid), B (bid) or A (ask)
        #[arg(long, default_value = "M")]
        price: String,

        /// Output directory (defaults to storage.data_dir from config)
        #[arg(short, long)]
        output: Option<String>,

        /// Merge into the latest existing dataset for the instrument
        #[arg(long, conflicts_with = "overwrite")]
        append: bool,

        /// Replace an existing dataset with the same name
        #[arg(long)]
        overwrite: bool,

        /// Use the live account (default: practice)
        #[arg(long)]
        live: bool,
    },

    /// Run the daily signal job for one instrument
    Daily {
        /// Instrument (defaults to trading.instrument from config)
        #[arg(long)]
        instrument: Option<String>,

        /// Detector name (defaults to strategy_name from config)
        #[arg(short, long)]
        strategy: Option<String>,

        /// Use the live account (CAUTION - REAL MONEY!)
        #[arg(long)]
        live: bool,

        /// Log the order without placing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Close the open position for an instrument
    Close {
        /// Instrument (defaults to trading.instrument from config)
        #[arg(long)]
        instrument: Option<String>,

        /// Use the live account (CAUTION - REAL MONEY!)
        #[arg(long)]
        live: bool,

        /// Log the position without closing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Calculate position size in lots
    Size {
        /// Account equity in account currency
        #[arg(long)]
        equity: f64,

        /// Percent of equity to risk (1.0 = 1%)
        #[arg(long, default_value = "1.0")]
        risk: f64,

        /// Stop loss distance in pips
        #[arg(long)]
        stop_pips: f64,

        /// Pip value per standard lot
        #[arg(long, required_unless_present = "instrument")]
        pip_value: Option<f64>,

        /// Look up the pip value for this instrument
        #[arg(long)]
        instrument: Option<String>,
    },

    /// List stored datasets
    List {
        /// Only this instrument
        #[arg(long)]
        instrument: Option<String>,

        /// Data directory (defaults to storage.data_dir from config)
        #[arg(long)]
        data_dir: Option<String>,
    },
}

/// Console plus a per-run file in `log_dir`, named `{command}_{timestamp}.log`.
/// `RUST_LOG` takes precedence over `--verbose`.
fn setup_logging(verbose: bool, command_name: &str, log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},hyper=warn,reqwest=warn,rustls=warn", level))
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(verbose)
        .with_line_number(verbose);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::never(log_dir, &log_filename))
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(log_dir.join(log_filename))
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Download { .. } => "download",
        Commands::Daily { .. } => "daily",
        Commands::Close { .. } => "close",
        Commands::Size { .. } => "size",
        Commands::List { .. } => "list",
    };

    let log_path = setup_logging(cli.verbose, command_name, &cli.log_dir)?;
    info!("Logging to {}", log_path.display());

    match cli.command {
        Commands::Download {
            instruments,
            granularity,
            from,
            to,
            price,
            output,
            append,
            overwrite,
            live,
        } => commands::download::run(commands::download::DownloadArgs {
            config_path: cli.config,
            instruments,
            granularity,
            from,
            to,
            price,
            output,
            append,
            overwrite,
            live,
        }),

        Commands::Daily {
            instrument,
            strategy,
            live,
            dry_run,
        } => commands::daily::run(cli.config, instrument, strategy, live, dry_run),

        Commands::Close {
            instrument,
            live,
            dry_run,
        } => commands::close::run(cli.config, instrument, live, dry_run),

        Commands::Size {
            equity,
            risk,
            stop_pips,
            pip_value,
            instrument,
        } => commands::size::run(equity, risk, stop_pips, pip_value, instrument),

        Commands::List {
            instrument,
            data_dir,
        } => commands::list::run(cli.config, instrument, data_dir),
    }
}
