//! Forex Trading Toolkit
//!
//! Paginated historical candle retrieval from OANDA, CSV dataset storage,
//! breakout and mean-reversion signal detection, and risk-based position
//! sizing for a once-a-day trading job.

pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod oanda;
pub mod risk;
pub mod storage;
pub mod strategies;
pub mod types;

pub use config::Config;
pub use error::{ErrorKind, FxError, FxResult};
pub use types::*;
