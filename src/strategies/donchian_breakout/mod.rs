//! Donchian Channel Breakout
//!
//! Entry when the latest close breaks the highest high (long) or lowest low
//! (short) of the previous N bars. Stop distance is a multiple of ATR.

mod config;
mod strategy;

pub use config::DonchianBreakoutConfig;
pub use strategy::{detect, detect_signal, DonchianBreakout};

use crate::error::{FxError, FxResult};
use crate::strategies::SignalDetector;

/// Create detector from JSON parameters (called by the factory)
pub fn create(params: &serde_json::Value) -> FxResult<Box<dyn SignalDetector>> {
    let config: DonchianBreakoutConfig = if params.is_null() {
        DonchianBreakoutConfig::default()
    } else {
        serde_json::from_value(params.clone()).map_err(|e| {
            FxError::InvalidStrategyParams(format!("donchian_breakout: {}", e))
        })?
    };
    config.validate()?;
    Ok(Box::new(DonchianBreakout::new(config)))
}
