//! RSI Mean Reversion
//!
//! Fades stretched moves back toward the Bollinger mean, in the direction of
//! the long EMA trend.

mod config;
mod strategy;

pub use config::RsiMeanReversionConfig;
pub use strategy::{detect, RsiMeanReversion};

use crate::error::{FxError, FxResult};
use crate::strategies::SignalDetector;

/// Create detector from JSON parameters (called by the factory)
pub fn create(params: &serde_json::Value) -> FxResult<Box<dyn SignalDetector>> {
    let config: RsiMeanReversionConfig = if params.is_null() {
        RsiMeanReversionConfig::default()
    } else {
        serde_json::from_value(params.clone()).map_err(|e| {
            FxError::InvalidStrategyParams(format!("rsi_mean_reversion: {}", e))
        })?
    };
    config.validate()?;
    Ok(Box::new(RsiMeanReversion::new(config)))
}
