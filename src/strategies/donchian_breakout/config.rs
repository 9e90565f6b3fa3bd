//! Donchian Breakout Configuration

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, FxError, FxResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DonchianBreakoutConfig {
    /// Bars in the channel, excluding the current one (default: 40)
    pub channel_period: usize,

    /// ATR period (default: 14)
    pub atr_period: usize,

    /// Stop distance as a multiple of ATR (default: 2.0)
    pub stop_atr_multiple: f64,

    /// Minimum channel width as a fraction of price (default: 0.002)
    pub min_channel_fraction: f64,

    /// Take-profit distance as a multiple of the stop distance (default: 2.0)
    pub risk_reward: f64,
}

impl Default for DonchianBreakoutConfig {
    fn default() -> Self {
        Self {
            channel_period: 40,
            atr_period: 14,
            stop_atr_multiple: 2.0,
            min_channel_fraction: 0.002,
            risk_reward: 2.0,
        }
    }
}

impl DonchianBreakoutConfig {
    pub fn validate(&self) -> FxResult<()> {
        if self.channel_period == 0 || self.atr_period == 0 {
            return Err(FxError::InvalidStrategyParams(
                "channel_period and atr_period must be at least 1".to_string(),
            ));
        }
        ensure_positive("stop_atr_multiple", self.stop_atr_multiple)?;
        ensure_positive("risk_reward", self.risk_reward)?;
        if self.min_channel_fraction < 0.0 {
            return Err(FxError::InvalidStrategyParams(
                "min_channel_fraction must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
