//! RSI Mean Reversion Configuration

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, FxError, FxResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiMeanReversionConfig {
    /// RSI period (default: 14)
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// Long entries need RSI below this (default: 20)
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// Short entries need RSI above this (default: 80)
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,

    /// Bollinger Bands period (default: 20)
    #[serde(default = "default_bb_period")]
    pub bb_period: usize,

    /// Bollinger Bands standard deviations (default: 2.0)
    #[serde(default = "default_bb_std")]
    pub bb_std: f64,

    /// Trend filter EMA period (default: 200)
    #[serde(default = "default_ema_period")]
    pub ema_period: usize,

    /// Take-profit distance as a multiple of the stop distance (default: 2.0)
    #[serde(default = "default_risk_reward")]
    pub risk_reward: f64,

    /// Skip when (upper - lower) / middle is below this
    #[serde(default)]
    pub min_bb_width: Option<f64>,

    /// Skip when (upper - lower) / middle is above this
    #[serde(default)]
    pub max_bb_width: Option<f64>,
}

fn default_rsi_period() -> usize {
    14
}
fn default_rsi_oversold() -> f64 {
    20.0
}
fn default_rsi_overbought() -> f64 {
    80.0
}
fn default_bb_period() -> usize {
    20
}
fn default_bb_std() -> f64 {
    2.0
}
fn default_ema_period() -> usize {
    200
}
fn default_risk_reward() -> f64 {
    2.0
}

impl Default for RsiMeanReversionConfig {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            rsi_oversold: default_rsi_oversold(),
            rsi_overbought: default_rsi_overbought(),
            bb_period: default_bb_period(),
            bb_std: default_bb_std(),
            ema_period: default_ema_period(),
            risk_reward: default_risk_reward(),
            min_bb_width: None,
            max_bb_width: None,
        }
    }
}

impl RsiMeanReversionConfig {
    pub fn validate(&self) -> FxResult<()> {
        if self.rsi_period == 0 || self.bb_period == 0 || self.ema_period == 0 {
            return Err(FxError::InvalidStrategyParams(
                "rsi_period, bb_period and ema_period must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(FxError::InvalidStrategyParams(format!(
                "RSI thresholds must satisfy 0 <= oversold ({}) < overbought ({}) <= 100",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        ensure_positive("bb_std", self.bb_std)?;
        ensure_positive("risk_reward", self.risk_reward)?;
        Ok(())
    }
}
