//! RSI Mean Reversion Detector
//!
//! Long: close above EMA, close at or just under the lower band, RSI oversold.
//! Short: close below EMA, close at or just over the upper band, RSI overbought.
//! The stop sits 10% beyond the distance to the touched band.

use tracing::debug;

use super::config::RsiMeanReversionConfig;
use crate::indicators::{bollinger_bands, ema, rsi};
use crate::strategies::SignalDetector;
use crate::{Candle, Side, Signal};

/// How close to a band counts as touching it
const BAND_TOLERANCE: f64 = 0.001;

/// Stop distance multiplier beyond the band
const STOP_BUFFER: f64 = 1.1;

pub struct RsiMeanReversion {
    config: RsiMeanReversionConfig,
}

impl RsiMeanReversion {
    pub fn new(config: RsiMeanReversionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RsiMeanReversionConfig {
        &self.config
    }
}

impl SignalDetector for RsiMeanReversion {
    fn name(&self) -> &'static str {
        "rsi_mean_reversion"
    }

    fn min_bars(&self) -> usize {
        self.config
            .ema_period
            .max(self.config.bb_period)
            .max(self.config.rsi_period + 1)
    }

    fn risk_reward(&self) -> f64 {
        self.config.risk_reward
    }

    fn detect(&self, candles: &[Candle]) -> Option<Signal> {
        detect(candles, &self.config)
    }
}

pub fn detect(candles: &[Candle], config: &RsiMeanReversionConfig) -> Option<Signal> {
    if candles.len() < config.ema_period {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let price = *closes.last()?;

    let rsi_now = (*rsi(&closes, config.rsi_period).last()?)?;
    let ema_now = (*ema(&closes, config.ema_period).last()?)?;
    let (upper, middle, lower) = bollinger_bands(&closes, config.bb_period, config.bb_std);
    let upper = (*upper.last()?)?;
    let middle = (*middle.last()?)?;
    let lower = (*lower.last()?)?;

    if config.min_bb_width.is_some() || config.max_bb_width.is_some() {
        let width = (upper - lower) / middle;
        let too_narrow = config.min_bb_width.is_some_and(|min| width < min);
        let too_wide = config.max_bb_width.is_some_and(|max| width > max);
        if too_narrow || too_wide {
            debug!("Band width {:.5} outside filter", width);
            return None;
        }
    }

    let (side, stop_distance) = if price > ema_now
        && price <= lower * (1.0 + BAND_TOLERANCE)
        && rsi_now < config.rsi_oversold
    {
        (Side::Buy, (price - lower).abs() * STOP_BUFFER)
    } else if price < ema_now
        && price >= upper * (1.0 - BAND_TOLERANCE)
        && rsi_now > config.rsi_overbought
    {
        (Side::Sell, (upper - price).abs() * STOP_BUFFER)
    } else {
        return None;
    };

    if stop_distance <= 0.0 || !stop_distance.is_finite() {
        return None;
    }

    debug!(
        "Mean reversion {} at {:.5} (rsi {:.1}, ema {:.5})",
        side, price, rsi_now, ema_now
    );

    Some(Signal {
        side,
        entry_price: price,
        stop_distance,
    })
}
