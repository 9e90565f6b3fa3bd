//! Donchian Breakout Detector
//!
//! Decision on the latest bar only:
//! - channel upper/lower come from the `channel_period` bars before it
//! - channels narrower than `min_channel_fraction` of price are ignored
//! - close strictly above upper is a buy, strictly below lower a sell
//!
//! Callers pass complete bars only; `complete` is not checked here.

use tracing::debug;

use super::config::DonchianBreakoutConfig;
use crate::indicators::{atr, donchian, hlc};
use crate::strategies::SignalDetector;
use crate::{Candle, Side, Signal};

pub struct DonchianBreakout {
    config: DonchianBreakoutConfig,
}

impl DonchianBreakout {
    pub fn new(config: DonchianBreakoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DonchianBreakoutConfig {
        &self.config
    }
}

impl SignalDetector for DonchianBreakout {
    fn name(&self) -> &'static str {
        "donchian_breakout"
    }

    fn min_bars(&self) -> usize {
        (self.config.channel_period + 1).max(self.config.atr_period)
    }

    fn risk_reward(&self) -> f64 {
        self.config.risk_reward
    }

    fn detect(&self, candles: &[Candle]) -> Option<Signal> {
        detect(candles, &self.config)
    }
}

/// Breakout signal for the last candle of `candles`, if any
pub fn detect(candles: &[Candle], config: &DonchianBreakoutConfig) -> Option<Signal> {
    let last = candles.last()?;
    let (high, low, close) = hlc(candles);

    let (upper, _, lower) = donchian(&high, &low, config.channel_period);
    let atr_values = atr(&high, &low, &close, config.atr_period);

    let upper = (*upper.last()?)?;
    let lower = (*lower.last()?)?;
    let atr = (*atr_values.last()?)?;

    let width = (upper - lower) / last.close;
    if width < config.min_channel_fraction {
        debug!(
            "Channel too narrow: {:.5} < {:.5}",
            width, config.min_channel_fraction
        );
        return None;
    }

    let stop_distance = atr * config.stop_atr_multiple;
    if stop_distance <= 0.0 || !stop_distance.is_finite() {
        return None;
    }

    let side = if last.close > upper {
        Side::Buy
    } else if last.close < lower {
        Side::Sell
    } else {
        return None;
    };

    debug!(
        "Breakout {} at {:.5} (upper {:.5}, lower {:.5}, atr {:.5})",
        side, last.close, upper, lower, atr
    );

    Some(Signal {
        side,
        entry_price: last.close,
        stop_distance,
    })
}

/// [`detect`] with default parameters (40, 14, 2.0, 0.002)
pub fn detect_signal(candles: &[Candle]) -> Option<Signal> {
    detect(candles, &DonchianBreakoutConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
    }

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new_unchecked(day(i), open, high, low, close, 1000, true)
    }

    /// Bars oscillating inside [1.10, 1.12]
    fn ranging(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let close = if i % 2 == 0 { 1.105 } else { 1.115 };
                bar(i, 1.11, 1.12, 1.10, close)
            })
            .collect()
    }

    fn with_last(mut candles: Vec<Candle>, open: f64, high: f64, low: f64, close: f64) -> Vec<Candle> {
        let i = candles.len();
        candles.push(bar(i, open, high, low, close));
        candles
    }

    #[test]
    fn test_buy_on_upper_breakout() {
        let candles = with_last(ranging(60), 1.115, 1.135, 1.11, 1.13);
        let signal = detect_signal(&candles).unwrap();

        assert_eq!(signal.side, Side::Buy);
        assert_eq!(signal.entry_price, 1.13);

        let (high, low, close) = hlc(&candles);
        let expected_atr = atr(&high, &low, &close, 14).last().unwrap().unwrap();
        assert_relative_eq!(signal.stop_distance, expected_atr * 2.0);
    }

    #[test]
    fn test_sell_on_lower_breakout() {
        let candles = with_last(ranging(60), 1.105, 1.108, 1.085, 1.09);
        let signal = detect_signal(&candles).unwrap();

        assert_eq!(signal.side, Side::Sell);
        assert_eq!(signal.entry_price, 1.09);
        assert!(signal.stop_distance > 0.0);
        assert!(signal.stop_loss() > signal.entry_price);
    }

    #[test]
    fn test_no_signal_inside_channel() {
        let candles = with_last(ranging(60), 1.11, 1.118, 1.102, 1.111);
        assert!(detect_signal(&candles).is_none());
    }

    #[test]
    fn test_tie_does_not_trigger() {
        let candles = with_last(ranging(60), 1.11, 1.125, 1.105, 1.12);
        assert!(detect_signal(&candles).is_none());

        let candles = with_last(ranging(60), 1.11, 1.115, 1.095, 1.10);
        assert!(detect_signal(&candles).is_none());
    }

    #[test]
    fn test_insufficient_history() {
        // 39 prior bars: channel undefined
        let short = with_last(ranging(39), 1.115, 1.135, 1.11, 1.13);
        assert!(detect_signal(&short).is_none());

        let enough = with_last(ranging(40), 1.115, 1.135, 1.11, 1.13);
        assert!(detect_signal(&enough).is_some());

        assert!(detect_signal(&[]).is_none());
    }

    #[test]
    fn test_current_bar_excluded_from_channel() {
        // The bar's own high (1.14) is above its close; including it would
        // hide the breakout
        let candles = with_last(ranging(60), 1.115, 1.14, 1.11, 1.13);
        let signal = detect_signal(&candles).unwrap();
        assert_eq!(signal.side, Side::Buy);

        // A spike high with a close inside the prior channel is not a breakout
        let spike = with_last(ranging(60), 1.11, 1.50, 1.10, 1.115);
        assert!(detect_signal(&spike).is_none());
    }

    #[test]
    fn test_later_bars_do_not_change_earlier_decision() {
        let candles = with_last(ranging(60), 1.115, 1.135, 1.11, 1.13);
        let before = detect_signal(&candles);

        let extended = with_last(candles.clone(), 1.13, 1.20, 1.00, 1.05);
        assert_eq!(detect_signal(&extended[..candles.len()]), before);
    }

    #[test]
    fn test_narrow_channel_filtered() {
        let flat: Vec<Candle> = (0..60)
            .map(|i| bar(i, 1.1000, 1.1001, 1.0999, 1.1000))
            .collect();
        let candles = with_last(flat, 1.1000, 1.1004, 1.1000, 1.1003);

        assert!(detect_signal(&candles).is_none());

        let no_filter = DonchianBreakoutConfig {
            min_channel_fraction: 0.0,
            ..Default::default()
        };
        assert_eq!(detect(&candles, &no_filter).unwrap().side, Side::Buy);
    }

    #[test]
    fn test_custom_periods() {
        let config = DonchianBreakoutConfig {
            channel_period: 5,
            atr_period: 3,
            stop_atr_multiple: 1.5,
            ..Default::default()
        };
        let candles = with_last(ranging(5), 1.115, 1.135, 1.11, 1.13);
        let signal = detect(&candles, &config).unwrap();

        let (high, low, close) = hlc(&candles);
        let expected_atr = atr(&high, &low, &close, 3).last().unwrap().unwrap();
        assert_relative_eq!(signal.stop_distance, expected_atr * 1.5);

        let detector = DonchianBreakout::new(config);
        assert_eq!(detector.min_bars(), 6);
        assert_eq!(detector.detect(&candles), Some(signal));
    }
}
