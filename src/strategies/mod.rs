//! Signal detectors
//!
//! Each detector looks at a window of complete candles and decides whether
//! the latest bar is an entry. Detectors hold no state between calls.

pub mod donchian_breakout;
pub mod rsi_mean_reversion;

use crate::error::{FxError, FxResult};
use crate::{Candle, Signal};

/// Stateless entry detector
pub trait SignalDetector: Send + Sync {
    /// Name used in configuration and logs
    fn name(&self) -> &'static str;

    /// Bars needed before a signal is possible
    fn min_bars(&self) -> usize;

    /// Take-profit distance as a multiple of the stop distance
    fn risk_reward(&self) -> f64;

    /// Signal for the last candle of `candles`, if any
    fn detect(&self, candles: &[Candle]) -> Option<Signal>;
}

/// Detector names accepted by [`create_detector`]
pub const AVAILABLE_DETECTORS: [&str; 2] = ["donchian_breakout", "rsi_mean_reversion"];

/// Build a detector by name from its JSON parameters.
///
/// Missing parameters take their defaults; `null` means all defaults.
pub fn create_detector(
    name: &str,
    params: &serde_json::Value,
) -> FxResult<Box<dyn SignalDetector>> {
    match name {
        "donchian_breakout" => donchian_breakout::create(params),
        "rsi_mean_reversion" => rsi_mean_reversion::create(params),
        _ => Err(FxError::UnknownStrategy {
            name: name.to_string(),
            available: AVAILABLE_DETECTORS.join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_with_defaults() {
        let detector = create_detector("donchian_breakout", &json!({})).unwrap();
        assert_eq!(detector.name(), "donchian_breakout");
        assert_eq!(detector.min_bars(), 41);
        assert_eq!(detector.risk_reward(), 2.0);

        let detector = create_detector("rsi_mean_reversion", &serde_json::Value::Null).unwrap();
        assert_eq!(detector.min_bars(), 200);
    }

    #[test]
    fn test_create_with_params() {
        let detector = create_detector(
            "donchian_breakout",
            &json!({ "channel_period": 20, "atr_period": 10, "risk_reward": 3.0 }),
        )
        .unwrap();
        assert_eq!(detector.min_bars(), 21);
        assert_eq!(detector.risk_reward(), 3.0);
    }

    #[test]
    fn test_unknown_detector() {
        let err = create_detector("vwap_hma_crossover", &json!({})).err().unwrap();
        assert!(matches!(err, FxError::UnknownStrategy { .. }));
        assert!(err.to_string().contains("donchian_breakout, rsi_mean_reversion"));
    }

    #[test]
    fn test_invalid_params() {
        let err = create_detector("donchian_breakout", &json!({ "channel_period": "forty" }))
            .err()
            .unwrap();
        assert!(matches!(err, FxError::InvalidStrategyParams(_)));

        let err = create_detector("rsi_mean_reversion", &json!({ "rsi_oversold": 90 }))
            .err()
            .unwrap();
        assert!(matches!(err, FxError::InvalidStrategyParams(_)));

        let err = create_detector("donchian_breakout", &json!({ "channel_period": 0 }))
            .err()
            .unwrap();
        assert!(matches!(err, FxError::InvalidStrategyParams(_)));
    }
}
