//! Core data types used across the toolkit

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::FxError;

/// Validation errors for candle data
#[derive(Debug, Error)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// One OHLCV bar for a fixed interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// True once the bar's interval has fully elapsed
    pub complete: bool,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
        complete: bool,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self::new_unchecked(time, open, high, low, close, volume, complete);
        candle.validate()?;
        Ok(candle)
    }

    /// Create a candle without validation (for trusted sources or tests)
    pub fn new_unchecked(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
        complete: bool,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
            complete,
        }
    }

    /// Validate the candle data
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        // NaN fails this check as well
        if !(self.open > 0.0 && self.high > 0.0 && self.low > 0.0 && self.close > 0.0) {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Trade signal emitted by a detector for the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub side: Side,
    pub entry_price: f64,
    pub stop_distance: f64,
}

impl Signal {
    pub fn stop_loss(&self) -> f64 {
        match self.side {
            Side::Buy => self.entry_price - self.stop_distance,
            Side::Sell => self.entry_price + self.stop_distance,
        }
    }

    pub fn take_profit(&self, risk_reward: f64) -> f64 {
        let reward = self.stop_distance * risk_reward;
        match self.side {
            Side::Buy => self.entry_price + reward,
            Side::Sell => self.entry_price - reward,
        }
    }
}

/// Supported bar sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    S5,
    S10,
    S15,
    S30,
    M1,
    M2,
    M4,
    M5,
    M10,
    M15,
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D,
    W,
    M,
}

impl Granularity {
    pub const ALL: [Granularity; 21] = [
        Granularity::S5,
        Granularity::S10,
        Granularity::S15,
        Granularity::S30,
        Granularity::M1,
        Granularity::M2,
        Granularity::M4,
        Granularity::M5,
        Granularity::M10,
        Granularity::M15,
        Granularity::M30,
        Granularity::H1,
        Granularity::H2,
        Granularity::H3,
        Granularity::H4,
        Granularity::H6,
        Granularity::H8,
        Granularity::H12,
        Granularity::D,
        Granularity::W,
        Granularity::M,
    ];

    /// Upstream code, e.g. "M15" or "D"
    pub fn code(&self) -> &'static str {
        match self {
            Granularity::S5 => "S5",
            Granularity::S10 => "S10",
            Granularity::S15 => "S15",
            Granularity::S30 => "S30",
            Granularity::M1 => "M1",
            Granularity::M2 => "M2",
            Granularity::M4 => "M4",
            Granularity::M5 => "M5",
            Granularity::M10 => "M10",
            Granularity::M15 => "M15",
            Granularity::M30 => "M30",
            Granularity::H1 => "H1",
            Granularity::H2 => "H2",
            Granularity::H3 => "H3",
            Granularity::H4 => "H4",
            Granularity::H6 => "H6",
            Granularity::H8 => "H8",
            Granularity::H12 => "H12",
            Granularity::D => "D",
            Granularity::W => "W",
            Granularity::M => "M",
        }
    }

    /// Bar length in seconds. Monthly is approximated as 30 days.
    pub fn seconds(&self) -> i64 {
        match self {
            Granularity::S5 => 5,
            Granularity::S10 => 10,
            Granularity::S15 => 15,
            Granularity::S30 => 30,
            Granularity::M1 => 60,
            Granularity::M2 => 120,
            Granularity::M4 => 240,
            Granularity::M5 => 300,
            Granularity::M10 => 600,
            Granularity::M15 => 900,
            Granularity::M30 => 1_800,
            Granularity::H1 => 3_600,
            Granularity::H2 => 7_200,
            Granularity::H3 => 10_800,
            Granularity::H4 => 14_400,
            Granularity::H6 => 21_600,
            Granularity::H8 => 28_800,
            Granularity::H12 => 43_200,
            Granularity::D => 86_400,
            Granularity::W => 604_800,
            Granularity::M => 2_592_000,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds())
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Granularity {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Granularity::ALL
            .iter()
            .copied()
            .find(|g| g.code() == code)
            .ok_or_else(|| FxError::UnsupportedGranularity(s.to_string()))
    }
}

/// Which quoted price to extract from upstream candles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriceSide {
    #[default]
    Mid,
    Bid,
    Ask,
}

impl PriceSide {
    pub fn code(&self) -> &'static str {
        match self {
            PriceSide::Mid => "M",
            PriceSide::Bid => "B",
            PriceSide::Ask => "A",
        }
    }
}

impl fmt::Display for PriceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PriceSide {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "mid" => Ok(PriceSide::Mid),
            "b" | "bid" => Ok(PriceSide::Bid),
            "a" | "ask" => Ok(PriceSide::Ask),
            _ => Err(FxError::UnsupportedPriceSide(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_067_200, 0).unwrap()
    }

    #[test]
    fn test_candle_validation() {
        assert!(Candle::new(ts(), 1.10, 1.12, 1.09, 1.11, 100, true).is_ok());

        assert!(matches!(
            Candle::new(ts(), 1.10, 1.08, 1.09, 1.10, 100, true),
            Err(CandleValidationError::HighLessThanLow { .. })
        ));
        assert!(matches!(
            Candle::new(ts(), 1.13, 1.12, 1.09, 1.11, 100, true),
            Err(CandleValidationError::OpenOutOfRange { .. })
        ));
        assert!(matches!(
            Candle::new(ts(), 1.10, 1.12, 1.09, 1.08, 100, true),
            Err(CandleValidationError::CloseOutOfRange { .. })
        ));
        assert!(matches!(
            Candle::new(ts(), 0.0, 1.12, 1.09, 1.11, 100, true),
            Err(CandleValidationError::NonPositivePrice { .. })
        ));
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("M15".parse::<Granularity>().unwrap(), Granularity::M15);
        assert_eq!("D".parse::<Granularity>().unwrap(), Granularity::D);
        assert_eq!("M".parse::<Granularity>().unwrap(), Granularity::M);
        assert!("M3".parse::<Granularity>().is_err());
        assert!("1h".parse::<Granularity>().is_err());

        for g in Granularity::ALL {
            assert_eq!(g.code().parse::<Granularity>().unwrap(), g);
        }
    }

    #[test]
    fn test_granularity_seconds() {
        assert_eq!(Granularity::S5.seconds(), 5);
        assert_eq!(Granularity::H1.seconds(), 3_600);
        assert_eq!(Granularity::D.duration(), Duration::days(1));
        assert_eq!(Granularity::W.duration(), Duration::weeks(1));
    }

    #[test]
    fn test_price_side_parse() {
        assert_eq!("M".parse::<PriceSide>().unwrap(), PriceSide::Mid);
        assert_eq!("bid".parse::<PriceSide>().unwrap(), PriceSide::Bid);
        assert_eq!("A".parse::<PriceSide>().unwrap(), PriceSide::Ask);
        assert!("BA".parse::<PriceSide>().is_err());
    }

    #[test]
    fn test_signal_brackets() {
        let buy = Signal {
            side: Side::Buy,
            entry_price: 1.2500,
            stop_distance: 0.0050,
        };
        assert!((buy.stop_loss() - 1.2450).abs() < 1e-12);
        assert!((buy.take_profit(2.0) - 1.2600).abs() < 1e-12);

        let sell = Signal {
            side: Side::Sell,
            ..buy
        };
        assert!((sell.stop_loss() - 1.2550).abs() < 1e-12);
        assert!((sell.take_profit(2.0) - 1.2400).abs() < 1e-12);
    }
}
