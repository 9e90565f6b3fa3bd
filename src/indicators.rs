//! Technical indicators
//!
//! Windowed indicators over plain price slices. Values that are not yet
//! defined (warm-up) are `None`. Bollinger Bands wrap the `ta` crate. EMA,
//! RSI and ATR are computed here because they need SMA seeding and
//! Wilder's smoothing, which `ta` does not use.

use ta::indicators::BollingerBands as TaBB;
use ta::Next;

use crate::Candle;

/// Type alias for band indicators (upper, middle, lower)
pub type BandOutput = (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>);

/// Column views over a candle slice, in the order the indicator functions take them
pub fn hlc(candles: &[Candle]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let high = candles.iter().map(|c| c.high).collect();
    let low = candles.iter().map(|c| c.low).collect();
    let close = candles.iter().map(|c| c.close).collect();
    (high, low, close)
}

// =============================================================================
// Channels
// =============================================================================

/// Highest value over the `period` bars *before* each index.
///
/// `result[i] = max(values[i - period .. i])`, so bar `i` never sees its own
/// value. Undefined until `period` prior bars exist.
pub fn prior_highest(values: &[f64], period: usize) -> Vec<Option<f64>> {
    prior_window(values, period, f64::max)
}

/// Lowest value over the `period` bars before each index
pub fn prior_lowest(values: &[f64], period: usize) -> Vec<Option<f64>> {
    prior_window(values, period, f64::min)
}

fn prior_window(values: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i < period {
                None
            } else {
                values[i - period..i].iter().copied().reduce(pick)
            }
        })
        .collect()
}

/// Donchian channel over prior bars: (upper, middle, lower)
pub fn donchian(high: &[f64], low: &[f64], period: usize) -> BandOutput {
    let upper = prior_highest(high, period);
    let lower = prior_lowest(low, period);
    let middle = upper
        .iter()
        .zip(lower.iter())
        .map(|(u, l)| match (u, l) {
            (Some(u), Some(l)) => Some((u + l) / 2.0),
            _ => None,
        })
        .collect();
    (upper, middle, lower)
}

// =============================================================================
// Volatility
// =============================================================================

/// Calculate True Range
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        let tr_value = if i == 0 {
            high[i] - low[i]
        } else {
            let hl = high[i] - low[i];
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            hl.max(hc).max(lc)
        };
        tr.push(tr_value);
    }

    tr
}

/// Average True Range using Wilder's smoothing.
///
/// The first value is the SMA of the first `period` true ranges, after that
/// `ATR = (prev_ATR * (period - 1) + TR) / period`.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    if high.is_empty() || period == 0 || high.len() != low.len() || high.len() != close.len() {
        return vec![None; high.len()];
    }

    let tr = true_range(high, low, close);
    let mut result = Vec::with_capacity(tr.len());
    let mut atr_value: Option<f64> = None;

    for i in 0..tr.len() {
        if i + 1 < period {
            result.push(None);
            continue;
        }

        let next = match atr_value {
            None => tr[0..period].iter().sum::<f64>() / period as f64,
            Some(prev) => (prev * (period - 1) as f64 + tr[i]) / period as f64,
        };
        atr_value = Some(next);
        result.push(atr_value);
    }

    result
}

// =============================================================================
// Trend and momentum
// =============================================================================

/// Exponential Moving Average, seeded with the SMA of the first `period` values
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut ema_value: Option<f64> = None;

    for (i, &value) in values.iter().enumerate() {
        if i + 1 < period {
            result.push(None);
            continue;
        }

        let next = match ema_value {
            None => values[0..period].iter().sum::<f64>() / period as f64,
            Some(prev) => (value - prev) * multiplier + prev,
        };
        ema_value = Some(next);
        result.push(ema_value);
    }

    result
}

/// Relative Strength Index with Wilder's smoothing.
///
/// Average gain and loss start as the mean of the first `period` changes,
/// then `avg = (prev_avg * (period - 1) + change) / period`. A window with
/// no movement at all reads 50.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut result = vec![None; values.len()];
    if values.len() <= period {
        return result;
    }

    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| c.max(0.0);
    let loss = |c: f64| (-c).max(0.0);

    let mut avg_gain = changes[..period].iter().copied().map(gain).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().copied().map(loss).sum::<f64>() / period as f64;
    result[period] = Some(rsi_value(avg_gain, avg_loss));

    let smoothing = (period - 1) as f64;
    for i in period + 1..values.len() {
        let change = changes[i - 1];
        avg_gain = (avg_gain * smoothing + gain(change)) / period as f64;
        avg_loss = (avg_loss * smoothing + loss(change)) / period as f64;
        result[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Bollinger Bands: (upper, middle, lower)
pub fn bollinger_bands(values: &[f64], period: usize, num_std: f64) -> BandOutput {
    if values.is_empty() || period == 0 {
        return (vec![], vec![], vec![]);
    }

    let mut indicator = match TaBB::new(period, num_std) {
        Ok(i) => i,
        Err(_) => {
            return (
                vec![None; values.len()],
                vec![None; values.len()],
                vec![None; values.len()],
            )
        }
    };

    let mut upper = Vec::with_capacity(values.len());
    let mut middle = Vec::with_capacity(values.len());
    let mut lower = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let bb = indicator.next(value);
        if i + 1 >= period {
            upper.push(Some(bb.upper));
            middle.push(Some(bb.average));
            lower.push(Some(bb.lower));
        } else {
            upper.push(None);
            middle.push(None);
            lower.push(None);
        }
    }

    (upper, middle, lower)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prior_highest_excludes_current_bar() {
        let values = vec![1.0, 3.0, 2.0, 10.0, 4.0];
        let result = prior_highest(&values, 2);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(3.0));
        // bar 3 is the spike; its own value is not in its window
        assert_eq!(result[3], Some(3.0));
        assert_eq!(result[4], Some(10.0));
    }

    #[test]
    fn test_prior_lowest() {
        let values = vec![5.0, 4.0, 6.0, 1.0, 7.0];
        let result = prior_lowest(&values, 3);

        assert_eq!(result[2], None);
        assert_eq!(result[3], Some(4.0));
        assert_eq!(result[4], Some(1.0));
    }

    #[test]
    fn test_donchian_middle() {
        let high = vec![2.0, 4.0, 3.0];
        let low = vec![1.0, 2.0, 1.5];
        let (upper, middle, lower) = donchian(&high, &low, 2);

        assert_eq!(upper[2], Some(4.0));
        assert_eq!(lower[2], Some(1.0));
        assert_eq!(middle[2], Some(2.5));
        assert_eq!(middle[1], None);
    }

    #[test]
    fn test_true_range_uses_previous_close() {
        let high = vec![10.0, 11.0];
        let low = vec![9.0, 10.5];
        let close = vec![9.2, 10.8];

        let tr = true_range(&high, &low, &close);
        assert_relative_eq!(tr[0], 1.0);
        // gap up: high - prev close dominates
        assert_relative_eq!(tr[1], 1.8);
    }

    #[test]
    fn test_atr() {
        let high = vec![10.0, 11.0, 12.0, 11.5, 12.0];
        let low = vec![9.0, 10.0, 11.0, 10.5, 11.0];
        let close = vec![9.5, 10.5, 11.5, 11.0, 11.5];

        let result = atr(&high, &low, &close, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        let seed = result[2].unwrap();
        assert_relative_eq!(seed, (1.0 + 1.5 + 1.5) / 3.0);

        let tr = true_range(&high, &low, &close);
        assert_relative_eq!(result[3].unwrap(), (seed * 2.0 + tr[3]) / 3.0);
    }

    #[test]
    fn test_atr_mismatched_lengths() {
        let result = atr(&[1.0, 2.0], &[0.5], &[1.0, 1.5], 2);
        assert_eq!(result, vec![None, None]);
    }

    #[test]
    fn test_rsi_bounds() {
        let values = vec![
            44.0, 44.25, 44.5, 43.75, 44.5, 44.25, 44.0, 43.5, 44.0, 44.5, 45.0, 45.25, 45.5, 45.0,
            44.75, 45.1,
        ];
        let result = rsi(&values, 14);

        assert_eq!(result[13], None);
        let rsi_val = result.last().unwrap().unwrap();
        assert!((0.0..=100.0).contains(&rsi_val));
    }

    #[test]
    fn test_rsi_wilder_reference() {
        // Wilder's worked example, 14-period
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ];
        let result = rsi(&closes, 14);

        assert_relative_eq!(result[14].unwrap(), 70.4641, epsilon = 1e-3);
        assert_relative_eq!(result[15].unwrap(), 66.2496, epsilon = 1e-3);
        assert_relative_eq!(result[19].unwrap(), 57.9150, epsilon = 1e-3);
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..20).map(|i| 1.0 + i as f64 * 0.01).collect();
        assert_eq!(rsi(&rising, 14).last().unwrap().unwrap(), 100.0);

        let flat = vec![1.1; 20];
        assert_eq!(rsi(&flat, 14).last().unwrap().unwrap(), 50.0);

        assert_eq!(rsi(&flat[..14], 14), vec![None; 14]);
    }

    #[test]
    fn test_ema_sma_seed() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = ema(&values, 3);

        assert_eq!(result[1], None);
        // seed is the mean of the first three values
        assert_relative_eq!(result[2].unwrap(), 2.0);
        assert_relative_eq!(result[3].unwrap(), 3.0);
        assert_relative_eq!(result[4].unwrap(), 4.0);

        let result = ema(&[2.0, 4.0, 6.0, 8.0], 2);
        assert_relative_eq!(result[1].unwrap(), 3.0);
        assert_relative_eq!(result[3].unwrap(), 7.0);
    }

    #[test]
    fn test_bollinger_bands_order() {
        let values = vec![20.0, 21.0, 22.0, 21.0, 20.0, 21.0, 22.0, 23.0, 22.0, 21.0];
        let (upper, middle, lower) = bollinger_bands(&values, 5, 2.0);

        assert_eq!(upper[3], None);
        assert!(upper[4].unwrap() > middle[4].unwrap());
        assert!(middle[4].unwrap() > lower[4].unwrap());
    }
}
