//! Position sizing
//!
//! Risk-based sizing for forex trades. Two conventions are used:
//!
//! ```text
//! lots  = (equity * risk% / 100) / (stop_pips * pip_value_per_lot)
//! units = floor(balance * risk% / 100 / stop_distance_in_price)
//! ```
//!
//! Lot sizes are rounded to 0.01 (1 000 units). Pip sizes and pip values
//! come from a fixed table of supported pairs; pip values assume a USD
//! account.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{ensure_positive, FxError, FxResult};
use crate::{Side, Signal};

/// Units in one standard lot
pub const UNITS_PER_LOT: f64 = 100_000.0;

struct PipSpec {
    instrument: &'static str,
    /// Decimal places of one pip (4 means 0.0001)
    decimals: i32,
    /// USD value of one pip for one standard lot
    pip_value: f64,
}

const PIP_TABLE: [PipSpec; 9] = [
    PipSpec { instrument: "EUR_USD", decimals: 4, pip_value: 10.0 },
    PipSpec { instrument: "GBP_USD", decimals: 4, pip_value: 10.0 },
    PipSpec { instrument: "AUD_USD", decimals: 4, pip_value: 10.0 },
    PipSpec { instrument: "NZD_USD", decimals: 4, pip_value: 10.0 },
    PipSpec { instrument: "USD_JPY", decimals: 2, pip_value: 9.12 },
    PipSpec { instrument: "USD_CHF", decimals: 4, pip_value: 10.15 },
    PipSpec { instrument: "USD_CAD", decimals: 4, pip_value: 10.0 },
    PipSpec { instrument: "EUR_GBP", decimals: 4, pip_value: 10.0 },
    PipSpec { instrument: "EUR_JPY", decimals: 2, pip_value: 9.12 },
];

fn lookup(instrument: &str) -> FxResult<&'static PipSpec> {
    PIP_TABLE
        .iter()
        .find(|spec| spec.instrument == instrument)
        .ok_or_else(|| FxError::UnknownInstrument(instrument.to_string()))
}

/// Instruments with a known pip convention
pub fn supported_instruments() -> Vec<&'static str> {
    PIP_TABLE.iter().map(|spec| spec.instrument).collect()
}

/// Price distance of one pip, e.g. 0.0001 for EUR_USD
pub fn pip_size(instrument: &str) -> FxResult<f64> {
    Ok(10f64.powi(-lookup(instrument)?.decimals))
}

/// Value of one pip per standard lot, in USD
pub fn pip_value(instrument: &str) -> FxResult<f64> {
    Ok(lookup(instrument)?.pip_value)
}

/// 20 pips on EUR_USD is 0.002
pub fn pips_to_price(pips: f64, instrument: &str) -> FxResult<f64> {
    Ok(pips / 10f64.powi(lookup(instrument)?.decimals))
}

/// 0.002 on EUR_USD is 20 pips
pub fn price_to_pips(price_distance: f64, instrument: &str) -> FxResult<f64> {
    Ok(price_distance * 10f64.powi(lookup(instrument)?.decimals))
}

/// Risk percent must lie in (0, 100]
pub fn validate_risk_percent(risk_percent: f64) -> FxResult<()> {
    if risk_percent > 0.0 && risk_percent <= 100.0 {
        Ok(())
    } else {
        Err(FxError::RiskPercentOutOfRange(risk_percent))
    }
}

/// Account currency amount at risk on one trade
pub fn calculate_risk_amount(account_equity: f64, risk_percent: f64) -> FxResult<f64> {
    ensure_positive("account_equity", account_equity)?;
    validate_risk_percent(risk_percent)?;
    Ok(account_equity * risk_percent / 100.0)
}

/// Position size in standard lots, rounded to 0.01
pub fn calculate_position_size(
    account_equity: f64,
    risk_percent: f64,
    stop_loss_pips: f64,
    pip_value_per_lot: f64,
) -> FxResult<f64> {
    ensure_positive("stop_loss_pips", stop_loss_pips)?;
    ensure_positive("pip_value", pip_value_per_lot)?;
    let risk_amount = calculate_risk_amount(account_equity, risk_percent)?;

    let lots = risk_amount / (stop_loss_pips * pip_value_per_lot);
    round_lots(lots)
}

/// [`calculate_position_size`] with the pip value taken from the pip table
pub fn position_size_for_instrument(
    account_equity: f64,
    risk_percent: f64,
    stop_loss_pips: f64,
    instrument: &str,
) -> FxResult<f64> {
    let value = pip_value(instrument)?;
    calculate_position_size(account_equity, risk_percent, stop_loss_pips, value)
}

fn round_lots(lots: f64) -> FxResult<f64> {
    Decimal::from_f64(lots)
        .and_then(|d| d.round_dp(2).to_f64())
        .ok_or(FxError::NonPositive {
            name: "position_size",
            value: lots,
        })
}

pub fn lots_to_units(lots: f64) -> i64 {
    (lots * UNITS_PER_LOT).round() as i64
}

/// Whole units such that hitting a stop `stop_distance` away loses
/// `risk_percent` of `balance`
pub fn units_for_risk(balance: f64, risk_percent: f64, stop_distance: f64) -> FxResult<i64> {
    ensure_positive("stop_distance", stop_distance)?;
    let risk_amount = calculate_risk_amount(balance, risk_percent)?;
    Ok((risk_amount / stop_distance).floor() as i64)
}

/// Everything needed to submit a bracketed market order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderPlan {
    pub side: Side,
    /// Signed units: positive buys, negative sells
    pub units: i64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl OrderPlan {
    pub fn from_signal(signal: &Signal, units: i64, risk_reward: f64) -> Self {
        let units = match signal.side {
            Side::Buy => units.abs(),
            Side::Sell => -units.abs(),
        };

        OrderPlan {
            side: signal.side,
            units,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss(),
            take_profit: signal.take_profit(risk_reward),
        }
    }
}

/// Size a signal by account risk and attach its bracket prices
pub fn plan_order(
    signal: &Signal,
    balance: f64,
    risk_percent: f64,
    risk_reward: f64,
) -> FxResult<OrderPlan> {
    let units = units_for_risk(balance, risk_percent, signal.stop_distance)?;
    Ok(OrderPlan::from_signal(signal, units, risk_reward))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_risk_amount() {
        assert_eq!(calculate_risk_amount(10_000.0, 1.0).unwrap(), 100.0);
        assert_eq!(calculate_risk_amount(50_000.0, 2.5).unwrap(), 1_250.0);
    }

    #[test]
    fn test_position_size() {
        assert_eq!(calculate_position_size(10_000.0, 1.0, 20.0, 10.0).unwrap(), 0.5);
        assert_eq!(
            position_size_for_instrument(50_000.0, 2.0, 50.0, "GBP_USD").unwrap(),
            2.0
        );
        // 100 / (30 * 9.12) = 0.3654...
        assert_eq!(
            position_size_for_instrument(10_000.0, 1.0, 30.0, "USD_JPY").unwrap(),
            0.37
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            calculate_position_size(0.0, 1.0, 20.0, 10.0),
            Err(FxError::NonPositive { name: "account_equity", .. })
        ));
        assert!(matches!(
            calculate_position_size(10_000.0, 0.0, 20.0, 10.0),
            Err(FxError::RiskPercentOutOfRange(_))
        ));
        assert!(matches!(
            calculate_position_size(10_000.0, 101.0, 20.0, 10.0),
            Err(FxError::RiskPercentOutOfRange(_))
        ));
        assert!(matches!(
            calculate_position_size(10_000.0, 1.0, -5.0, 10.0),
            Err(FxError::NonPositive { name: "stop_loss_pips", .. })
        ));
        assert!(calculate_position_size(10_000.0, 100.0, 20.0, 10.0).is_ok());
    }

    #[test]
    fn test_pip_conversions() {
        assert_eq!(price_to_pips(0.002, "EUR_USD").unwrap(), 20.0);
        assert_eq!(pips_to_price(20.0, "EUR_USD").unwrap(), 0.002);
        assert_relative_eq!(pips_to_price(20.0, "USD_JPY").unwrap(), 0.2);
        assert_relative_eq!(price_to_pips(0.2, "EUR_JPY").unwrap(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(pip_size("GBP_USD").unwrap(), 0.0001);
    }

    #[test]
    fn test_unknown_instrument() {
        assert!(matches!(
            pip_value("XAU_USD"),
            Err(FxError::UnknownInstrument(_))
        ));
        assert!(pips_to_price(10.0, "BTC_USD").is_err());
        assert_eq!(pip_value("USD_CHF").unwrap(), 10.15);
        assert_eq!(supported_instruments().len(), 9);
    }

    #[test]
    fn test_units_for_risk() {
        // 1% of 10k is 100; a 0.0050 stop gives 20k units
        assert_eq!(units_for_risk(10_000.0, 1.0, 0.005).unwrap(), 20_000);
        // floors partial units
        assert_eq!(units_for_risk(10_000.0, 1.0, 0.0033).unwrap(), 30_303);
        assert!(units_for_risk(10_000.0, 1.0, 0.0).is_err());
        assert_eq!(lots_to_units(0.5), 50_000);
    }

    #[test]
    fn test_order_plan() {
        let buy = Signal {
            side: Side::Buy,
            entry_price: 1.2500,
            stop_distance: 0.0050,
        };
        let plan = OrderPlan::from_signal(&buy, 20_000, 2.0);
        assert_eq!(plan.units, 20_000);
        assert_relative_eq!(plan.stop_loss, 1.2450);
        assert_relative_eq!(plan.take_profit, 1.2600);

        let sell = Signal {
            side: Side::Sell,
            ..buy
        };
        let plan = OrderPlan::from_signal(&sell, 20_000, 2.0);
        assert_eq!(plan.units, -20_000);
        assert_relative_eq!(plan.stop_loss, 1.2550);
        assert_relative_eq!(plan.take_profit, 1.2400);
    }

    #[test]
    fn test_plan_order() {
        let signal = Signal {
            side: Side::Sell,
            entry_price: 1.2700,
            stop_distance: 0.0100,
        };
        let plan = plan_order(&signal, 25_000.0, 1.0, 2.0).unwrap();
        assert_eq!(plan.units, -25_000);
        assert_relative_eq!(plan.take_profit, 1.2500);

        assert!(plan_order(&signal, -1.0, 1.0, 2.0).is_err());
    }
}
