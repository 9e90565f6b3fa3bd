//! OANDA v20 wire types for candles, accounts, positions and orders
//!
//! Prices and balances arrive as JSON strings; money values deserialize into
//! `Decimal`, candle prices are parsed into `f64` on conversion.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::{FxError, FxResult};
use crate::{Candle, CandleValidationError, PriceSide};

/// Upstream time format for `from`/`to` query parameters
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000000000Z";

/// Format a timestamp the way the candles endpoint expects it
pub fn format_time(time: DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

// =============================================================================
// Candles
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CandlesResponse {
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub candles: Vec<OandaCandle>,
}

/// Open/high/low/close block for one price side
#[derive(Debug, Clone, Deserialize)]
pub struct PriceData {
    pub o: String,
    pub h: String,
    pub l: String,
    pub c: String,
}

/// Raw candle record as returned by the candles endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct OandaCandle {
    pub time: String,
    pub volume: u64,
    pub complete: bool,
    #[serde(default)]
    pub mid: Option<PriceData>,
    #[serde(default)]
    pub bid: Option<PriceData>,
    #[serde(default)]
    pub ask: Option<PriceData>,
}

/// Why an upstream candle record could not be turned into a [`Candle`]
#[derive(Debug, Error)]
pub enum CandleConversionError {
    #[error("no price data in record at {0}")]
    MissingPrice(String),

    #[error("unparsable time '{0}'")]
    BadTime(String),

    #[error("unparsable price '{0}'")]
    BadPrice(String),

    #[error(transparent)]
    Invalid(#[from] CandleValidationError),
}

impl OandaCandle {
    /// Price block for the requested side, falling back to mid, bid, then ask
    pub fn price_for(&self, side: PriceSide) -> Option<&PriceData> {
        let preferred = match side {
            PriceSide::Mid => self.mid.as_ref(),
            PriceSide::Bid => self.bid.as_ref(),
            PriceSide::Ask => self.ask.as_ref(),
        };
        preferred
            .or(self.mid.as_ref())
            .or(self.bid.as_ref())
            .or(self.ask.as_ref())
    }

    pub fn to_candle(&self, side: PriceSide) -> Result<Candle, CandleConversionError> {
        let price = self
            .price_for(side)
            .ok_or_else(|| CandleConversionError::MissingPrice(self.time.clone()))?;

        let time = DateTime::parse_from_rfc3339(&self.time)
            .map_err(|_| CandleConversionError::BadTime(self.time.clone()))?
            .with_timezone(&Utc);

        Ok(Candle::new(
            time,
            parse_price(&price.o)?,
            parse_price(&price.h)?,
            parse_price(&price.l)?,
            parse_price(&price.c)?,
            self.volume,
            self.complete,
        )?)
    }
}

fn parse_price(raw: &str) -> Result<f64, CandleConversionError> {
    raw.trim()
        .parse()
        .map_err(|_| CandleConversionError::BadPrice(raw.to_string()))
}

/// Convert one page of upstream records, skipping unusable ones.
///
/// A non-empty page where no record converts is an error: pagination
/// advances on the last returned bar, so it must not look like an empty page.
pub fn candles_from_records(records: &[OandaCandle], side: PriceSide) -> FxResult<Vec<Candle>> {
    let mut candles = Vec::with_capacity(records.len());

    for record in records {
        match record.to_candle(side) {
            Ok(candle) => candles.push(candle),
            Err(e) => warn!("Skipping candle at {}: {}", record.time, e),
        }
    }

    if candles.is_empty() && !records.is_empty() {
        return Err(FxError::no_data(format!(
            "none of {} candle records could be parsed",
            records.len()
        )));
    }

    Ok(candles)
}

// =============================================================================
// Account and instruments
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub account: AccountSummary,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub currency: String,
    pub balance: Decimal,
    #[serde(rename = "NAV", default)]
    pub nav: Option<Decimal>,
    #[serde(rename = "unrealizedPL", default)]
    pub unrealized_pl: Option<Decimal>,
    #[serde(default)]
    pub open_position_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentsResponse {
    pub instruments: Vec<InstrumentInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pip_location: Option<i32>,
}

// =============================================================================
// Positions
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OpenPositionsResponse {
    #[serde(default)]
    pub positions: Vec<PositionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionEntry {
    pub instrument: String,
    pub long: PositionSideEntry,
    pub short: PositionSideEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionSideEntry {
    pub units: String,
}

/// Net units held per side for one instrument (short units are negative)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPosition {
    pub instrument: String,
    pub long_units: i64,
    pub short_units: i64,
}

impl OpenPosition {
    pub fn is_flat(&self) -> bool {
        self.long_units == 0 && self.short_units == 0
    }
}

impl TryFrom<PositionEntry> for OpenPosition {
    type Error = String;

    fn try_from(entry: PositionEntry) -> Result<Self, Self::Error> {
        let parse = |raw: &str| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| format!("unparsable units '{}' for {}", raw, entry.instrument))
        };
        Ok(OpenPosition {
            long_units: parse(&entry.long.units)?,
            short_units: parse(&entry.short.units)?,
            instrument: entry.instrument.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePositionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_units: Option<String>,
}

impl ClosePositionRequest {
    /// Close every side that currently holds units
    pub fn all_for(position: &OpenPosition) -> Self {
        ClosePositionRequest {
            long_units: (position.long_units != 0).then(|| "ALL".to_string()),
            short_units: (position.short_units != 0).then(|| "ALL".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePositionResponse {
    #[serde(default)]
    pub long_order_fill_transaction: Option<Transaction>,
    #[serde(default)]
    pub short_order_fill_transaction: Option<Transaction>,
    #[serde(rename = "lastTransactionID", default)]
    pub last_transaction_id: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OrderEnvelope {
    pub order: MarketOrder,
}

/// Market order with stop-loss and take-profit attached on fill
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOrder {
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub instrument: String,
    /// Signed units as a string: positive buys, negative sells
    pub units: String,
    pub time_in_force: &'static str,
    pub stop_loss_on_fill: PriceOnFill,
    pub take_profit_on_fill: PriceOnFill,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOnFill {
    pub price: String,
    pub time_in_force: &'static str,
}

impl MarketOrder {
    pub fn new(instrument: &str, units: i64, stop_loss: f64, take_profit: f64) -> Self {
        MarketOrder {
            order_type: "MARKET",
            instrument: instrument.to_string(),
            units: units.to_string(),
            time_in_force: "FOK",
            stop_loss_on_fill: PriceOnFill {
                price: format!("{:.5}", stop_loss),
                time_in_force: "GTC",
            },
            take_profit_on_fill: PriceOnFill {
                price: format!("{:.5}", take_profit),
                time_in_force: "GTC",
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default)]
    pub order_create_transaction: Option<Transaction>,
    #[serde(default)]
    pub order_fill_transaction: Option<Transaction>,
    #[serde(default)]
    pub order_cancel_transaction: Option<Transaction>,
    #[serde(rename = "lastTransactionID", default)]
    pub last_transaction_id: Option<String>,
}

impl OrderResponse {
    pub fn is_filled(&self) -> bool {
        self.order_fill_transaction.is_some()
    }
}
