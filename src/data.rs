//! Historical candle retrieval
//!
//! The upstream candle endpoint returns at most [`MAX_CANDLES_PER_REQUEST`]
//! bars per call. [`HistoryFetcher`] walks a date range page by page,
//! advancing past the last bar of each page, and assembles a single
//! ascending, de-duplicated series.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::thread::sleep;
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

use crate::error::{FxError, FxResult};
use crate::{Candle, Granularity, PriceSide};

// =============================================================================
// Constants
// =============================================================================

/// Upper bound the candle endpoint accepts for one request
pub const MAX_CANDLES_PER_REQUEST: usize = 5000;

/// Pause between paginated requests
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 10;

// =============================================================================
// Upstream seam
// =============================================================================

/// One candle request window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleQuery {
    pub granularity: Granularity,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub price_side: PriceSide,
}

/// Source of candles and tradeable instruments.
///
/// Implemented by the broker client; tests substitute an in-memory source.
pub trait CandleApi {
    /// Names of the instruments the account can trade
    fn tradeable_instruments(&self) -> FxResult<Vec<String>>;

    /// At most [`MAX_CANDLES_PER_REQUEST`] candles inside the query window
    fn fetch_candles(&self, instrument: &str, query: &CandleQuery) -> FxResult<Vec<Candle>>;
}

impl<T: CandleApi + ?Sized> CandleApi for &T {
    fn tradeable_instruments(&self) -> FxResult<Vec<String>> {
        (**self).tradeable_instruments()
    }

    fn fetch_candles(&self, instrument: &str, query: &CandleQuery) -> FxResult<Vec<Candle>> {
        (**self).fetch_candles(instrument, query)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Position of the pagination loop inside `[from, to]`
#[derive(Debug, Clone, Copy)]
struct PageCursor {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    bar: Duration,
}

impl PageCursor {
    fn start(from: DateTime<Utc>, to: DateTime<Utc>, granularity: Granularity) -> Option<Self> {
        (from < to).then_some(PageCursor {
            from,
            to,
            bar: granularity.duration(),
        })
    }

    /// End of the next request window, clamped to `to`
    fn chunk_end(&self) -> DateTime<Utc> {
        let span = self.bar * MAX_CANDLES_PER_REQUEST as i32;
        self.from
            .checked_add_signed(span)
            .map_or(self.to, |end| end.min(self.to))
    }

    /// Cursor for the following page, or `None` when pagination is done
    fn advance(self, page: &[Candle], chunk_end: DateTime<Utc>) -> Option<Self> {
        let last = page.last()?;
        let next = last.time + self.bar;

        if next >= self.to {
            return None;
        }
        if page.len() < MAX_CANDLES_PER_REQUEST && chunk_end >= self.to {
            return None;
        }
        if next <= self.from {
            warn!(
                "Page ending at {} does not advance past {}, stopping",
                last.time, self.from
            );
            return None;
        }

        Some(PageCursor { from: next, ..self })
    }
}

// =============================================================================
// History Fetcher
// =============================================================================

/// Paginated historical data retrieval over a [`CandleApi`]
pub struct HistoryFetcher<A> {
    api: A,
    request_delay: StdDuration,
}

impl<A: CandleApi> HistoryFetcher<A> {
    pub fn new(api: A) -> Self {
        Self::with_delay(api, StdDuration::from_millis(DEFAULT_REQUEST_DELAY_MS))
    }

    pub fn with_delay(api: A, request_delay: StdDuration) -> Self {
        HistoryFetcher { api, request_delay }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch every candle of `instrument` in `[from, to]`.
    ///
    /// The result is sorted by time with one candle per timestamp; when two
    /// pages return the same timestamp the later page wins. Any upstream
    /// error aborts the fetch and nothing is returned.
    pub fn fetch(
        &self,
        instrument: &str,
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        price_side: PriceSide,
    ) -> FxResult<Vec<Candle>> {
        if from > to {
            return Err(FxError::InvalidRange {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }
        self.ensure_tradeable(instrument)?;

        info!(
            "Fetching {} {} candles from {} to {}",
            instrument,
            granularity,
            from.format("%Y-%m-%d %H:%M"),
            to.format("%Y-%m-%d %H:%M")
        );

        let mut merged: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
        let mut cursor = PageCursor::start(from, to, granularity);
        let mut requests = 0usize;

        while let Some(page_cursor) = cursor {
            if requests > 0 && !self.request_delay.is_zero() {
                sleep(self.request_delay);
            }

            let chunk_end = page_cursor.chunk_end();
            let query = CandleQuery {
                granularity,
                from: page_cursor.from,
                to: chunk_end,
                price_side,
            };
            let page = self.api.fetch_candles(instrument, &query)?;
            requests += 1;

            debug!(
                "Page {}: {} candles in [{}, {})",
                requests,
                page.len(),
                query.from,
                query.to
            );

            cursor = page_cursor.advance(&page, chunk_end);
            for candle in page {
                merged.insert(candle.time, candle);
            }
        }

        let candles: Vec<Candle> = merged
            .into_values()
            .filter(|c| c.time >= from && c.time <= to)
            .collect();

        info!(
            "Fetched {} {} candles in {} request(s)",
            candles.len(),
            instrument,
            requests
        );

        Ok(candles)
    }

    /// Fetch several instruments, skipping the ones that fail.
    ///
    /// Failures are logged with their error kind; the returned map only
    /// holds instruments that were fetched successfully.
    pub fn fetch_multiple(
        &self,
        instruments: &[String],
        granularity: Granularity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        price_side: PriceSide,
    ) -> BTreeMap<String, Vec<Candle>> {
        let mut results = BTreeMap::new();

        for instrument in instruments {
            match self.fetch(instrument, granularity, from, to, price_side) {
                Ok(candles) => {
                    results.insert(instrument.clone(), candles);
                }
                Err(e) => {
                    warn!(kind = ?e.kind(), "Skipping {}: {}", instrument, e);
                }
            }
        }

        info!(
            "Fetched {}/{} instruments",
            results.len(),
            instruments.len()
        );
        results
    }

    fn ensure_tradeable(&self, instrument: &str) -> FxResult<()> {
        let available = self.api.tradeable_instruments()?;
        if available.iter().any(|name| name == instrument) {
            Ok(())
        } else {
            Err(FxError::UnknownInstrument(instrument.to_string()))
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or an RFC 3339 timestamp as UTC
pub fn parse_date(s: &str) -> FxResult<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ndt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
        .ok_or_else(|| FxError::InvalidDate(s.to_string()))
}

/// Drop bars whose interval has not finished yet
pub fn complete_only(series: Vec<Candle>) -> Vec<Candle> {
    series.into_iter().filter(|c| c.complete).collect()
}

// =============================================================================
// Tests
// =============================================================================
