//! Blocking OANDA v20 REST client
//!
//! Covers the endpoints the toolkit needs: account summary, tradeable
//! instruments, candles, open positions, market orders with attached
//! stop-loss/take-profit, and closing a position.
//!
//! # Example
//! ```no_run
//! use fx_strategies::config::{Config, Environment};
//! use fx_strategies::oanda::OandaClient;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("configs/oanda.json")?;
//!     let client = OandaClient::new(&config, Environment::Practice)?;
//!     let account = client.account_summary()?;
//!     println!("Balance: {} {}", account.balance, account.currency);
//!     Ok(())
//! }
//! ```
//!
//! Every call is a single attempt. Transport failures and non-2xx
//! responses are returned to the caller unchanged.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::types::*;
use crate::config::{AccountCredentials, Config, Environment};
use crate::data::{CandleApi, CandleQuery};
use crate::error::{FxError, FxResult};
use crate::Candle;

/// OANDA REST client bound to one account
#[derive(Debug, Clone)]
pub struct OandaClient {
    http: Client,
    base_url: String,
    account_id: String,
    environment: Environment,
}

impl OandaClient {
    /// Create a client for the given environment from configuration
    pub fn new(config: &Config, environment: Environment) -> FxResult<Self> {
        let credentials = config.credentials(environment)?;
        let client = Self::with_credentials(
            config.base_url(environment),
            &credentials,
            config.settings.timeout(),
            environment,
        )?;
        info!("OANDA client initialized for {} environment", environment);
        Ok(client)
    }

    /// Create a client against an explicit base URL
    pub fn with_credentials(
        base_url: &str,
        credentials: &AccountCredentials,
        timeout: Duration,
        environment: Environment,
    ) -> FxResult<Self> {
        credentials.validate()?;

        let http = Client::builder()
            .default_headers(default_headers(&credentials.api_token)?)
            .timeout(timeout)
            .build()?;

        Ok(OandaClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: credentials.account_id.clone(),
            environment,
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn account_endpoint(&self, suffix: &str) -> String {
        format!("/v3/accounts/{}{}", self.account_id, suffix)
    }

    /// Send a request and decode the JSON body
    fn send<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> FxResult<T> {
        let response = request.send().map_err(|e| {
            error!("Request error on {}: {}", endpoint, e);
            FxError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!("HTTP error {} on {}: {}", status, endpoint, body);
            return Err(FxError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| {
            FxError::no_data(format!("malformed response from {}: {}", endpoint, e))
        })
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> FxResult<T> {
        debug!("GET {} {:?}", endpoint, query);
        let request = self.http.get(self.url(endpoint)).query(query);
        self.send(endpoint, request)
    }

    // =========================================================================
    // Account
    // =========================================================================

    pub fn account_summary(&self) -> FxResult<AccountSummary> {
        let resp: AccountResponse = self.get(&self.account_endpoint(""), &[])?;
        Ok(resp.account)
    }

    /// Fetch the account once and log its currency and balance
    pub fn validate_connection(&self) -> FxResult<AccountSummary> {
        let account = self.account_summary()?;
        info!(
            account = %account.id,
            currency = %account.currency,
            balance = %account.balance,
            "Connection validated"
        );
        Ok(account)
    }

    // =========================================================================
    // Instruments and candles
    // =========================================================================

    pub fn instruments(&self) -> FxResult<Vec<InstrumentInfo>> {
        let resp: InstrumentsResponse = self.get(&self.account_endpoint("/instruments"), &[])?;
        info!("Retrieved {} available instruments", resp.instruments.len());
        Ok(resp.instruments)
    }

    pub fn instrument_details(&self, instrument: &str) -> FxResult<InstrumentInfo> {
        self.instruments()?
            .into_iter()
            .find(|i| i.name == instrument)
            .ok_or_else(|| FxError::UnknownInstrument(instrument.to_string()))
    }

    /// Raw candle records for one window
    pub fn candles(&self, instrument: &str, query: &CandleQuery) -> FxResult<Vec<OandaCandle>> {
        let endpoint = format!("/v3/instruments/{}/candles", instrument);
        let params = [
            ("granularity", query.granularity.code().to_string()),
            ("from", format_time(query.from)),
            ("to", format_time(query.to)),
            ("price", query.price_side.code().to_string()),
        ];
        let resp: CandlesResponse = self.get(&endpoint, &params)?;
        Ok(resp.candles)
    }

    // =========================================================================
    // Positions and orders
    // =========================================================================

    pub fn open_positions(&self) -> FxResult<Vec<OpenPosition>> {
        let resp: OpenPositionsResponse = self.get(&self.account_endpoint("/openPositions"), &[])?;
        resp.positions
            .into_iter()
            .map(|p| OpenPosition::try_from(p).map_err(FxError::NoData))
            .collect()
    }

    pub fn open_position(&self, instrument: &str) -> FxResult<Option<OpenPosition>> {
        Ok(self
            .open_positions()?
            .into_iter()
            .find(|p| p.instrument == instrument && !p.is_flat()))
    }

    /// Place a fill-or-kill market order with stop-loss and take-profit attached.
    ///
    /// `units` is signed: positive buys, negative sells.
    pub fn place_market_order(
        &self,
        instrument: &str,
        units: i64,
        stop_loss: f64,
        take_profit: f64,
    ) -> FxResult<OrderResponse> {
        let endpoint = self.account_endpoint("/orders");
        let body = OrderEnvelope {
            order: MarketOrder::new(instrument, units, stop_loss, take_profit),
        };
        let request = self.http.post(self.url(&endpoint)).json(&body);
        let resp: OrderResponse = self.send(&endpoint, request)?;

        if let Some(cancel) = &resp.order_cancel_transaction {
            warn!(
                "Market order for {} cancelled: {}",
                instrument,
                cancel.reason.as_deref().unwrap_or("no reason given")
            );
        } else {
            info!("Market order placed: {} {} units", instrument, units);
        }
        Ok(resp)
    }

    /// Close every open side of a position
    pub fn close_position(&self, position: &OpenPosition) -> FxResult<ClosePositionResponse> {
        let endpoint = self.account_endpoint(&format!("/positions/{}/close", position.instrument));
        let body = ClosePositionRequest::all_for(position);
        let request = self.http.put(self.url(&endpoint)).json(&body);
        let resp = self.send(&endpoint, request)?;
        info!("Position closed: {}", position.instrument);
        Ok(resp)
    }
}

impl CandleApi for OandaClient {
    fn tradeable_instruments(&self) -> FxResult<Vec<String>> {
        Ok(self.instruments()?.into_iter().map(|i| i.name).collect())
    }

    fn fetch_candles(&self, instrument: &str, query: &CandleQuery) -> FxResult<Vec<Candle>> {
        let raw = self.candles(instrument, query)?;
        debug!("{} {} records received", instrument, raw.len());
        candles_from_records(&raw, query.price_side)
    }
}

fn default_headers(token: &str) -> FxResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| FxError::Config("api_token contains invalid characters".to_string()))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        "Accept-Datetime-Format",
        HeaderValue::from_static("RFC3339"),
    );
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> AccountCredentials {
        AccountCredentials {
            api_token: "token-abc".to_string(),
            account_id: "101-004-1234567-001".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = OandaClient::with_credentials(
            "https://api-fxpractice.oanda.com/",
            &credentials(),
            Duration::from_secs(30),
            Environment::Practice,
        )
        .unwrap();

        assert_eq!(client.account_id(), "101-004-1234567-001");
        assert_eq!(
            client.url(&client.account_endpoint("/openPositions")),
            "https://api-fxpractice.oanda.com/v3/accounts/101-004-1234567-001/openPositions"
        );
    }

    #[test]
    fn test_placeholder_credentials_rejected() {
        let creds = AccountCredentials {
            api_token: "YOUR_API_TOKEN".to_string(),
            account_id: "1".to_string(),
        };
        let err = OandaClient::with_credentials(
            "https://api-fxpractice.oanda.com",
            &creds,
            Duration::from_secs(30),
            Environment::Practice,
        )
        .unwrap_err();
        assert!(matches!(err, FxError::Config(_)));
    }

    #[test]
    fn test_default_headers() {
        let headers = default_headers("token-abc").unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer token-abc");
        assert_eq!(headers["Accept-Datetime-Format"], "RFC3339");

        assert!(default_headers("bad\ntoken").is_err());
    }
}
