//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for API credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FxError, FxResult};

/// Environment variable overriding the selected environment's API token
pub const TOKEN_ENV_VAR: &str = "OANDA_API_TOKEN";

/// Environment variable overriding the selected environment's account id
pub const ACCOUNT_ENV_VAR: &str = "OANDA_ACCOUNT_ID";

const PLACEHOLDER_MARKER: &str = "YOUR_";

/// Broker environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Practice,
    Live,
}

impl Environment {
    pub fn from_live_flag(live: bool) -> Self {
        if live {
            Environment::Live
        } else {
            Environment::Practice
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Practice => write!(f, "practice"),
            Environment::Live => write!(f, "live"),
        }
    }
}

impl FromStr for Environment {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "practice" => Ok(Environment::Practice),
            "live" => Ok(Environment::Live),
            _ => Err(FxError::Config(format!(
                "environment must be 'practice' or 'live', got '{}'",
                s
            ))),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub practice: Option<AccountCredentials>,
    #[serde(default)]
    pub live: Option<AccountCredentials>,
    #[serde(default)]
    pub settings: ApiSettings,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default = "default_strategy_name")]
    pub strategy_name: String,
    /// Detector parameters, interpreted by the detector named in `strategy_name`
    #[serde(default = "empty_object")]
    pub strategy: serde_json::Value,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_strategy_name() -> String {
    "donchian_breakout".to_string()
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> FxResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            FxError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> FxResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| FxError::Config(format!("failed to parse config JSON: {}", e)))
    }

    /// Validated credentials for the given environment.
    ///
    /// `OANDA_API_TOKEN` / `OANDA_ACCOUNT_ID` override this environment's
    /// section only; the other environment is left untouched.
    pub fn credentials(&self, environment: Environment) -> FxResult<AccountCredentials> {
        let token = std::env::var(TOKEN_ENV_VAR).ok();
        let account = std::env::var(ACCOUNT_ENV_VAR).ok();
        self.resolve_credentials(environment, token, account)
    }

    fn resolve_credentials(
        &self,
        environment: Environment,
        token: Option<String>,
        account: Option<String>,
    ) -> FxResult<AccountCredentials> {
        let section = match environment {
            Environment::Practice => self.practice.as_ref(),
            Environment::Live => self.live.as_ref(),
        };

        let mut creds = match section {
            Some(creds) => creds.clone(),
            None if token.is_some() || account.is_some() => AccountCredentials::default(),
            None => {
                return Err(FxError::Config(format!(
                    "missing '{}' section with api_token and account_id",
                    environment
                )))
            }
        };

        if let Some(t) = token {
            creds.api_token = t;
        }
        if let Some(a) = account {
            creds.account_id = a;
        }

        creds.validate()?;
        Ok(creds)
    }

    pub fn base_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Practice => &self.settings.base_url_practice,
            Environment::Live => &self.settings.base_url_live,
        }
    }
}

/// API token and account id for one environment
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AccountCredentials {
    pub api_token: String,
    pub account_id: String,
}

impl AccountCredentials {
    pub fn validate(&self) -> FxResult<()> {
        if self.api_token.trim().is_empty() || self.account_id.trim().is_empty() {
            return Err(FxError::Config(
                "api_token and account_id must both be set".to_string(),
            ));
        }
        if self.api_token.contains(PLACEHOLDER_MARKER) || self.account_id.contains(PLACEHOLDER_MARKER)
        {
            return Err(FxError::Config(
                "credentials appear to be placeholders; fill in your actual OANDA token and account id"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// Keep the token out of logs
impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("api_token", &"***")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Endpoint and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url_practice: String,
    pub base_url_live: String,
    pub timeout_secs: u64,
    /// Delay between paginated candle requests
    pub request_delay_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url_practice: "https://api-fxpractice.oanda.com".to_string(),
            base_url_live: "https://api-fxtrade.oanda.com".to_string(),
            timeout_secs: 30,
            request_delay_ms: 10,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Daily job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub instrument: String,
    /// Percent of account balance risked per trade (1.0 = 1%)
    pub risk_percent: f64,
    /// Days of daily candles fetched for signal detection
    pub lookback_days: i64,
    /// Minimum complete candles required before detecting
    pub min_candles: usize,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            instrument: "GBP_USD".to_string(),
            risk_percent: 1.0,
            lookback_days: 90,
            min_candles: 50,
        }
    }
}

/// Dataset storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: "data/historical".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "practice": { "api_token": "abc-123", "account_id": "101-004-1" },
        "live": { "api_token": "YOUR_API_TOKEN", "account_id": "YOUR_ACCOUNT_ID" },
        "trading": { "instrument": "EUR_USD", "risk_percent": 0.5 },
        "strategy": { "channel_period": 20 }
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = Config::from_json(SAMPLE).unwrap();

        assert_eq!(config.trading.instrument, "EUR_USD");
        assert_eq!(config.trading.risk_percent, 0.5);
        assert_eq!(config.trading.lookback_days, 90);
        assert_eq!(config.strategy_name, "donchian_breakout");
        assert_eq!(config.storage.data_dir, "data/historical");
        assert_eq!(config.settings.timeout_secs, 30);
        assert_eq!(
            config.base_url(Environment::Live),
            "https://api-fxtrade.oanda.com"
        );
    }

    #[test]
    fn test_credentials_validation() {
        let config = Config::from_json(SAMPLE).unwrap();

        let practice = config
            .resolve_credentials(Environment::Practice, None, None)
            .unwrap();
        assert_eq!(practice.account_id, "101-004-1");

        let err = config
            .resolve_credentials(Environment::Live, None, None)
            .unwrap_err();
        assert!(err.to_string().contains("placeholders"));
    }

    #[test]
    fn test_missing_section() {
        let config = Config::from_json("{}").unwrap();
        let err = config
            .resolve_credentials(Environment::Practice, None, None)
            .unwrap_err();
        assert!(matches!(err, FxError::Config(_)));
    }

    #[test]
    fn test_overrides_apply_to_selected_environment() {
        let config = Config::from_json(SAMPLE).unwrap();

        let live = config
            .resolve_credentials(
                Environment::Live,
                Some("env-token".to_string()),
                Some("202-1".to_string()),
            )
            .unwrap();
        assert_eq!(live.api_token, "env-token");
        assert_eq!(live.account_id, "202-1");

        // token only: the practice account id from the file is kept
        let practice = config
            .resolve_credentials(Environment::Practice, Some("env-token".to_string()), None)
            .unwrap();
        assert_eq!(practice.api_token, "env-token");
        assert_eq!(practice.account_id, "101-004-1");

        // the loaded file itself is not modified
        assert_eq!(config.live.as_ref().unwrap().api_token, "YOUR_API_TOKEN");
    }

    #[test]
    fn test_overrides_without_section() {
        let config = Config::from_json("{}").unwrap();

        let creds = config
            .resolve_credentials(
                Environment::Practice,
                Some("env-token".to_string()),
                Some("101-1".to_string()),
            )
            .unwrap();
        assert_eq!(creds.account_id, "101-1");
        assert!(config.practice.is_none());
        assert!(config
            .resolve_credentials(Environment::Practice, Some("env-token".to_string()), None)
            .is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(FxError::Config(_))
        ));
    }

    #[test]
    fn test_debug_hides_token() {
        let creds = AccountCredentials {
            api_token: "secret".to_string(),
            account_id: "1".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("LIVE".parse::<Environment>().unwrap(), Environment::Live);
        assert!("demo".parse::<Environment>().is_err());
        assert_eq!(Environment::from_live_flag(false), Environment::Practice);
    }
}
