//! Library error types
//!
//! Every fallible library operation returns [`FxError`]. Callers that loop
//! over several instruments use [`FxError::kind`] to decide whether to skip
//! an instrument or abort the whole run.

use thiserror::Error;

/// Coarse classification of an [`FxError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or placeholder configuration; fatal at startup
    Config,
    /// Bad input to an operation (instrument, granularity, date, number)
    Validation,
    /// HTTP failure or non-2xx upstream status
    Transport,
    /// Upstream or stored data that cannot be used
    Data,
    /// Local filesystem failure
    Io,
}

#[derive(Debug, Error)]
pub enum FxError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    #[error("unsupported price side: {0} (use M, B or A)")]
    UnsupportedPriceSide(String),

    #[error("invalid date '{0}': use YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339")]
    InvalidDate(String),

    #[error("invalid date range: from {from} is after to {to}")]
    InvalidRange { from: String, to: String },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("risk percent must be between 0 and 100, got {0}")]
    RiskPercentOutOfRange(f64),

    #[error("unknown strategy: '{name}'. Available: {available}")]
    UnknownStrategy { name: String, available: String },

    #[error("invalid strategy parameters: {0}")]
    InvalidStrategyParams(String),

    #[error("file already exists: {0} (pass overwrite or append instead)")]
    AlreadyExists(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("no usable data: {0}")]
    NoData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl FxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FxError::Config(_) => ErrorKind::Config,
            FxError::UnknownInstrument(_)
            | FxError::UnsupportedGranularity(_)
            | FxError::UnsupportedPriceSide(_)
            | FxError::InvalidDate(_)
            | FxError::InvalidRange { .. }
            | FxError::NonPositive { .. }
            | FxError::RiskPercentOutOfRange(_)
            | FxError::UnknownStrategy { .. }
            | FxError::InvalidStrategyParams(_)
            | FxError::AlreadyExists(_) => ErrorKind::Validation,
            FxError::Transport(_) | FxError::Upstream { .. } => ErrorKind::Transport,
            FxError::NoData(_) => ErrorKind::Data,
            FxError::Io(_) | FxError::Csv(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for the "no usable data" condition
    pub fn no_data(msg: impl Into<String>) -> Self {
        FxError::NoData(msg.into())
    }
}

pub type FxResult<T> = Result<T, FxError>;

/// Reject zero, negative and NaN inputs
pub fn ensure_positive(name: &'static str, value: f64) -> FxResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(FxError::NonPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FxError::UnknownInstrument("XAU_EUR".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            FxError::Upstream {
                status: 503,
                body: String::new()
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(FxError::no_data("empty").kind(), ErrorKind::Data);
        assert_eq!(FxError::Config("x".into()).kind(), ErrorKind::Config);
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("equity", 1.0).is_ok());
        assert!(ensure_positive("equity", 0.0).is_err());
        assert!(ensure_positive("equity", f64::NAN).is_err());

        let msg = ensure_positive("stop_loss_pips", -5.0).unwrap_err().to_string();
        assert_eq!(msg, "stop_loss_pips must be positive, got -5");
    }
}
