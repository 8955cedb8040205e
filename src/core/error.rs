//! Error handling - one hierarchy for every venue

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Tradebot error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Unparseable trading pair
    #[error("Format error: {0}")]
    Format(String),

    /// Bad side, volume or price
    #[error("Validation error: {0}")]
    Validation(String),

    /// Private call attempted without configured credentials
    #[error("Credentials missing: {0}")]
    CredentialsMissing(String),

    /// Application-level error reported by the venue. Never retried.
    #[error("Venue error: {0}")]
    Venue(String),

    /// Network failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Transient failures outlasted the retry bound
    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Well-formed response without a usable price
    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),

    /// Paper ledger pre-trade check failed
    #[error("Insufficient {asset} balance: required {required}, available {available}")]
    InsufficientFunds {
        asset: String,
        required: Decimal,
        available: Decimal,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl Error {
    /// Whether the retry policy may try the call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Http { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_failures_are_transient() {
        assert!(Error::Transport("connection reset".into()).is_transient());
        assert!(Error::Http { status: 502, body: String::new() }.is_transient());
        assert!(!Error::Venue("EOrder:Insufficient funds".into()).is_transient());
        assert!(!Error::CredentialsMissing("kraken".into()).is_transient());
        assert!(!Error::PriceUnavailable("no last trade".into()).is_transient());
    }
}
