//! Trading pairs and the symbol normalizer
//!
//! Every venue speaks its own dialect (`BTC-USD`, `XBTUSD`, `btc usd`). Inside
//! the crate a pair is always a validated [`TradingPair`] whose canonical form
//! is `BASE/QUOTE`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::{Error, Result};

const MIN_CODE_LEN: usize = 2;
const MAX_CODE_LEN: usize = 5;

/// Ordered (base, quote) pair of uppercase asset codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PairFields")]
pub struct TradingPair {
    base: String,
    quote: String,
}

/// Unchecked wire shape; deserialization goes through [`TradingPair::new`].
#[derive(Deserialize)]
struct PairFields {
    base: String,
    quote: String,
}

impl TryFrom<PairFields> for TradingPair {
    type Error = Error;

    fn try_from(fields: PairFields) -> Result<Self> {
        Self::new(&fields.base, &fields.quote)
    }
}

impl TradingPair {
    pub fn new(base: &str, quote: &str) -> Result<Self> {
        let base = asset_code(base)?;
        let quote = asset_code(quote)?;
        if base == quote {
            return Err(Error::Format(format!("base and quote are both {base}")));
        }
        Ok(Self { base, quote })
    }

    /// Split a separator-less symbol such as `BTCUSDT` when the caller knows
    /// how long the quote code is. `normalize` never guesses this split.
    pub fn split_concatenated(raw: &str, quote_len: usize) -> Result<Self> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if quote_len >= compact.len() || !compact.is_ascii() {
            return Err(Error::Format(format!(
                "cannot split {raw:?} with a {quote_len}-character quote"
            )));
        }
        let (base, quote) = compact.split_at(compact.len() - quote_len);
        Self::new(base, quote)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// `BASEQUOTE`, the form many venues accept as a raw concatenation.
    pub fn compact(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// `BASE-QUOTE`
    pub fn dashed(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl std::fmt::Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        normalize(s)
    }
}

/// Canonicalize a free-form pair string into `BASE/QUOTE`.
///
/// Accepts `-`, `/` and whitespace as separators in any combination
/// (`BTC-USD`, `btc usd`, `BTC / USD`). Concatenated input like `BTCUSD` is a
/// [`Error::Format`]: use [`TradingPair::split_concatenated`] when the split is
/// known from context.
pub fn normalize(raw: &str) -> Result<TradingPair> {
    let tokens: Vec<&str> = raw
        .split(|c: char| c == '-' || c == '/' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    match tokens.as_slice() {
        [base, quote] => TradingPair::new(base, quote),
        [_] | [] => Err(Error::Format(format!(
            "{raw:?} does not contain a base and a quote"
        ))),
        _ => Err(Error::Format(format!("{raw:?} has more than two parts"))),
    }
}

fn asset_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid_len = (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len());
    if !valid_len || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::Format(format!("invalid asset code {raw:?}")));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_and_case_variants_agree() {
        let expected = TradingPair::new("BTC", "USD").unwrap();
        for raw in ["BTC-USD", "BTC/USD", "btc usd", " Btc / usd ", "btc-usd", "BTC\tUSD"] {
            let pair = normalize(raw).unwrap();
            assert_eq!(pair, expected, "input {raw:?}");
            assert_eq!(pair.to_string(), "BTC/USD");
        }
    }

    #[test]
    fn test_single_token_is_rejected() {
        assert!(matches!(normalize("BTCUSD"), Err(Error::Format(_))));
        assert!(matches!(normalize(""), Err(Error::Format(_))));
        assert!(matches!(normalize(" - / "), Err(Error::Format(_))));
    }

    #[test]
    fn test_bad_codes_are_rejected() {
        assert!(matches!(normalize("BTC/USD/EUR"), Err(Error::Format(_))));
        assert!(matches!(normalize("B/USD"), Err(Error::Format(_))));
        assert!(matches!(normalize("BITCOIN/USD"), Err(Error::Format(_))));
        assert!(matches!(normalize("BT$/USD"), Err(Error::Format(_))));
        assert!(matches!(normalize("usd-USD"), Err(Error::Format(_))));
        assert!(matches!(normalize("1INCH/USD"), Err(Error::Format(_))));
    }

    #[test]
    fn test_deserialize_validates() {
        let pair: TradingPair = serde_json::from_str(r#"{"base":"btc","quote":"usd"}"#).unwrap();
        assert_eq!(pair.to_string(), "BTC/USD");

        assert!(serde_json::from_str::<TradingPair>(r#"{"base":"btc","quote":"btc"}"#).is_err());
        assert!(serde_json::from_str::<TradingPair>(r#"{"base":"B","quote":"USD"}"#).is_err());
    }

    #[test]
    fn test_split_concatenated() {
        let pair = TradingPair::split_concatenated("ethusdt", 4).unwrap();
        assert_eq!(pair.base(), "ETH");
        assert_eq!(pair.quote(), "USDT");
        assert_eq!(pair.compact(), "ETHUSDT");
        assert_eq!(pair.dashed(), "ETH-USDT");
        assert!(TradingPair::split_concatenated("USD", 3).is_err());
    }

    #[test]
    fn test_from_str() {
        let pair: TradingPair = "sol-eur".parse().unwrap();
        assert_eq!(pair.to_string(), "SOL/EUR");
    }
}
