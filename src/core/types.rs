//! Core types - Strong typing for safety

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::core::{Error, Result, TradingPair};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Lowercase wire form used by venues and the ledger messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(Error::Validation(format!(
                "side must be 'buy' or 'sell', got {other:?}"
            ))),
        }
    }
}

/// Order type. Only immediate orders exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

/// Validated order request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OrderFields")]
pub struct OrderRequest {
    pub pair: TradingPair,
    pub side: Side,
    pub volume: Decimal,
    /// `None` means a market order
    pub price: Option<Decimal>,
}

#[derive(Deserialize)]
struct OrderFields {
    pair: TradingPair,
    side: Side,
    volume: Decimal,
    #[serde(default)]
    price: Option<Decimal>,
}

impl TryFrom<OrderFields> for OrderRequest {
    type Error = Error;

    fn try_from(fields: OrderFields) -> Result<Self> {
        Self::new(fields.pair, fields.side, fields.volume, fields.price)
    }
}

impl OrderRequest {
    pub fn new(pair: TradingPair, side: Side, volume: Decimal, price: Option<Decimal>) -> Result<Self> {
        if volume <= Decimal::ZERO {
            return Err(Error::Validation(format!("volume must be positive, got {volume}")));
        }
        if let Some(p) = price {
            if p <= Decimal::ZERO {
                return Err(Error::Validation(format!("limit price must be positive, got {p}")));
            }
        }
        Ok(Self { pair, side, volume, price })
    }

    pub fn market(pair: TradingPair, side: Side, volume: Decimal) -> Result<Self> {
        Self::new(pair, side, volume, None)
    }

    pub fn order_type(&self) -> OrderType {
        match self.price {
            Some(_) => OrderType::Limit,
            None => OrderType::Market,
        }
    }

    /// Audit snapshot of the request, embedded in [`OrderResult::raw`].
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "pair": self.pair.to_string(),
            "side": self.side.as_str(),
            "ordertype": self.order_type().as_str(),
            "volume": self.volume.normalize().to_string(),
            "price": self.price.map(|p| p.normalize().to_string()),
        })
    }
}

/// Outcome of `place_order` on any venue.
///
/// Built only through [`OrderResult::executed`] and [`OrderResult::not_sent`],
/// so an unexecuted result never carries an order id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderResult {
    order_id: Option<String>,
    executed: bool,
    message: String,
    raw: Map<String, Value>,
}

impl OrderResult {
    pub fn executed(order_id: Option<String>, message: impl Into<String>, raw: Map<String, Value>) -> Self {
        Self {
            order_id,
            executed: true,
            message: message.into(),
            raw,
        }
    }

    /// Recorded but not sent (dry-run)
    pub fn not_sent(message: impl Into<String>, raw: Map<String, Value>) -> Self {
        Self {
            order_id: None,
            executed: false,
            message: message.into(),
            raw,
        }
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

/// `{"request": request}`, the raw payload of a dry-run result
pub fn request_snapshot(request: Value) -> Map<String, Value> {
    let mut raw = Map::new();
    raw.insert("request".to_string(), request);
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc_usd() -> TradingPair {
        TradingPair::new("BTC", "USD").unwrap()
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(" SELL ".parse::<Side>().unwrap(), Side::Sell);
        assert!(matches!("hold".parse::<Side>(), Err(Error::Validation(_))));
        assert!(matches!("".parse::<Side>(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_order_request_validation() {
        assert!(matches!(
            OrderRequest::market(btc_usd(), Side::Buy, Decimal::ZERO),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            OrderRequest::new(btc_usd(), Side::Buy, Decimal::ONE, Some(Decimal::NEGATIVE_ONE)),
            Err(Error::Validation(_))
        ));

        let limit = OrderRequest::new(btc_usd(), Side::Sell, Decimal::ONE, Some(Decimal::from(100))).unwrap();
        assert_eq!(limit.order_type(), OrderType::Limit);
    }

    #[test]
    fn test_order_request_deserialize_validates() {
        let json = r#"{"pair":{"base":"btc","quote":"usd"},"side":"buy","volume":0.5}"#;
        let order: OrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(order.pair, btc_usd());
        assert_eq!(order.order_type(), OrderType::Market);

        let negative = r#"{"pair":{"base":"BTC","quote":"USD"},"side":"sell","volume":-5.0}"#;
        assert!(serde_json::from_str::<OrderRequest>(negative).is_err());

        let bad_price = r#"{"pair":{"base":"BTC","quote":"USD"},"side":"buy","volume":1,"price":0}"#;
        assert!(serde_json::from_str::<OrderRequest>(bad_price).is_err());
    }

    #[test]
    fn test_order_result_serializes_uniformly() {
        let request = OrderRequest::market(btc_usd(), Side::Buy, Decimal::new(1, 1)).unwrap();
        let result = OrderResult::not_sent("dry", request_snapshot(request.to_value()));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["order_id"], Value::Null);
        assert_eq!(json["executed"], Value::Bool(false));
        assert_eq!(json["message"], "dry");
        assert_eq!(json["raw"]["request"]["pair"], "BTC/USD");
        assert_eq!(json["raw"]["request"]["volume"], "0.1");
        assert_eq!(json["raw"]["request"]["ordertype"], "market");
    }
}
