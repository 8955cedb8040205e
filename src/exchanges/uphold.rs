//! Uphold exchange implementation
//!
//! Public ticker only. Uphold trades go through card transactions, which this
//! adapter does not model: live orders fail with `NotImplemented`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::core::config::UpholdConfig;
use crate::core::{
    Config, Error, ExchangeClient, OrderRequest, OrderResult, Result, TradingPair, request_snapshot,
};
use crate::http::{HttpRequest, HttpResponse, ReqwestTransport, RetryConfig, Transport, with_retry};

/// Uphold adapter
pub struct Uphold {
    dry_run: bool,
    api_token: Option<String>,
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
}

impl Uphold {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(
            &config.uphold.base_url,
            Duration::from_secs(config.http.timeout_secs),
        )?;
        Ok(Self::with_transport(
            &config.uphold,
            config.dry_run,
            RetryConfig::from(&config.http),
            Arc::new(transport),
        ))
    }

    pub fn with_transport(
        config: &UpholdConfig,
        dry_run: bool,
        retry: RetryConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            dry_run,
            api_token: config.api_token.clone(),
            transport,
            retry,
        }
    }

    fn auth_header(&self) -> Result<String> {
        self.api_token
            .as_ref()
            .map(|token| format!("Bearer {token}"))
            .ok_or_else(|| Error::CredentialsMissing("Uphold API token missing".to_string()))
    }
}

#[async_trait]
impl ExchangeClient for Uphold {
    /// Mid of bid and ask; either side stands in for a missing other.
    async fn get_ticker_price(&self, pair: &TradingPair) -> Result<Decimal> {
        let request = HttpRequest::get(format!("/ticker/{}", pair.dashed()));
        let body = with_retry(&self.retry, &request.path, |_| {
            let transport = self.transport.clone();
            let request = request.clone();
            async move { check_response(transport.send(request).await?) }
        })
        .await?;

        // The endpoint answers with either one ticker or a list of them.
        static EMPTY: Value = Value::Null;
        let ticker = match &body {
            Value::Array(items) => items.first().unwrap_or(&EMPTY),
            other => other,
        };
        let field = |name: &str| decimal_field(ticker, name);

        let bid = field("bid").or_else(|| field("ask")).or_else(|| field("price"));
        let ask = field("ask").or_else(|| field("bid")).or_else(|| field("price"));
        match (bid, ask) {
            (Some(bid), Some(ask)) if bid > Decimal::ZERO && ask > Decimal::ZERO => {
                Ok((bid + ask) / Decimal::TWO)
            }
            _ => Err(Error::PriceUnavailable(format!("no bid/ask for {}", pair.dashed()))),
        }
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResult> {
        if self.dry_run {
            info!("DRY_RUN: would place Uphold {} {} {} @ {:?}", order.side, order.volume, order.pair, order.price);
            return Ok(OrderResult::not_sent(
                "DRY_RUN enabled - Uphold order not placed",
                request_snapshot(order.to_value()),
            ));
        }

        self.auth_header()?;
        Err(Error::NotImplemented("live Uphold order placement".to_string()))
    }

    fn name(&self) -> &str {
        "uphold"
    }
}

/// Uphold reports failures as `{"code": ..., "message": ...}`.
fn check_response(resp: HttpResponse) -> Result<Value> {
    let parsed = serde_json::from_str::<Value>(&resp.body);

    if let Ok(body) = &parsed {
        if let Some(code) = body.get("code").and_then(Value::as_str) {
            let message = body["message"].as_str().unwrap_or_default();
            return Err(Error::Venue(format!("Uphold error {code}: {message}")));
        }
    }
    if !resp.is_success() {
        return Err(Error::Http {
            status: resp.status,
            body: resp.body,
        });
    }
    Ok(parsed?)
}

fn decimal_field(value: &Value, name: &str) -> Option<Decimal> {
    match value.get(name)? {
        Value::String(s) if !s.is_empty() => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Side, normalize};
    use crate::http::transport::testing::ScriptedTransport;

    fn uphold(dry_run: bool, token: Option<&str>, transport: ScriptedTransport) -> (Uphold, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let config = UpholdConfig {
            api_token: token.map(str::to_string),
            ..UpholdConfig::default()
        };
        let uphold = Uphold::with_transport(&config, dry_run, RetryConfig::immediate(3), transport.clone());
        (uphold, transport)
    }

    #[tokio::test]
    async fn test_ticker_is_bid_ask_mid() {
        let (uphold, transport) = uphold(
            true,
            None,
            ScriptedTransport::new().respond(200, r#"{"ask":"30010.00","bid":"29990.00","currency":"USD"}"#),
        );

        let price = uphold.get_ticker_price(&normalize("btc/usd").unwrap()).await.unwrap();
        assert_eq!(price, Decimal::from(30000));
        assert_eq!(transport.requests()[0].path, "/ticker/BTC-USD");
    }

    #[tokio::test]
    async fn test_ticker_list_and_one_sided_quote() {
        let (uphold, _) = uphold(
            true,
            None,
            ScriptedTransport::new().respond(200, r#"[{"ask":"2.50","pair":"XRPUSD"}]"#),
        );

        let price = uphold.get_ticker_price(&normalize("XRP-USD").unwrap()).await.unwrap();
        assert_eq!(price, Decimal::new(250, 2));
    }

    #[tokio::test]
    async fn test_ticker_without_prices() {
        let (uphold, _) = uphold(true, None, ScriptedTransport::new().respond(200, r#"{"currency":"USD"}"#));

        let err = uphold.get_ticker_price(&normalize("BTC-USD").unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::PriceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_venue_error_not_retried() {
        let (uphold, transport) = uphold(
            true,
            None,
            ScriptedTransport::new().respond(404, r#"{"code":"not_found","message":"Not Found"}"#),
        );

        let err = uphold.get_ticker_price(&normalize("ZZZ-USD").unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::Venue(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_echoes_request() {
        let (uphold, transport) = uphold(true, None, ScriptedTransport::new());
        let order = OrderRequest::market(normalize("BTC-USD").unwrap(), Side::Buy, Decimal::ONE).unwrap();

        let result = uphold.place_order(&order).await.unwrap();
        assert!(!result.is_executed());
        assert!(result.order_id().is_none());
        assert_eq!(result.raw()["request"]["pair"], "BTC/USD");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_live_order_requires_token_then_is_unsupported() {
        let order = OrderRequest::market(normalize("BTC-USD").unwrap(), Side::Sell, Decimal::ONE).unwrap();

        let (no_token, _) = uphold(false, None, ScriptedTransport::new());
        assert!(matches!(no_token.place_order(&order).await, Err(Error::CredentialsMissing(_))));

        let (with_token, transport) = uphold(false, Some("token"), ScriptedTransport::new());
        assert!(matches!(with_token.place_order(&order).await, Err(Error::NotImplemented(_))));
        assert!(transport.requests().is_empty());
    }
}
