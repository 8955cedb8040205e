//! Kraken exchange implementation
//!
//! Public market data plus signed order placement. Kraken names instruments
//! its own way (`XBTUSD`, `XETHZUSD`), so canonical pairs are resolved through
//! the AssetPairs metadata and cached for the adapter's lifetime.

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::config::KrakenConfig;
use crate::core::{
    Config, Error, ExchangeClient, OrderRequest, OrderResult, Result, TradingPair, request_snapshot,
};
use crate::http::{HttpRequest, HttpResponse, ReqwestTransport, RetryConfig, Transport, with_retry};
use crate::signer::{KrakenSigner, NonceGenerator};

const ASSET_PAIRS_PATH: &str = "/0/public/AssetPairs";
const TICKER_PATH: &str = "/0/public/Ticker";
const PRIVATE_PREFIX: &str = "/0/private/";

/// Kraken exchange adapter
pub struct Kraken {
    name: String,
    dry_run: bool,
    signer: Option<KrakenSigner>,
    nonces: NonceGenerator,
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    /// canonical pair -> native symbol
    pair_cache: RwLock<HashMap<TradingPair, String>>,
    /// display symbol (`wsname`) -> trade symbol (`altname`), loaded once
    asset_pairs: RwLock<Option<Arc<HashMap<String, String>>>>,
}

impl Kraken {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(
            &config.kraken.base_url,
            Duration::from_secs(config.http.timeout_secs),
        )?;
        Self::with_transport(
            &config.kraken,
            config.dry_run,
            RetryConfig::from(&config.http),
            Arc::new(transport),
        )
    }

    pub fn with_transport(
        config: &KrakenConfig,
        dry_run: bool,
        retry: RetryConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let signer = match (&config.api_key, &config.api_secret) {
            (Some(key), Some(secret)) => Some(KrakenSigner::new(key.clone(), secret)?),
            _ => None,
        };

        Ok(Self {
            name: "kraken".to_string(),
            dry_run,
            signer,
            nonces: NonceGenerator::new(),
            transport,
            retry,
            pair_cache: RwLock::new(HashMap::new()),
            asset_pairs: RwLock::new(None),
        })
    }

    /// Resolve the venue-native symbol for a canonical pair.
    ///
    /// Falls back to the separator-stripped pair when the metadata has no
    /// match. That fallback is best-effort: Kraken accepts many raw
    /// concatenations, but an unlisted one may target the wrong instrument or
    /// be rejected.
    pub async fn native_symbol(&self, pair: &TradingPair) -> Result<String> {
        let cached = self.pair_cache.read().get(pair).cloned();
        if let Some(native) = cached {
            debug!("Pair cache hit: {} -> {}", pair, native);
            return Ok(native);
        }

        let table = self.asset_pairs().await?;
        let native = match table.get(&pair.to_string()).or_else(|| table.get(&pair.compact())) {
            Some(altname) => altname.clone(),
            None => {
                warn!(
                    pair = %pair,
                    fallback = %pair.compact(),
                    "No Kraken metadata match, using best-effort concatenated symbol"
                );
                pair.compact()
            }
        };

        self.pair_cache.write().insert(pair.clone(), native.clone());
        Ok(native)
    }

    async fn asset_pairs(&self) -> Result<Arc<HashMap<String, String>>> {
        let cached = self.asset_pairs.read().clone();
        if let Some(table) = cached {
            return Ok(table);
        }

        let result = self.public(HttpRequest::get(ASSET_PAIRS_PATH)).await?;
        let mut table = HashMap::new();
        if let Value::Object(pairs) = result {
            for meta in pairs.values() {
                if let (Some(alt), Some(ws)) = (meta["altname"].as_str(), meta["wsname"].as_str()) {
                    table.insert(ws.to_ascii_uppercase(), alt.to_string());
                }
            }
        }
        debug!("Loaded {} Kraken asset pairs", table.len());

        let table = Arc::new(table);
        *self.asset_pairs.write() = Some(table.clone());
        Ok(table)
    }

    async fn public(&self, request: HttpRequest) -> Result<Value> {
        let label = request.path.clone();
        with_retry(&self.retry, &label, |_| {
            let transport = self.transport.clone();
            let request = request.clone();
            async move { unwrap_envelope(transport.send(request).await?) }
        })
        .await
    }

    /// Signed POST to `/0/private/{method}`. Each attempt carries a new nonce.
    async fn private(&self, method: &str, params: &[(String, String)]) -> Result<Value> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| Error::CredentialsMissing("Kraken API key and secret are required".to_string()))?;
        let path = format!("{PRIVATE_PREFIX}{method}");

        with_retry(&self.retry, &path, |_| {
            let nonce = self.nonces.next();
            let mut form = vec![("nonce".to_string(), nonce.to_string())];
            form.extend(params.iter().cloned());
            let body = encode_form(&form);
            let signature = signer.sign(&path, nonce, &body);

            let request = HttpRequest::post(path.clone(), body)
                .header("API-Key", signer.key_id())
                .header("API-Sign", signature)
                .header("Content-Type", "application/x-www-form-urlencoded; charset=utf-8");
            let transport = self.transport.clone();
            async move { unwrap_envelope(transport.send(request).await?) }
        })
        .await
    }
}

#[async_trait]
impl ExchangeClient for Kraken {
    async fn get_ticker_price(&self, pair: &TradingPair) -> Result<Decimal> {
        let native = self.native_symbol(pair).await?;
        let result = self
            .public(HttpRequest::get(TICKER_PATH).query("pair", native.as_str()))
            .await?;

        // Result is keyed by Kraken's internal name, which may differ from
        // the altname we asked for; take the first entry.
        let last_trade = result
            .as_object()
            .and_then(|tickers| tickers.values().next())
            .and_then(|ticker| ticker["c"].get(0))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::PriceUnavailable(format!("no last trade price for {native}")))?;

        let price = Decimal::from_str(last_trade)
            .map_err(|e| Error::PriceUnavailable(format!("bad last trade {last_trade:?}: {e}")))?;
        if price <= Decimal::ZERO {
            return Err(Error::PriceUnavailable(format!("non-positive last trade {price}")));
        }
        Ok(price)
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResult> {
        let native = self.native_symbol(&order.pair).await?;

        let mut params = vec![
            ("ordertype".to_string(), order.order_type().as_str().to_string()),
            ("type".to_string(), order.side.as_str().to_string()),
            ("volume".to_string(), order.volume.normalize().to_string()),
            ("pair".to_string(), native),
        ];
        if let Some(price) = order.price {
            params.push(("price".to_string(), price.normalize().to_string()));
        }

        if self.dry_run {
            info!("DRY_RUN: would place {} {} {} @ {:?}", order.side, order.volume, order.pair, order.price);
            let request: Map<String, Value> = params
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return Ok(OrderResult::not_sent(
                "DRY_RUN enabled - not placing order",
                request_snapshot(Value::Object(request)),
            ));
        }

        info!("Placing order: {} {} {} @ {:?}", order.side, order.volume, order.pair, order.price);
        let result = self.private("AddOrder", &params).await?;

        let txid = result["txid"]
            .as_array()
            .and_then(|ids| ids.first())
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = match result.get("descr") {
            Some(descr) => descr["order"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| descr.to_string()),
            None => "order accepted".to_string(),
        };
        info!("Kraken accepted order {:?}: {}", txid, message);

        let raw = match result {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(OrderResult::executed(txid, message, raw))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Kraken wraps every body in `{"error": [...], "result": ...}`. The error
/// array is checked before the status so venue rejections are never retried.
fn unwrap_envelope(resp: HttpResponse) -> Result<Value> {
    let parsed = serde_json::from_str::<Value>(&resp.body);

    if let Ok(body) = &parsed {
        if let Some(errors) = body["error"].as_array().filter(|e| !e.is_empty()) {
            let detail: Vec<String> = errors
                .iter()
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .collect();
            return Err(Error::Venue(format!("Kraken error: {}", detail.join(", "))));
        }
    }
    if !resp.is_success() {
        return Err(Error::Http {
            status: resp.status,
            body: resp.body,
        });
    }

    let mut body = parsed?;
    match body.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(Error::Venue("Kraken response has no result".to_string())),
    }
}

fn encode_form(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
