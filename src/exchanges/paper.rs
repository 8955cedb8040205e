//! Paper exchange - in-memory ledger behind the live venue contract
//!
//! Prices for unseen pairs are derived deterministically from the pair's
//! asset codes, so a run is reproducible. This is a simulation aid, not a
//! model of market data.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::{
    Config, Error, ExchangeClient, OrderRequest, OrderResult, Result, Side, TradingPair, request_snapshot,
};

/// Starting balance of the funding currency
pub const STARTING_BALANCE: i64 = 10_000;

/// Float-noise tolerance on the funds check (1e-8)
const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Derived prices are drawn in cents from [10.00, 50000.00]
const MIN_PRICE_CENTS: i64 = 1_000;
const MAX_PRICE_CENTS: i64 = 5_000_000;

/// Paper trading venue
pub struct PaperExchange {
    base_currency: String,
    dry_run: bool,
    prices: RwLock<HashMap<TradingPair, Decimal>>,
    /// Held for the whole check-and-mutate of one order
    balances: Mutex<HashMap<String, Decimal>>,
}

impl PaperExchange {
    pub fn new(base_currency: &str) -> Self {
        let base_currency = base_currency.trim().to_ascii_uppercase();
        let mut balances = HashMap::new();
        balances.insert(base_currency.clone(), Decimal::from(STARTING_BALANCE));

        Self {
            base_currency,
            dry_run: false,
            prices: RwLock::new(HashMap::new()),
            balances: Mutex::new(balances),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.base_currency).with_dry_run(config.dry_run)
    }

    /// Price and validate orders without touching the ledger
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Pin the price of a pair. Later ticker calls return it unchanged.
    pub fn set_price(&self, pair: &TradingPair, price: Decimal) -> Result<()> {
        if price <= Decimal::ZERO {
            return Err(Error::Validation(format!("price must be positive, got {price}")));
        }
        self.prices.write().insert(pair.clone(), price);
        Ok(())
    }

    /// Balance of an asset; unknown assets hold zero.
    pub fn balance(&self, asset: &str) -> Decimal {
        self.balances
            .lock()
            .get(&asset.to_ascii_uppercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn balances(&self) -> HashMap<String, Decimal> {
        self.balances.lock().clone()
    }

    fn ticker(&self, pair: &TradingPair) -> Decimal {
        let cached = self.prices.read().get(pair).copied();
        if let Some(price) = cached {
            return price;
        }

        // Entry API under the write lock: a concurrent caller that derived the
        // same pair first wins, and both see one price.
        *self
            .prices
            .write()
            .entry(pair.clone())
            .or_insert_with(|| {
                let price = derive_price(pair);
                debug!("Derived paper price {} for {}", price, pair);
                price
            })
    }
}

#[async_trait]
impl ExchangeClient for PaperExchange {
    async fn get_ticker_price(&self, pair: &TradingPair) -> Result<Decimal> {
        Ok(self.ticker(pair))
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResult> {
        let exec_price = match order.price {
            Some(limit) => limit,
            None => self.ticker(&order.pair),
        };
        let base = order.pair.base();
        let quote = order.pair.quote();
        let notional = order
            .volume
            .checked_mul(exec_price)
            .ok_or_else(|| Error::Validation(format!("order notional overflows: {} x {}", order.volume, exec_price)))?;

        let mut request = order.to_value();
        request["exec_price"] = Value::String(exec_price.normalize().to_string());

        let mut balances = self.balances.lock();

        // (debited asset, amount out, credited asset, amount in)
        let (debit_asset, debit, credit_asset, credit) = match order.side {
            Side::Buy => (quote, notional, base, order.volume),
            Side::Sell => (base, order.volume, quote, notional),
        };

        let available = balances.get(debit_asset).copied().unwrap_or(Decimal::ZERO);
        let shortfall = available + EPSILON < debit;

        if self.dry_run {
            info!("DRY_RUN: paper {} {} {} @ {}", order.side, order.volume, order.pair, exec_price);
            let mut raw = request_snapshot(request);
            if shortfall {
                raw.insert(
                    "insufficient".to_string(),
                    serde_json::json!({
                        "asset": debit_asset,
                        "required": debit.normalize().to_string(),
                        "available": available.normalize().to_string(),
                    }),
                );
            }
            return Ok(OrderResult::not_sent("DRY_RUN enabled - paper ledger not updated", raw));
        }

        if shortfall {
            return Err(Error::InsufficientFunds {
                asset: debit_asset.to_string(),
                required: debit,
                available,
            });
        }

        // Inside the epsilon band the whole available balance goes out and
        // the credit shrinks with it.
        let (debit, credit) = if debit > available {
            let scaled = match order.side {
                Side::Buy => available.checked_div(exec_price),
                Side::Sell => available.checked_mul(exec_price),
            };
            (available, scaled.unwrap_or(Decimal::ZERO).min(credit))
        } else {
            (debit, credit)
        };

        let held = balances.get(credit_asset).copied().unwrap_or(Decimal::ZERO);
        let credited = held
            .checked_add(credit)
            .ok_or_else(|| Error::Validation(format!("{credit_asset} balance overflows")))?;

        // Both legs under the same guard, after every check has passed.
        balances.insert(debit_asset.to_string(), available - debit);
        balances.insert(credit_asset.to_string(), credited);

        let mut raw = request_snapshot(request);
        raw.insert("balances".to_string(), balances_snapshot(&balances, base, quote));
        drop(balances);

        let verb = match order.side {
            Side::Buy => "Bought",
            Side::Sell => "Sold",
        };
        let message = format!("{} {} {} @ {}", verb, order.volume.normalize(), base, exec_price.normalize());
        info!("Paper fill: {}", message);

        Ok(OrderResult::executed(Some(format!("paper-{}", Uuid::new_v4())), message, raw))
    }

    fn name(&self) -> &str {
        "paper"
    }
}

/// Σ character codes of both asset codes seeds the generator.
fn derive_price(pair: &TradingPair) -> Decimal {
    let seed: u64 = pair
        .base()
        .chars()
        .chain(pair.quote().chars())
        .map(|c| c as u64)
        .sum();
    let mut rng = StdRng::seed_from_u64(seed);
    Decimal::new(rng.gen_range(MIN_PRICE_CENTS..=MAX_PRICE_CENTS), 2)
}

fn balances_snapshot(balances: &HashMap<String, Decimal>, base: &str, quote: &str) -> Value {
    let mut snapshot = Map::new();
    for asset in [base, quote] {
        let amount = balances.get(asset).copied().unwrap_or(Decimal::ZERO);
        snapshot.insert(asset.to_string(), Value::String(amount.normalize().to_string()));
    }
    Value::Object(snapshot)
}
