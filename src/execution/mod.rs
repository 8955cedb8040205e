//! Execution layer - Venue selection and order dispatch

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::core::{Config, ExchangeClient, OrderRequest, OrderResult, Result, Side, TradingPair, Venue, normalize};
use crate::exchanges::{Kraken, PaperExchange, Uphold};

/// Routes calls with loosely-typed arguments to the one configured venue.
pub struct Dispatcher {
    venue: Venue,
    client: Arc<dyn ExchangeClient>,
}

impl Dispatcher {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client: Arc<dyn ExchangeClient> = match config.exchange {
            Venue::Kraken => Arc::new(Kraken::new(config)?),
            Venue::Uphold => Arc::new(Uphold::new(config)?),
            Venue::Paper => Arc::new(PaperExchange::from_config(config)),
        };
        info!("Using {} exchange (dry_run={})", client.name(), config.dry_run);

        Ok(Self::with_client(config.exchange, client))
    }

    pub fn with_client(venue: Venue, client: Arc<dyn ExchangeClient>) -> Self {
        Self { venue, client }
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }

    pub fn client(&self) -> &Arc<dyn ExchangeClient> {
        &self.client
    }

    pub async fn get_ticker_price(&self, pair: &str) -> Result<Decimal> {
        let pair = normalize(pair)?;
        self.client.get_ticker_price(&pair).await
    }

    /// `price: None` places a market order.
    pub async fn place_order(
        &self,
        pair: &str,
        side: &str,
        volume: Decimal,
        price: Option<Decimal>,
    ) -> Result<OrderResult> {
        let pair: TradingPair = normalize(pair)?;
        let side: Side = side.parse()?;
        let order = OrderRequest::new(pair, side, volume, price)?;

        info!(
            "Dispatching {} {} {} @ {:?} to {}",
            order.side, order.volume, order.pair, order.price, self.venue
        );
        self.client.place_order(&order).await
    }
}
