//! Core traits - the uniform venue contract

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core::{OrderRequest, OrderResult, Result, TradingPair};

/// Exchange client trait - implemented by every venue, live or simulated.
///
/// Callers only ever see this capability set; venue-specific behavior stays
/// behind it.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Most recent trade price for the pair
    async fn get_ticker_price(&self, pair: &TradingPair) -> Result<Decimal>;

    /// Place an immediate market or limit order
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResult>;

    /// Venue name
    fn name(&self) -> &str;
}
