//! tradebot - Core Library
//! Uniform exchange clients, a paper ledger, and order dispatch

// Public modules
pub mod core;
pub mod exchanges;
pub mod execution;
pub mod extract;
pub mod http;
pub mod signer;

// Re-exports
pub use core::{Config, Error, ExchangeClient, OrderRequest, OrderResult, Result, Side, TradingPair, Venue};
pub use execution::Dispatcher;
