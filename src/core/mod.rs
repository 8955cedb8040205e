//! Core module - Common types, traits, and error handling

pub mod config;
pub mod error;
pub mod symbol;
pub mod traits;
pub mod types;

pub use config::{Config, Venue};
pub use error::{Error, Result};
pub use symbol::{TradingPair, normalize};
pub use traits::*;
pub use types::*;
