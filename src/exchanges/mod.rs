//! Exchange implementations - Pluggable venue adapters

pub mod kraken;
pub mod paper;
pub mod uphold;

pub use kraken::Kraken;
pub use paper::PaperExchange;
pub use uphold::Uphold;
