pub mod alternative_me;
pub mod coingecko;
pub mod error;
pub mod fetcher;
pub mod markets;
pub mod provider;
pub mod types;

pub use fetcher::MarketDataFetcher;
pub use provider::{HttpMarketDataProvider, MarketDataProvider};
