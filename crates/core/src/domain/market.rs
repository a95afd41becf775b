use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FearGreedReading {
    /// Index value, 0 (extreme fear) ..= 100 (extreme greed).
    pub value: u8,
    pub classification: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Most recent first.
    pub history_7d: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMarket {
    pub total_market_cap_usd: f64,
    pub total_volume_24h_usd: f64,
    pub btc_dominance: f64,
    pub eth_dominance: f64,
    pub active_cryptocurrencies: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitcoinQuote {
    pub price_usd: f64,
    pub volume_24h_usd: f64,
    pub price_change_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub symbol: String,
    pub name: String,
    pub price_change_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopMovers {
    pub gainers: Vec<Mover>,
    /// Worst performer first.
    pub losers: Vec<Mover>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Every critical section was fetched in this cycle.
    #[default]
    Live,
    MemoryCache,
    DiskCache,
    /// Nothing cached; whatever succeeded this cycle.
    Partial,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Live => "live",
            DataSource::MemoryCache => "memory cache",
            DataSource::DiskCache => "disk cache",
            DataSource::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub fear_greed: Option<FearGreedReading>,
    pub global_market: Option<GlobalMarket>,
    pub bitcoin: Option<BitcoinQuote>,
    pub top_movers: Option<TopMovers>,
    /// Percentage (0-100) of the top coins with a positive 24h change.
    pub market_breadth: Option<f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: DataSource,
}

impl MarketSnapshot {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            fear_greed: None,
            global_market: None,
            bitcoin: None,
            top_movers: None,
            market_breadth: None,
            timestamp,
            source: DataSource::Partial,
        }
    }

    /// Top movers are informational only and do not count here.
    pub fn has_all_critical(&self) -> bool {
        self.fear_greed.is_some()
            && self.global_market.is_some()
            && self.bitcoin.is_some()
            && self.market_breadth.is_some()
    }

    pub fn using_cached_data(&self) -> bool {
        self.source != DataSource::Live
    }
}
