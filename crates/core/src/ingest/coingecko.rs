use crate::domain::market::{BitcoinQuote, GlobalMarket};
use crate::ingest::provider::HttpJsonClient;
use crate::ingest::types::{CoinMarket, GlobalResponse, SimplePriceResponse};
use anyhow::{Context, Result};
use std::sync::Arc;

pub const MARKETS_PER_PAGE: &str = "100";

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: Arc<HttpJsonClient>,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(http: Arc<HttpJsonClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn global_market(&self) -> Result<GlobalMarket> {
        let body: GlobalResponse = self.http.get_json(&self.url("/global"), &[]).await?;
        let d = body.data;
        let usd = |m: &std::collections::BTreeMap<String, f64>, k: &str| {
            m.get(k).copied().unwrap_or(0.0)
        };

        Ok(GlobalMarket {
            total_market_cap_usd: usd(&d.total_market_cap, "usd"),
            total_volume_24h_usd: usd(&d.total_volume, "usd"),
            btc_dominance: usd(&d.market_cap_percentage, "btc"),
            eth_dominance: usd(&d.market_cap_percentage, "eth"),
            active_cryptocurrencies: d.active_cryptocurrencies,
        })
    }

    pub async fn bitcoin(&self) -> Result<BitcoinQuote> {
        let params = [
            ("ids", "bitcoin"),
            ("vs_currencies", "usd"),
            ("include_24hr_vol", "true"),
            ("include_24hr_change", "true"),
        ];
        let body: SimplePriceResponse = self
            .http
            .get_json(&self.url("/simple/price"), &params)
            .await?;
        let q = body
            .bitcoin
            .context("simple/price response has no bitcoin entry")?;

        Ok(BitcoinQuote {
            price_usd: q.usd.unwrap_or(0.0),
            volume_24h_usd: q.usd_24h_vol.unwrap_or(0.0),
            price_change_24h: q.usd_24h_change.unwrap_or(0.0),
        })
    }

    pub async fn coin_markets(&self) -> Result<Vec<CoinMarket>> {
        let params = [
            ("vs_currency", "usd"),
            ("order", "market_cap_desc"),
            ("per_page", MARKETS_PER_PAGE),
            ("page", "1"),
            ("sparkline", "false"),
            ("price_change_percentage", "24h"),
        ];
        let coins: Vec<CoinMarket> = self
            .http
            .get_json(&self.url("/coins/markets"), &params)
            .await?;
        tracing::debug!(coins = coins.len(), "coin markets fetched");
        Ok(coins)
    }
}
