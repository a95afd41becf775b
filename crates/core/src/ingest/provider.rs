use crate::config::Settings;
use crate::domain::market::{BitcoinQuote, FearGreedReading, GlobalMarket};
use crate::ingest::alternative_me::AlternativeMeClient;
use crate::ingest::coingecko::CoinGeckoClient;
use crate::ingest::error::FetchDiagnosticsError;
use crate::ingest::types::CoinMarket;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const USER_AGENT: &str = concat!("mood_core/", env!("CARGO_PKG_VERSION"));

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fear_greed(&self) -> Result<FearGreedReading>;

    async fn global_market(&self) -> Result<GlobalMarket>;

    async fn bitcoin(&self) -> Result<BitcoinQuote>;

    /// Top coins by market cap.
    async fn coin_markets(&self) -> Result<Vec<CoinMarket>>;
}

/// GET-and-decode JSON with a per-request timeout, optional retries and a
/// minimum spacing between consecutive requests.
#[derive(Debug)]
pub struct HttpJsonClient {
    http: reqwest::Client,
    retries: u32,
    req_delay: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl HttpJsonClient {
    pub fn new(timeout: Duration, retries: u32, req_delay: Duration) -> Result<Self> {
        anyhow::ensure!(retries >= 1, "retries must be >= 1");

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            retries,
            req_delay,
            last_request: tokio::sync::Mutex::new(None),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.api_timeout,
            settings.api_retries,
            settings.api_req_delay,
        )
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url, query).await {
                Ok(v) => return Ok(v),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err.into());
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, endpoint = url, error = %err, "market data fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.req_delay {
                tokio::time::sleep(self.req_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, FetchDiagnosticsError> {
        self.throttle().await;
        tracing::debug!(endpoint = url, "market data request");

        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|err| {
                let stage = if err.is_timeout() { "timeout" } else { "request" };
                FetchDiagnosticsError::new(url, stage, err.to_string())
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|err| {
            let stage = if err.is_timeout() { "timeout" } else { "request" };
            FetchDiagnosticsError::new(url, stage, format!("failed to read body: {err}"))
        })?;

        if !status.is_success() {
            return Err(FetchDiagnosticsError::new(
                url,
                "http",
                format!("status={status}: {}", truncate(&text, 200)),
            ));
        }

        serde_json::from_str::<T>(&text).map_err(|err| {
            FetchDiagnosticsError::new(
                url,
                "decode",
                format!("{err}: {}", truncate(&text, 200)),
            )
        })
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// CoinGecko for market data plus Alternative.me for the sentiment index.
#[derive(Debug, Clone)]
pub struct HttpMarketDataProvider {
    coingecko: CoinGeckoClient,
    alternative_me: AlternativeMeClient,
}

impl HttpMarketDataProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = Arc::new(HttpJsonClient::from_settings(settings)?);
        Ok(Self {
            coingecko: CoinGeckoClient::new(http.clone(), &settings.coingecko_base_url),
            alternative_me: AlternativeMeClient::new(http, &settings.fear_greed_url),
        })
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpMarketDataProvider {
    fn provider_name(&self) -> &'static str {
        "coingecko+alternative_me"
    }

    async fn fear_greed(&self) -> Result<FearGreedReading> {
        self.alternative_me.fear_greed_index().await
    }

    async fn global_market(&self) -> Result<GlobalMarket> {
        self.coingecko.global_market().await
    }

    async fn bitcoin(&self) -> Result<BitcoinQuote> {
        self.coingecko.bitcoin().await
    }

    async fn coin_markets(&self) -> Result<Vec<CoinMarket>> {
        self.coingecko.coin_markets().await
    }
}
