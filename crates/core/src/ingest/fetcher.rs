use crate::domain::market::{DataSource, MarketSnapshot};
use crate::ingest::markets::{market_breadth, top_movers};
use crate::ingest::provider::MarketDataProvider;
use crate::storage::SnapshotStore;
use chrono::{DateTime, Utc};

/// Assembles a [`MarketSnapshot`] from a provider, falling back to the last
/// good snapshot (memory, then disk) when a critical section is missing.
pub struct MarketDataFetcher<P> {
    provider: P,
    cache: Option<MarketSnapshot>,
    snapshot_store: Option<SnapshotStore>,
    last_fetch_time: Option<DateTime<Utc>>,
}

impl<P: MarketDataProvider> MarketDataFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: None,
            snapshot_store: None,
            last_fetch_time: None,
        }
    }

    pub fn with_snapshot_store(mut self, store: SnapshotStore) -> Self {
        self.snapshot_store = Some(store);
        self
    }

    /// Time of the last fetch in which every critical section succeeded.
    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.last_fetch_time
    }

    pub async fn fetch_all(&mut self) -> MarketSnapshot {
        let started = Utc::now();
        tracing::info!(provider = self.provider.provider_name(), "starting market data fetch");

        // Sequential on purpose: the public APIs rate-limit aggressively.
        let fear_greed = section("fear_greed", self.provider.fear_greed().await);
        let global_market = section("global_market", self.provider.global_market().await);
        let bitcoin = section("bitcoin", self.provider.bitcoin().await);
        let coins = section("coin_markets", self.provider.coin_markets().await);

        let (movers, breadth) = match coins.as_deref() {
            Some(coins) => (Some(top_movers(coins)), market_breadth(coins)),
            None => (None, None),
        };

        let mut snapshot = MarketSnapshot {
            fear_greed,
            global_market,
            bitcoin,
            top_movers: movers,
            market_breadth: breadth,
            timestamp: started,
            source: DataSource::Live,
        };

        if snapshot.has_all_critical() {
            self.remember(&snapshot);
            tracing::info!(
                elapsed_ms = (Utc::now() - started).num_milliseconds(),
                "fetched all market data"
            );
            return snapshot;
        }

        tracing::warn!(
            fear_greed = snapshot.fear_greed.is_some(),
            global_market = snapshot.global_market.is_some(),
            bitcoin = snapshot.bitcoin.is_some(),
            market_breadth = snapshot.market_breadth.is_some(),
            "some market data sections failed; falling back to cached data"
        );

        if let Some(cached) = &self.cache {
            let mut out = cached.clone();
            out.source = DataSource::MemoryCache;
            return out;
        }

        if let Some(mut on_disk) = self.snapshot_store.as_ref().and_then(|s| s.load()) {
            tracing::info!(cached_at = %on_disk.timestamp, "using snapshot from disk");
            on_disk.source = DataSource::DiskCache;
            return on_disk;
        }

        tracing::warn!("no cached snapshot available; returning partial data");
        snapshot.source = DataSource::Partial;
        snapshot
    }

    fn remember(&mut self, snapshot: &MarketSnapshot) {
        self.cache = Some(snapshot.clone());
        self.last_fetch_time = Some(snapshot.timestamp);

        if let Some(store) = &self.snapshot_store {
            // Best-effort: the in-memory cache still covers this process.
            if let Err(err) = store.save(snapshot) {
                tracing::warn!(
                    path = %store.path().display(),
                    error = %format!("{err:#}"),
                    "failed to persist snapshot"
                );
            }
        }
    }
}

fn section<T>(name: &'static str, res: anyhow::Result<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(section = name, error = %format!("{err:#}"), "market data section failed");
            None
        }
    }
}
