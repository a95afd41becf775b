use crate::config::Settings;
use crate::domain::market::MarketSnapshot;
use crate::storage::write_json_atomic;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Last fully successful snapshot, kept on disk for offline fallback.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.snapshot_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, snapshot: &MarketSnapshot) -> anyhow::Result<()> {
        write_json_atomic(&self.path, snapshot)
    }

    /// `None` if the file is missing or unreadable.
    pub fn load(&self) -> Option<MarketSnapshot> {
        match self.try_load() {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "cached snapshot unreadable; ignoring"
                );
                None
            }
        }
    }

    fn try_load(&self) -> anyhow::Result<Option<MarketSnapshot>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        let snapshot = serde_json::from_str::<MarketSnapshot>(&text)
            .with_context(|| format!("{} is not a valid snapshot", self.path.display()))?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::{BitcoinQuote, DataSource, Mover, TopMovers};
    use chrono::{TimeZone, Utc};

    #[test]
    fn round_trips_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("last_snapshot.json"));
        assert!(store.load().is_none());

        let mut snapshot = MarketSnapshot::empty(Utc.with_ymd_and_hms(2026, 1, 27, 10, 0, 0).unwrap());
        snapshot.source = DataSource::Live;
        snapshot.market_breadth = Some(61.0);
        snapshot.bitcoin = Some(BitcoinQuote {
            price_usd: 98_000.5,
            volume_24h_usd: 2.5e10,
            price_change_24h: -1.25,
        });
        snapshot.top_movers = Some(TopMovers {
            gainers: vec![Mover {
                symbol: "SOL".to_string(),
                name: "Solana".to_string(),
                price_change_24h: 9.5,
            }],
            losers: vec![],
        });

        store.save(&snapshot).unwrap();
        assert_eq!(store.load(), Some(snapshot));
    }

    #[test]
    fn corrupt_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_snapshot.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(SnapshotStore::new(&path).load().is_none());
    }
}
