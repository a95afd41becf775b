use mood_core::domain::history::{HistoricalValues, HistoryEntry};
use mood_core::domain::market::{DataSource, MarketSnapshot};
use mood_core::domain::risk::RiskScoreResult;
use mood_core::ingest::{MarketDataFetcher, MarketDataProvider};
use mood_core::scoring::RiskScoreCalculator;
use mood_core::storage::HistoryStore;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub started_at: DateTime<Utc>,
    pub snapshot: MarketSnapshot,
    pub risk: RiskScoreResult,
    pub history: HistoricalValues,
    pub saved: Option<HistoryEntry>,
}

/// One fetch → calculate → persist pass per interval.
pub struct RefreshWorker<P> {
    fetcher: MarketDataFetcher<P>,
    calculator: RiskScoreCalculator,
    history: HistoryStore,
    interval: Duration,
    dry_run: bool,
}

impl<P: MarketDataProvider> RefreshWorker<P> {
    pub fn new(
        fetcher: MarketDataFetcher<P>,
        calculator: RiskScoreCalculator,
        history: HistoryStore,
        interval: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            fetcher,
            calculator,
            history,
            interval,
            dry_run,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// History reads and writes are blocking `std::fs` calls made inline; the
    /// worker owns its runtime and runs nothing else on it.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let started_at = Utc::now();
        let snapshot = self.fetcher.fetch_all().await;
        let risk = self.calculator.calculate_risk_score(&snapshot);
        let saved = self.persist(&snapshot, &risk);
        let history = self.history.historical_values();

        CycleOutcome {
            started_at,
            snapshot,
            risk,
            history,
            saved,
        }
    }

    /// Only live, successfully scored snapshots go into the history; a cached
    /// snapshot would re-log an old score under a new timestamp.
    fn persist(&self, snapshot: &MarketSnapshot, risk: &RiskScoreResult) -> Option<HistoryEntry> {
        if self.dry_run {
            tracing::info!(dry_run = true, score = risk.score, "skipping score history write");
            return None;
        }
        if snapshot.source != DataSource::Live || risk.is_fallback() {
            tracing::info!(
                source = snapshot.source.as_str(),
                status = %risk.status,
                "score not recorded in history"
            );
            return None;
        }

        match self
            .history
            .save(risk.score, risk.status.label(), &risk.message)
        {
            Ok(entry) => Some(entry),
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(
                    path = %self.history.path().display(),
                    error = %format!("{err:#}"),
                    "failed to save score history"
                );
                None
            }
        }
    }

    /// Runs cycles until `shutdown` resolves, handing each outcome to `on_cycle`.
    pub async fn run_until<F, C>(&mut self, shutdown: F, mut on_cycle: C) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
        C: FnMut(&CycleOutcome),
    {
        tokio::pin!(shutdown);
        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            let outcome = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(cycle, "shutdown requested during refresh");
                    return Ok(());
                }
                outcome = self.run_cycle() => outcome,
            };
            on_cycle(&outcome);

            tracing::debug!(cycle, interval_secs = self.interval.as_secs(), "sleeping until next refresh");
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(cycle, "shutdown requested; stopping refresh loop");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
