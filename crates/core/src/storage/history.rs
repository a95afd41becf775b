use crate::config::Settings;
use crate::domain::history::{HistoricalValues, HistoryEntry};
use crate::storage::write_json_atomic;
use anyhow::Context;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Append-only score log persisted as `{"history": [...]}` and pruned to a
/// rolling retention window on every write.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    retention: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Wrapped { history: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

#[derive(Debug, Serialize)]
struct HistoryFileRef<'a> {
    history: &'a [HistoryEntry],
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, retention_days: i64) -> Self {
        Self {
            path: path.into(),
            retention: Duration::try_days(retention_days).unwrap_or(Duration::MAX),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.history_path.clone(), settings.history_retention_days)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files are treated as an empty history. Individual
    /// entries that fail to decode are skipped.
    pub fn load(&self) -> Vec<HistoryEntry> {
        match self.try_load() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "score history unreadable; treating as empty"
                );
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed = serde_json::from_str::<HistoryFile>(&text)
            .with_context(|| format!("{} is not a valid score history", self.path.display()))?;
        let raw = match parsed {
            HistoryFile::Wrapped { history } => history,
            HistoryFile::Bare(history) => history,
        };

        let mut entries = Vec::with_capacity(raw.len());
        for (index, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<HistoryEntry>(value) {
                Ok(entry) => entries.push(entry),
                Err(err) => tracing::warn!(
                    path = %self.path.display(),
                    index,
                    error = %err,
                    "skipping malformed score history entry"
                ),
            }
        }
        Ok(entries)
    }

    /// `<path>.corrupt`, where an unparseable history file is moved before a
    /// fresh one is written.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".corrupt");
        PathBuf::from(name)
    }

    /// Entries to append to. A file that cannot be parsed at all is moved
    /// aside rather than overwritten; if that fails, the save is refused.
    fn load_for_write(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        match self.try_load() {
            Ok(entries) => Ok(entries),
            Err(err) => {
                let aside = self.corrupt_path();
                std::fs::rename(&self.path, &aside).with_context(|| {
                    format!(
                        "refusing to overwrite unreadable score history {}",
                        self.path.display()
                    )
                })?;
                tracing::warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %format!("{err:#}"),
                    "score history unreadable; moved aside and starting a new log"
                );
                Ok(Vec::new())
            }
        }
    }

    pub fn save(&self, score: f64, status: &str, message: &str) -> anyhow::Result<HistoryEntry> {
        self.save_at(Utc::now(), score, status, message)
    }

    pub fn save_at(
        &self,
        now: DateTime<Utc>,
        score: f64,
        status: &str,
        message: &str,
    ) -> anyhow::Result<HistoryEntry> {
        anyhow::ensure!(score.is_finite(), "score must be finite");

        // Stored with microsecond precision; keep the returned entry identical to what is read back.
        let entry = HistoryEntry {
            timestamp: now.trunc_subsecs(6),
            score: (score * 10.0).round() / 10.0,
            status: status.to_string(),
            message: message.to_string(),
        };

        let mut history = self.load_for_write()?;
        history.push(entry.clone());

        let before = history.len();
        let cutoff = now
            .checked_sub_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        history.retain(|h| h.timestamp > cutoff);
        let pruned = before - history.len();

        write_json_atomic(&self.path, &HistoryFileRef { history: &history })?;

        tracing::debug!(
            path = %self.path.display(),
            entries = history.len(),
            pruned,
            score = entry.score,
            "score history saved"
        );
        Ok(entry)
    }

    pub fn historical_values(&self) -> HistoricalValues {
        self.historical_values_at(Utc::now())
    }

    pub fn historical_values_at(&self, now: DateTime<Utc>) -> HistoricalValues {
        select_historical_values(&self.load(), now)
    }
}

/// Picks `now` (the most recent entry) and the entries closest to 1, 7 and 30
/// days before `now`, greedily and in that order. Every pick, `now` included,
/// leaves the candidate pool, so no entry fills two slots.
pub fn select_historical_values(entries: &[HistoryEntry], now: DateTime<Utc>) -> HistoricalValues {
    let Some(latest_idx) = latest_index(entries) else {
        return HistoricalValues::default();
    };

    let mut out = HistoricalValues {
        now: Some(entries[latest_idx].clone()),
        ..HistoricalValues::default()
    };
    if entries.len() <= 1 {
        return out;
    }

    let mut used = vec![false; entries.len()];
    used[latest_idx] = true;

    let mut pick = |offset: Duration| -> Option<HistoryEntry> {
        let target = now - offset;
        let idx = entries
            .iter()
            .enumerate()
            .filter(|(i, _)| !used[*i])
            .min_by_key(|(_, e)| (e.timestamp - target).abs())
            .map(|(i, _)| i)?;
        used[idx] = true;
        Some(entries[idx].clone())
    };

    out.yesterday = pick(Duration::days(1));
    out.last_week = pick(Duration::days(7));
    out.last_month = pick(Duration::days(30));
    out
}

fn latest_index(entries: &[HistoryEntry]) -> Option<usize> {
    // max_by_key keeps the last maximum, so the newest append wins ties.
    entries
        .iter()
        .enumerate()
        .max_by_key(|(_, e)| e.timestamp)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn entry(ts: DateTime<Utc>, score: f64) -> HistoryEntry {
        HistoryEntry {
            timestamp: ts,
            score,
            status: "Neutral".to_string(),
            message: "m".to_string(),
        }
    }

    fn store(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("data").join("score_history.json"), 90)
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir);
        assert!(s.load().is_empty());
        assert_eq!(s.historical_values_at(now()), HistoricalValues::default());
    }

    #[test]
    fn corrupt_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score_history.json");
        std::fs::write(&path, "{not json").unwrap();
        let s = HistoryStore::new(&path, 90);
        assert!(s.load().is_empty());

        // A save over a corrupt file keeps the old bytes and starts a fresh log.
        s.save_at(now(), 40.0, "Risk Off", "m").unwrap();
        assert_eq!(s.load().len(), 1);
        assert_eq!(std::fs::read_to_string(s.corrupt_path()).unwrap(), "{not json");
    }

    #[test]
    fn malformed_entry_does_not_drop_valid_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score_history.json");
        std::fs::write(
            &path,
            r#"{"history": [
                {"timestamp": "2026-02-27T12:00:00.000000Z", "score": 41.0, "status": "Risk Off", "message": "m"},
                {"timestamp": "2026-02-28T12:00:00.000000Z", "score": 52.0, "status": "Neutral", "message": "m"},
                {"timestamp": "garbage", "score": 10.0, "status": "Neutral", "message": "m"}
            ]}"#,
        )
        .unwrap();
        let s = HistoryStore::new(&path, 90);
        assert_eq!(s.load().len(), 2);

        s.save_at(now(), 50.0, "Neutral", "m").unwrap();
        let scores: Vec<f64> = s.load().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![41.0, 52.0, 50.0]);
        assert!(!s.corrupt_path().exists());
    }

    #[test]
    fn huge_retention_keeps_everything_without_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let s = HistoryStore::new(dir.path().join("score_history.json"), 1_000_000_000);
        s.save_at(now() - Duration::days(3650), 20.0, "Extreme Risk Off", "m")
            .unwrap();
        s.save_at(now(), 50.0, "Neutral", "m").unwrap();
        assert_eq!(s.load().len(), 2);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir);
        let ts = now() + Duration::nanoseconds(123_456_789);
        let saved = s
            .save_at(ts, 57.26, "Neutral", "Wait for confirmation")
            .unwrap();
        assert_eq!(saved.score, 57.3);

        let loaded = s.load();
        assert_eq!(loaded, vec![saved.clone()]);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(s.path()).unwrap()).unwrap();
        assert_eq!(
            raw["history"][0]["timestamp"],
            serde_json::json!("2026-03-01T12:00:00.123456Z")
        );
        assert_eq!(raw["history"][0]["status"], serde_json::json!("Neutral"));
    }

    #[test]
    fn prunes_entries_outside_retention() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir);
        for days_ago in [120, 95, 91, 89, 30, 1] {
            s.save_at(now() - Duration::days(days_ago), days_ago as f64, "Neutral", "m")
                .unwrap();
        }
        s.save_at(now(), 50.0, "Neutral", "m").unwrap();

        let cutoff = now() - Duration::days(90);
        let loaded = s.load();
        assert!(loaded.iter().all(|e| e.timestamp > cutoff));
        let scores: Vec<f64> = loaded.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![89.0, 30.0, 1.0, 50.0]);
    }

    #[test]
    fn reads_bare_array_and_naive_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("score_history.json");
        std::fs::write(
            &path,
            r#"[{"timestamp": "2026-02-28T12:00:00.250000", "score": 61.0, "status": "Risk On", "message": "m"}]"#,
        )
        .unwrap();
        let loaded = HistoryStore::new(&path, 90).load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, "Risk On");
    }

    #[test]
    fn single_entry_only_fills_now() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(&dir);
        let saved = s.save_at(now(), 33.0, "Risk Off", "m").unwrap();

        let v = s.historical_values_at(now());
        assert_eq!(v.now, Some(saved));
        assert!(v.yesterday.is_none());
        assert!(v.last_week.is_none());
        assert!(v.last_month.is_none());
    }

    #[test]
    fn picks_closest_entries_per_slot() {
        let entries = vec![
            entry(now() - Duration::days(31), 1.0),
            entry(now() - Duration::days(8), 2.0),
            entry(now() - Duration::hours(25), 3.0),
            entry(now() - Duration::hours(2), 4.0),
            entry(now(), 5.0),
        ];
        let v = select_historical_values(&entries, now());
        assert_eq!(v.now.unwrap().score, 5.0);
        assert_eq!(v.yesterday.unwrap().score, 3.0);
        assert_eq!(v.last_week.unwrap().score, 2.0);
        assert_eq!(v.last_month.unwrap().score, 1.0);
    }

    #[test]
    fn never_reuses_an_entry_across_slots() {
        // Only two entries, both recent: `now` is excluded, so yesterday takes
        // the other one and the older slots stay empty.
        let entries = vec![
            entry(now() - Duration::hours(1), 1.0),
            entry(now(), 2.0),
        ];
        let v = select_historical_values(&entries, now());
        assert_eq!(v.now.unwrap().score, 2.0);
        assert_eq!(v.yesterday.unwrap().score, 1.0);
        assert!(v.last_week.is_none());
        assert!(v.last_month.is_none());
    }

    #[test]
    fn greedy_order_lets_yesterday_claim_first() {
        let entries = vec![
            entry(now() - Duration::days(5), 1.0),
            entry(now() - Duration::days(6), 2.0),
            entry(now(), 3.0),
        ];
        let v = select_historical_values(&entries, now());
        // 5d ago is closest to 1d ago; the week slot gets what remains.
        assert_eq!(v.yesterday.unwrap().score, 1.0);
        assert_eq!(v.last_week.unwrap().score, 2.0);
        assert!(v.last_month.is_none());
    }

    #[test]
    fn now_is_newest_even_if_out_of_order() {
        let entries = vec![
            entry(now(), 9.0),
            entry(now() - Duration::days(1), 1.0),
        ];
        let v = select_historical_values(&entries, now());
        assert_eq!(v.now.unwrap().score, 9.0);
        assert_eq!(v.yesterday.unwrap().score, 1.0);
    }
}
