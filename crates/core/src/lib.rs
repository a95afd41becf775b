pub mod domain;
pub mod format;
pub mod ingest;
pub mod scoring;
pub mod storage;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
    pub const DEFAULT_FEAR_GREED_URL: &str = "https://api.alternative.me/fng/";
    pub const DEFAULT_HISTORY_PATH: &str = "data/score_history.json";
    pub const DEFAULT_SNAPSHOT_PATH: &str = "data/last_snapshot.json";

    const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_API_REQ_DELAY_MS: u64 = 500;
    const DEFAULT_API_RETRIES: u32 = 1;
    const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 600;
    const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;
    const MAX_HISTORY_RETENTION_DAYS: i64 = 36_500;
    const DEFAULT_HISTORY_RETENTION_DAYS: i64 = 90;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub coingecko_base_url: String,
        pub fear_greed_url: String,
        pub api_timeout: Duration,
        pub api_req_delay: Duration,
        pub api_retries: u32,
        pub refresh_interval: Duration,
        pub history_path: PathBuf,
        pub snapshot_path: PathBuf,
        pub history_retention_days: i64,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                coingecko_base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
                fear_greed_url: DEFAULT_FEAR_GREED_URL.to_string(),
                api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
                api_req_delay: Duration::from_millis(DEFAULT_API_REQ_DELAY_MS),
                api_retries: DEFAULT_API_RETRIES,
                refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
                history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
                snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
                history_retention_days: DEFAULT_HISTORY_RETENTION_DAYS,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();

            let api_timeout_secs = parse_env::<u64>("API_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_API_TIMEOUT_SECS);
            let api_req_delay_ms = parse_env::<u64>("API_REQ_DELAY_MS")?
                .unwrap_or(DEFAULT_API_REQ_DELAY_MS);
            let refresh_secs = parse_env::<u64>("REFRESH_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);

            let settings = Self {
                coingecko_base_url: non_empty_env("COINGECKO_BASE_URL")
                    .unwrap_or(defaults.coingecko_base_url),
                fear_greed_url: non_empty_env("FEAR_GREED_URL").unwrap_or(defaults.fear_greed_url),
                api_timeout: Duration::from_secs(api_timeout_secs),
                api_req_delay: Duration::from_millis(api_req_delay_ms),
                api_retries: parse_env::<u32>("API_RETRIES")?.unwrap_or(DEFAULT_API_RETRIES),
                refresh_interval: Duration::from_secs(refresh_secs),
                history_path: non_empty_env("HISTORY_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.history_path),
                snapshot_path: non_empty_env("SNAPSHOT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.snapshot_path),
                history_retention_days: parse_env::<i64>("HISTORY_RETENTION_DAYS")?
                    .unwrap_or(DEFAULT_HISTORY_RETENTION_DAYS),
                sentry_dsn: non_empty_env("SENTRY_DSN"),
            };

            settings.validate()?;
            Ok(settings)
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(self.api_retries >= 1, "API_RETRIES must be >= 1");
            anyhow::ensure!(
                !self.refresh_interval.is_zero()
                    && self.refresh_interval.as_secs() <= MAX_REFRESH_INTERVAL_SECS,
                "REFRESH_INTERVAL_SECS must be in 1..={MAX_REFRESH_INTERVAL_SECS} (got {})",
                self.refresh_interval.as_secs()
            );
            anyhow::ensure!(
                (1..=MAX_HISTORY_RETENTION_DAYS).contains(&self.history_retention_days),
                "HISTORY_RETENTION_DAYS must be in 1..={MAX_HISTORY_RETENTION_DAYS} (got {})",
                self.history_retention_days
            );
            Ok(())
        }
    }

    fn non_empty_env(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    fn parse_env<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match non_empty_env(key) {
            Some(s) => {
                let v = s
                    .trim()
                    .parse::<T>()
                    .with_context(|| format!("{key} is not a valid number: {s}"))?;
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }

}
