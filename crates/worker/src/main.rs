use anyhow::Context;
use clap::Parser;
use mood_core::config::Settings;
use mood_core::ingest::{HttpMarketDataProvider, MarketDataFetcher};
use mood_core::scoring::RiskScoreCalculator;
use mood_core::storage::{HistoryStore, SnapshotStore};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod refresh;
mod report;

#[derive(Debug, Parser)]
#[command(name = "mood_worker")]
struct Args {
    /// Run a single refresh cycle and exit.
    #[arg(long)]
    once: bool,

    /// Do everything except writing to the score history.
    #[arg(long)]
    dry_run: bool,

    /// Print each cycle as JSON instead of the text report.
    #[arg(long)]
    json: bool,

    /// Print the stored historical values and exit without fetching.
    #[arg(long)]
    history_only: bool,

    /// Seconds between refreshes. Defaults to REFRESH_INTERVAL_SECS.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Score history file. Defaults to HISTORY_PATH.
    #[arg(long)]
    history_path: Option<PathBuf>,

    /// Last-good snapshot file. Defaults to SNAPSHOT_PATH.
    #[arg(long)]
    snapshot_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    apply_args(&mut settings, &args)?;

    let history = HistoryStore::from_settings(&settings);

    if args.history_only {
        let values = history.historical_values();
        print!("{}", report::render_history(&values));
        return Ok(());
    }

    let calculator = RiskScoreCalculator::new().context("invalid scoring configuration")?;
    let provider = HttpMarketDataProvider::from_settings(&settings)?;
    let fetcher =
        MarketDataFetcher::new(provider).with_snapshot_store(SnapshotStore::from_settings(&settings));

    tracing::info!(
        history_path = %settings.history_path.display(),
        snapshot_path = %settings.snapshot_path.display(),
        interval_secs = settings.refresh_interval.as_secs(),
        dry_run = args.dry_run,
        once = args.once,
        "mood worker starting"
    );

    let mut worker = refresh::RefreshWorker::new(
        fetcher,
        calculator,
        history,
        settings.refresh_interval,
        args.dry_run,
    );
    let interval = worker.interval();

    let json = args.json;
    let emit = move |outcome: &refresh::CycleOutcome| {
        if json {
            match report::render_json(outcome) {
                Ok(text) => print!("{text}"),
                Err(err) => tracing::error!(error = %err, "failed to render cycle as JSON"),
            }
        } else {
            print!("{}", report::render(outcome, interval, chrono::Utc::now()));
        }
    };

    if args.once {
        let outcome = worker.run_cycle().await;
        emit(&outcome);
        return Ok(());
    }

    worker.run_until(shutdown_signal(), emit).await
}

fn apply_args(settings: &mut Settings, args: &Args) -> anyhow::Result<()> {
    if let Some(secs) = args.interval_secs {
        settings.refresh_interval = Duration::from_secs(secs);
    }
    if let Some(p) = &args.history_path {
        settings.history_path = p.clone();
    }
    if let Some(p) = &args.snapshot_path {
        settings.snapshot_path = p.clone();
    }
    settings.validate()
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl-C; shutting down"),
        _ = terminate => tracing::info!("received SIGTERM; shutting down"),
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
