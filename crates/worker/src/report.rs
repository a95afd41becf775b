use crate::refresh::CycleOutcome;
use chrono::{DateTime, Utc};
use mood_core::domain::history::HistoricalValues;
use mood_core::domain::market::{MarketSnapshot, Mover};
use mood_core::domain::risk::{RiskScoreResult, RiskStatus};
use mood_core::format::{format_large_number, format_percentage, time_until_next_refresh};
use std::fmt::Write;
use std::time::Duration;

const RULE: &str = "────────────────────────────────────────────────────────";

pub fn render(outcome: &CycleOutcome, interval: Duration, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    let next = time_until_next_refresh(Some(outcome.started_at), interval, now);
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "MARKET MOOD MONITOR   data {} ({})   next update: {next}",
        outcome.snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        outcome.snapshot.source.as_str(),
    );
    if outcome.snapshot.using_cached_data() {
        let _ = writeln!(out, "! using cached data: some live sources failed");
    }
    let _ = writeln!(out, "{RULE}");

    render_score(&mut out, &outcome.risk);
    out.push('\n');
    out.push_str(&render_history(&outcome.history));
    out.push('\n');
    render_metrics(&mut out, &outcome.snapshot);
    render_movers(&mut out, &outcome.snapshot);
    let _ = writeln!(out, "Data from CoinGecko & Alternative.me | Not financial advice");

    out
}

fn render_score(out: &mut String, risk: &RiskScoreResult) {
    let _ = writeln!(
        out,
        "{} {:.1}/100  {}  {}",
        risk.emoji, risk.score, risk.status, risk.message
    );

    let Some(c) = risk.components else {
        return;
    };
    let w = risk.weights;
    let rows = [
        ("Fear & Greed", c.fear_greed, w.fear_greed),
        ("BTC Momentum", c.btc_momentum, w.btc_momentum),
        ("Volume Health", c.volume_health, w.volume_health),
        ("Market Breadth", c.market_breadth, w.market_breadth),
    ];
    for (label, value, weight) in rows {
        let _ = writeln!(
            out,
            "  {label:<15} {value:>5.1}  x {:>3.0}%  = {:>5.1}",
            weight * 100.0,
            value * weight
        );
    }
}

/// Machine-readable form of one cycle.
pub fn render_json(outcome: &CycleOutcome) -> anyhow::Result<String> {
    let v = serde_json::json!({
        "started_at": outcome.started_at,
        "risk": outcome.risk,
        "history": outcome.history,
        "snapshot": outcome.snapshot,
        "using_cached_data": outcome.snapshot.using_cached_data(),
    });
    Ok(serde_json::to_string_pretty(&v)? + "\n")
}

pub fn render_history(values: &HistoricalValues) -> String {
    let mut out = String::from("Historical values\n");
    for (label, entry) in values.slots() {
        match entry {
            Some(e) => {
                let emoji = RiskStatus::from_label(&e.status).map_or(" ", |s| s.emoji());
                let _ = writeln!(
                    out,
                    "  {label:<11} {emoji} {:>5.1}  {:<16}  {}",
                    e.score,
                    e.status,
                    e.timestamp.format("%Y-%m-%d %H:%M")
                );
            }
            None => {
                let _ = writeln!(out, "  {label:<11}    --");
            }
        }
    }
    out
}

fn render_metrics(out: &mut String, s: &MarketSnapshot) {
    let _ = writeln!(out, "Metrics");

    match &s.fear_greed {
        Some(fg) => {
            let history: Vec<String> = fg.history_7d.iter().map(|v| v.to_string()).collect();
            let _ = writeln!(
                out,
                "  Fear & Greed    {} ({})  7d: {}",
                fg.value,
                fg.classification,
                history.join(" ")
            );
        }
        None => {
            let _ = writeln!(out, "  Fear & Greed    --");
        }
    }

    match &s.bitcoin {
        Some(b) => {
            let _ = writeln!(
                out,
                "  BTC             ${:.0}  {}",
                b.price_usd,
                format_percentage(b.price_change_24h, 1)
            );
        }
        None => {
            let _ = writeln!(out, "  BTC             --");
        }
    }

    match &s.global_market {
        Some(g) => {
            let _ = writeln!(
                out,
                "  24h Volume      {}  (market cap {})",
                format_large_number(g.total_volume_24h_usd),
                format_large_number(g.total_market_cap_usd)
            );
            let _ = writeln!(
                out,
                "  Dominance       BTC {:.1}%  ETH {:.1}%",
                g.btc_dominance, g.eth_dominance
            );
        }
        None => {
            let _ = writeln!(out, "  24h Volume      --");
        }
    }

    match s.market_breadth {
        Some(b) => {
            let _ = writeln!(out, "  Breadth         {b:.0}% of top 100 green");
        }
        None => {
            let _ = writeln!(out, "  Breadth         --");
        }
    }
}

fn render_movers(out: &mut String, s: &MarketSnapshot) {
    let Some(movers) = &s.top_movers else {
        return;
    };
    let line = |list: &[Mover]| -> String {
        list.iter()
            .map(|m| format!("{} {}", m.symbol, format_percentage(m.price_change_24h, 1)))
            .collect::<Vec<_>>()
            .join("  ")
    };
    let _ = writeln!(out, "Top gainers     {}", line(movers.gainers.as_slice()));
    let _ = writeln!(out, "Top losers      {}", line(movers.losers.as_slice()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mood_core::domain::history::HistoryEntry;
    use mood_core::domain::market::{DataSource, TopMovers};
    use mood_core::domain::risk::{ScoreComponents, ScoreWeights};

    fn outcome(source: DataSource) -> CycleOutcome {
        let ts = Utc.with_ymd_and_hms(2026, 1, 27, 10, 0, 0).unwrap();
        let mut snapshot = MarketSnapshot::empty(ts);
        snapshot.source = source;
        snapshot.market_breadth = Some(62.0);
        snapshot.top_movers = Some(TopMovers {
            gainers: vec![Mover {
                symbol: "SOL".to_string(),
                name: "Solana".to_string(),
                price_change_24h: 8.25,
            }],
            losers: vec![],
        });

        let status = RiskStatus::RiskOn;
        CycleOutcome {
            started_at: ts,
            snapshot,
            risk: RiskScoreResult {
                score: 66.5,
                status,
                color: status.color().to_string(),
                emoji: status.emoji().to_string(),
                message: status.message().to_string(),
                components: Some(ScoreComponents {
                    fear_greed: 70.0,
                    btc_momentum: 65.0,
                    volume_health: 65.0,
                    market_breadth: 62.0,
                }),
                weights: ScoreWeights::default(),
                timestamp: ts,
                explanation_prompt: String::new(),
            },
            history: HistoricalValues {
                now: Some(HistoryEntry {
                    timestamp: ts,
                    score: 66.5,
                    status: "Risk On".to_string(),
                    message: String::new(),
                }),
                ..HistoricalValues::default()
            },
            saved: None,
        }
    }

    #[test]
    fn report_includes_score_history_and_movers() {
        let o = outcome(DataSource::Live);
        let now = o.started_at + chrono::Duration::seconds(28);
        let text = render(&o, Duration::from_secs(600), now);

        assert!(text.contains("66.5/100  Risk On"));
        assert!(text.contains("next update: 9m 32s"));
        assert!(text.contains("Yesterday      --"));
        assert!(text.contains("SOL +8.2%") || text.contains("SOL +8.3%"));
        assert!(text.contains("Breadth         62% of top 100 green"));
        assert!(!text.contains("using cached data"));
    }

    #[test]
    fn json_output_uses_band_labels() {
        let o = outcome(DataSource::MemoryCache);
        let v: serde_json::Value = serde_json::from_str(&render_json(&o).unwrap()).unwrap();
        assert_eq!(v["risk"]["status"], serde_json::json!("Risk On"));
        assert_eq!(v["snapshot"]["source"], serde_json::json!("memory_cache"));
        assert_eq!(v["using_cached_data"], serde_json::json!(true));
        assert!(v["history"]["yesterday"].is_null());
    }

    #[test]
    fn report_flags_cached_data() {
        let o = outcome(DataSource::DiskCache);
        let text = render(&o, Duration::from_secs(600), o.started_at);
        assert!(text.contains("(disk cache)"));
        assert!(text.contains("using cached data"));
        assert!(text.contains("Fear & Greed    --"));
    }
}
