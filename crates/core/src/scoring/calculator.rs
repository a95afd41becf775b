use crate::domain::market::MarketSnapshot;
use crate::domain::risk::{RiskScoreResult, RiskStatus, ScoreComponents, ScoreWeights};
use crate::scoring::thresholds::ThresholdTable;
use anyhow::ensure;
use chrono::{DateTime, Utc};

const NEUTRAL_SCORE: f64 = 50.0;
const DEFAULT_FEAR_GREED: f64 = 50.0;
const DEFAULT_MARKET_BREADTH: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct RiskScoreCalculator {
    momentum: ThresholdTable,
    volume: ThresholdTable,
    weights: ScoreWeights,
}

impl RiskScoreCalculator {
    /// Builds the calculator with the stock tables and weights, validating all of them.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(
            ThresholdTable::btc_momentum()?,
            ThresholdTable::volume_health()?,
            ScoreWeights::default(),
        )
    }

    pub fn with_config(
        momentum: ThresholdTable,
        volume: ThresholdTable,
        weights: ScoreWeights,
    ) -> anyhow::Result<Self> {
        weights.validate()?;
        tracing::debug!(
            momentum_table = momentum.name(),
            momentum_buckets = momentum.buckets(),
            volume_table = volume.name(),
            volume_buckets = volume.buckets(),
            "risk score calculator configured"
        );
        Ok(Self {
            momentum,
            volume,
            weights,
        })
    }

    pub fn btc_momentum(&self, price_change_24h: f64) -> f64 {
        self.momentum.lookup(price_change_24h)
    }

    /// Score for 24h volume relative to total market cap (as a percentage).
    pub fn volume_health(&self, volume_24h_usd: f64, total_market_cap_usd: f64) -> f64 {
        let ratio = if total_market_cap_usd > 0.0 {
            volume_24h_usd / total_market_cap_usd * 100.0
        } else {
            0.0
        };
        self.volume.lookup(ratio)
    }

    /// Never fails: any problem with the inputs yields the neutral fallback result.
    pub fn calculate_risk_score(&self, snapshot: &MarketSnapshot) -> RiskScoreResult {
        match self.try_calculate(snapshot) {
            Ok(result) => {
                tracing::info!(
                    score = result.score,
                    status = %result.status,
                    source = snapshot.source.as_str(),
                    "risk score calculated"
                );
                result
            }
            Err(err) => {
                tracing::error!(error = %err, "risk score calculation failed; using fallback");
                self.fallback(Utc::now())
            }
        }
    }

    fn try_calculate(&self, snapshot: &MarketSnapshot) -> anyhow::Result<RiskScoreResult> {
        let fear_greed = snapshot
            .fear_greed
            .as_ref()
            .map(|fg| f64::from(fg.value))
            .unwrap_or(DEFAULT_FEAR_GREED);
        ensure!(
            (0.0..=100.0).contains(&fear_greed),
            "fear & greed value out of range: {fear_greed}"
        );

        let market_breadth = snapshot.market_breadth.unwrap_or(DEFAULT_MARKET_BREADTH);
        ensure!(
            (0.0..=100.0).contains(&market_breadth),
            "market breadth out of range: {market_breadth}"
        );

        let price_change_24h = snapshot
            .bitcoin
            .as_ref()
            .map(|b| b.price_change_24h)
            .unwrap_or(0.0);
        ensure!(
            price_change_24h.is_finite(),
            "BTC 24h change is not finite"
        );

        let (volume, market_cap) = snapshot
            .global_market
            .as_ref()
            .map(|g| (g.total_volume_24h_usd, g.total_market_cap_usd))
            .unwrap_or((0.0, 0.0));
        ensure!(
            volume.is_finite() && market_cap.is_finite(),
            "global volume / market cap is not finite"
        );

        let components = ScoreComponents {
            fear_greed,
            btc_momentum: self.btc_momentum(price_change_24h),
            volume_health: self.volume_health(volume, market_cap),
            market_breadth,
        };
        tracing::debug!(
            fear_greed = components.fear_greed,
            btc_momentum = components.btc_momentum,
            volume_health = components.volume_health,
            market_breadth = components.market_breadth,
            "score components"
        );

        let score = round1(self.weights.apply(&components).clamp(0.0, 100.0));
        let status = risk_status(score);

        Ok(RiskScoreResult {
            score,
            status,
            color: status.color().to_string(),
            emoji: status.emoji().to_string(),
            message: status.message().to_string(),
            components: Some(components),
            weights: self.weights,
            timestamp: snapshot.timestamp,
            explanation_prompt: explanation_prompt(score, &components),
        })
    }

    fn fallback(&self, timestamp: DateTime<Utc>) -> RiskScoreResult {
        let status = RiskStatus::Error;
        RiskScoreResult {
            score: NEUTRAL_SCORE,
            status,
            color: status.color().to_string(),
            emoji: status.emoji().to_string(),
            message: status.message().to_string(),
            components: None,
            weights: self.weights,
            timestamp,
            explanation_prompt: String::new(),
        }
    }
}

/// Maps a 0-100 score onto its band; bands are keyed by inclusive upper bound.
pub fn risk_status(score: f64) -> RiskStatus {
    if !(0.0..=100.0).contains(&score) {
        return RiskStatus::Unknown;
    }
    RiskStatus::BANDS
        .into_iter()
        .find(|band| band.upper_bound().is_some_and(|upper| score <= upper))
        .unwrap_or(RiskStatus::Unknown)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn explanation_prompt(score: f64, c: &ScoreComponents) -> String {
    format!(
        "Market Risk Score is {score:.1}/100. Fear & Greed: {}, BTC Momentum: {}, \
         Volume Health: {}, Market Breadth: {:.1}%. Explain market conditions in one sentence.",
        c.fear_greed, c.btc_momentum, c.volume_health, c.market_breadth
    )
}
