use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    #[serde(rename = "Extreme Risk Off")]
    ExtremeRiskOff,
    #[serde(rename = "Risk Off")]
    RiskOff,
    Neutral,
    #[serde(rename = "Risk On")]
    RiskOn,
    #[serde(rename = "Extreme Risk On")]
    ExtremeRiskOn,
    /// Score fell outside every band. Only reachable for non-finite scores.
    Unknown,
    /// Calculation failed and the neutral fallback was used.
    Error,
}

impl RiskStatus {
    /// The five bands, lowest first.
    pub const BANDS: [RiskStatus; 5] = [
        RiskStatus::ExtremeRiskOff,
        RiskStatus::RiskOff,
        RiskStatus::Neutral,
        RiskStatus::RiskOn,
        RiskStatus::ExtremeRiskOn,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskStatus::ExtremeRiskOff => "Extreme Risk Off",
            RiskStatus::RiskOff => "Risk Off",
            RiskStatus::Neutral => "Neutral",
            RiskStatus::RiskOn => "Risk On",
            RiskStatus::ExtremeRiskOn => "Extreme Risk On",
            RiskStatus::Unknown => "Unknown",
            RiskStatus::Error => "Error",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskStatus::ExtremeRiskOff => "#ef4444",
            RiskStatus::RiskOff => "#f97316",
            RiskStatus::Neutral => "#eab308",
            RiskStatus::RiskOn => "#10b981",
            RiskStatus::ExtremeRiskOn => "#22c55e",
            RiskStatus::Unknown | RiskStatus::Error => "#808080",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            RiskStatus::ExtremeRiskOff => "🔴",
            RiskStatus::RiskOff => "🟠",
            RiskStatus::Neutral => "🟡",
            RiskStatus::RiskOn => "🟢",
            RiskStatus::ExtremeRiskOn => "💚",
            RiskStatus::Unknown | RiskStatus::Error => "⚪",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RiskStatus::ExtremeRiskOff => "Protect capital mode - Market showing extreme weakness",
            RiskStatus::RiskOff => "Cautious positioning - Defensive stance recommended",
            RiskStatus::Neutral => "Wait for confirmation - No clear directional bias",
            RiskStatus::RiskOn => "Constructive conditions - Market showing strength",
            RiskStatus::ExtremeRiskOn => "Maximum exposure justified - Strong bullish momentum",
            RiskStatus::Unknown => "Unable to determine market status",
            RiskStatus::Error => "Unable to calculate risk score due to data issues",
        }
    }

    /// Inclusive upper bound of the band; `None` for the non-band statuses.
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            RiskStatus::ExtremeRiskOff => Some(30.0),
            RiskStatus::RiskOff => Some(45.0),
            RiskStatus::Neutral => Some(60.0),
            RiskStatus::RiskOn => Some(80.0),
            RiskStatus::ExtremeRiskOn => Some(100.0),
            RiskStatus::Unknown | RiskStatus::Error => None,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            RiskStatus::ExtremeRiskOff,
            RiskStatus::RiskOff,
            RiskStatus::Neutral,
            RiskStatus::RiskOn,
            RiskStatus::ExtremeRiskOn,
            RiskStatus::Unknown,
            RiskStatus::Error,
        ]
        .into_iter()
        .find(|s| s.label() == label)
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub fear_greed: f64,
    pub btc_momentum: f64,
    pub volume_health: f64,
    pub market_breadth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub fear_greed: f64,
    pub btc_momentum: f64,
    pub volume_health: f64,
    pub market_breadth: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            fear_greed: 0.35,
            btc_momentum: 0.25,
            volume_health: 0.20,
            market_breadth: 0.20,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> anyhow::Result<()> {
        let parts = [
            self.fear_greed,
            self.btc_momentum,
            self.volume_health,
            self.market_breadth,
        ];
        for w in parts {
            anyhow::ensure!(
                w.is_finite() && (0.0..=1.0).contains(&w),
                "weight must be between 0 and 1 (got {w})"
            );
        }
        let sum: f64 = parts.iter().sum();
        anyhow::ensure!(
            (sum - 1.0).abs() < 1e-9,
            "weights must sum to 1 (got {sum})"
        );
        Ok(())
    }

    pub fn apply(&self, c: &ScoreComponents) -> f64 {
        c.fear_greed * self.fear_greed
            + c.btc_momentum * self.btc_momentum
            + c.volume_health * self.volume_health
            + c.market_breadth * self.market_breadth
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreResult {
    /// 0..=100, one decimal.
    pub score: f64,
    pub status: RiskStatus,
    pub color: String,
    pub emoji: String,
    pub message: String,
    /// `None` when the fallback result was used.
    pub components: Option<ScoreComponents>,
    pub weights: ScoreWeights,
    pub timestamp: DateTime<Utc>,
    pub explanation_prompt: String,
}

impl RiskScoreResult {
    pub fn is_fallback(&self) -> bool {
        self.status == RiskStatus::Error
    }
}
