pub mod calculator;
pub mod thresholds;

pub use calculator::{risk_status, RiskScoreCalculator};
pub use thresholds::ThresholdTable;
