use anyhow::ensure;

/// Piecewise-constant step function over `(cutoff, score)` pairs.
///
/// Steps are scanned in order and the first one with `value >= cutoff` wins;
/// values below every cutoff map to `floor`. Cutoffs must be strictly
/// decreasing and scores non-increasing, so the function is monotonically
/// non-decreasing in its input.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    name: &'static str,
    steps: Vec<(f64, f64)>,
    floor: f64,
}

impl ThresholdTable {
    pub fn new(name: &'static str, steps: Vec<(f64, f64)>, floor: f64) -> anyhow::Result<Self> {
        ensure!(!steps.is_empty(), "{name}: threshold table must be non-empty");
        ensure!(
            floor.is_finite() && (0.0..=100.0).contains(&floor),
            "{name}: floor score must be within 0..=100 (got {floor})"
        );

        for &(cutoff, score) in &steps {
            ensure!(cutoff.is_finite(), "{name}: cutoff must be finite");
            ensure!(
                score.is_finite() && (0.0..=100.0).contains(&score),
                "{name}: score must be within 0..=100 (got {score})"
            );
        }

        for pair in steps.windows(2) {
            let (hi_cut, hi_score) = pair[0];
            let (lo_cut, lo_score) = pair[1];
            ensure!(
                hi_cut > lo_cut,
                "{name}: cutoffs must be strictly decreasing ({hi_cut} then {lo_cut})"
            );
            ensure!(
                hi_score >= lo_score,
                "{name}: scores must be non-increasing ({hi_score} then {lo_score})"
            );
        }

        let last_score = steps[steps.len() - 1].1;
        ensure!(
            floor <= last_score,
            "{name}: floor {floor} must not exceed the lowest step score {last_score}"
        );

        Ok(Self { name, steps, floor })
    }

    /// 24h BTC % change → momentum score.
    pub fn btc_momentum() -> anyhow::Result<Self> {
        Self::new(
            "btc_momentum",
            vec![
                (10.0, 90.0),
                (5.0, 75.0),
                (2.0, 65.0),
                (0.0, 55.0),
                (-2.0, 45.0),
                (-5.0, 35.0),
                (-10.0, 25.0),
                (-15.0, 10.0),
            ],
            5.0,
        )
    }

    /// 24h volume as % of total market cap → volume health score.
    pub fn volume_health() -> anyhow::Result<Self> {
        Self::new(
            "volume_health",
            vec![
                (10.0, 100.0),
                (8.0, 95.0),
                (6.0, 80.0),
                (4.0, 65.0),
                (2.0, 50.0),
            ],
            35.0,
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of buckets, floor included.
    pub fn buckets(&self) -> usize {
        self.steps.len() + 1
    }

    pub fn lookup(&self, value: f64) -> f64 {
        self.steps
            .iter()
            .find(|(cutoff, _)| value >= *cutoff)
            .map(|(_, score)| *score)
            .unwrap_or(self.floor)
    }
}
