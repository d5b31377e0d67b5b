// =============================================================================
// Gate Thresholds
// =============================================================================

use serde::{Deserialize, Serialize};

fn default_min_composite_score() -> f64 {
    75.0
}

fn default_min_vadr() -> f64 {
    1.8
}

fn default_max_funding_z() -> f64 {
    0.0
}

fn default_max_bar_age() -> u32 {
    2
}

fn default_max_atr_multiple() -> f64 {
    1.2
}

fn default_max_spread_bps() -> f64 {
    50.0
}

fn default_min_depth_usd() -> f64 {
    100_000.0
}

fn default_depth_band_pct() -> f64 {
    2.0
}

fn default_min_micro_vadr() -> f64 {
    1.75
}

fn default_fatigue_momentum_pct() -> f64 {
    12.0
}

fn default_fatigue_rsi() -> f64 {
    70.0
}

fn default_max_execution_delay_ms() -> i64 {
    30_000
}

/// Limits for the ten entry gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    /// Minimum internal composite score.
    #[serde(default = "default_min_composite_score")]
    pub min_composite_score: f64,

    #[serde(default = "default_min_vadr")]
    pub min_vadr: f64,

    /// Funding z-score must be at or below this (negative = divergence).
    #[serde(default = "default_max_funding_z")]
    pub max_funding_z: f64,

    /// Maximum signal bar age, in bars.
    #[serde(default = "default_max_bar_age")]
    pub max_bar_age: u32,

    /// Maximum distance from the trigger price, in multiples of ATR.
    #[serde(default = "default_max_atr_multiple")]
    pub max_atr_multiple: f64,

    /// Spread must be strictly below this.
    #[serde(default = "default_max_spread_bps")]
    pub max_spread_bps: f64,

    #[serde(default = "default_min_depth_usd")]
    pub min_depth_usd: f64,

    /// Price band (± percent) over which depth is measured.
    #[serde(default = "default_depth_band_pct")]
    pub depth_band_pct: f64,

    #[serde(default = "default_min_micro_vadr")]
    pub min_micro_vadr: f64,

    /// Fatigue blocks when |24h momentum| exceeds this AND RSI4h exceeds
    /// `fatigue_rsi`.
    #[serde(default = "default_fatigue_momentum_pct")]
    pub fatigue_momentum_pct: f64,

    #[serde(default = "default_fatigue_rsi")]
    pub fatigue_rsi: f64,

    #[serde(default = "default_max_execution_delay_ms")]
    pub max_execution_delay_ms: i64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_composite_score: default_min_composite_score(),
            min_vadr: default_min_vadr(),
            max_funding_z: default_max_funding_z(),
            max_bar_age: default_max_bar_age(),
            max_atr_multiple: default_max_atr_multiple(),
            max_spread_bps: default_max_spread_bps(),
            min_depth_usd: default_min_depth_usd(),
            depth_band_pct: default_depth_band_pct(),
            min_micro_vadr: default_min_micro_vadr(),
            fatigue_momentum_pct: default_fatigue_momentum_pct(),
            fatigue_rsi: default_fatigue_rsi(),
            max_execution_delay_ms: default_max_execution_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let t: GateThresholds = serde_json::from_str(r#"{ "min_depth_usd": 250000 }"#).unwrap();
        assert!((t.min_depth_usd - 250_000.0).abs() < f64::EPSILON);
        assert!((t.min_composite_score - 75.0).abs() < f64::EPSILON);
        assert_eq!(t.max_bar_age, 2);
        assert_eq!(t.max_execution_delay_ms, 30_000);
    }
}
