// =============================================================================
// Scoring Input
// =============================================================================
//
// Raw, per-(symbol, timestamp) factor readings handed to the scorer.  Units
// are the natural ones for each signal (percent returns, 0-100 oscillators,
// USD notionals); the factor builder applies the fixed scaling.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Percent returns over the five momentum timeframes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentumReturns {
    #[serde(rename = "1h")]
    pub r1h: f64,
    #[serde(rename = "4h")]
    pub r4h: f64,
    #[serde(rename = "12h")]
    pub r12h: f64,
    #[serde(rename = "24h")]
    pub r24h: f64,
    #[serde(rename = "7d")]
    pub r7d: f64,
}

impl MomentumReturns {
    pub fn as_array(&self) -> [f64; 5] {
        [self.r1h, self.r4h, self.r12h, self.r24h, self.r7d]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignals {
    /// RSI on the 4h timeframe, 0-100.
    pub rsi_4h: f64,
    /// ADX on the 1h timeframe, 0-100.
    pub adx_1h: f64,
    /// Hurst exponent, already 0-1.
    pub hurst: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeSignals {
    /// Volume relative to its average (1.0 = normal).
    pub volume_surge: f64,
    /// Normalised open interest change.
    pub delta_oi: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySignals {
    /// Open interest notional, USD.
    pub oi_absolute: f64,
    /// Exchange reserve health, 0-1.
    pub reserve_ratio: f64,
    /// Net ETF flows, USD.
    pub etf_flows: f64,
    /// Venue health, 0-1.
    pub venue_health: f64,
}

/// Price and volume bars used for the catalyst factor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalystSeries {
    #[serde(default)]
    pub prices: Vec<f64>,
    #[serde(default)]
    pub volumes: Vec<f64>,
}

/// Applied after the internal score is final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialSignals {
    pub social_score: f64,
    pub brand_score: f64,
}

impl SocialSignals {
    /// Average of both subscores clamped to `[0, cap]`; non-finite reads as 0.
    /// A negative or NaN cap reads as 0.
    pub fn capped(&self, cap: f64) -> f64 {
        let avg = (self.social_score + self.brand_score) / 2.0;
        if !avg.is_finite() {
            return 0.0;
        }
        avg.clamp(0.0, cap.max(0.0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringInput {
    pub symbol: String,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,

    pub momentum: MomentumReturns,
    pub technical: TechnicalSignals,
    pub volume: VolumeSignals,
    pub quality: QualitySignals,

    #[serde(default)]
    pub catalyst: CatalystSeries,
    #[serde(default)]
    pub social: SocialSignals,

    /// Regime label; legacy aliases accepted.
    #[serde(default)]
    pub regime: String,

    /// Signal name → provider that supplied it.
    #[serde(default)]
    pub data_sources: BTreeMap<String, String>,
}
