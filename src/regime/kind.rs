// =============================================================================
// Market Regime
// =============================================================================
//
// Three regimes select the active weight preset:
//
//   TRENDING_BULL : persistent upside, longer timeframes still count
//   CHOPPY        : mean-reverting, mid timeframes dominate
//   HIGH_VOL      : wide swings, 7d momentum ignored entirely
//
// Legacy labels are accepted on input: normal → trending_bull,
// calm → choppy, volatile → high_vol.

use serde::{Deserialize, Serialize};

/// High-level market regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Persistent directional move to the upside.
    TrendingBull,
    /// Sideways chop.
    Choppy,
    /// Extreme volatility expansion.
    HighVol,
}

impl Regime {
    pub const ALL: [Regime; 3] = [Self::TrendingBull, Self::Choppy, Self::HighVol];

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrendingBull => "trending_bull",
            Self::Choppy => "choppy",
            Self::HighVol => "high_vol",
        }
    }

    /// Parse a canonical name or legacy alias (case-insensitive, trimmed).
    ///
    /// Returns `None` for anything unrecognised; the caller decides the
    /// default.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "trending_bull" | "normal" => Some(Self::TrendingBull),
            "choppy" | "calm" => Some(Self::Choppy),
            "high_vol" | "volatile" => Some(Self::HighVol),
            _ => None,
        }
    }
}

impl Default for Regime {
    fn default() -> Self {
        Self::TrendingBull
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
