// =============================================================================
// RegimeWeightTable: validated, immutable regime lookup
// =============================================================================
//
// Built once at engine construction and shared read-only afterwards.  Every
// regime has a preset, so lookups never fail; unknown labels resolve to a
// single configured default at both the timeframe blend and the category
// weight lookup.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::WeightError;
use crate::regime::{Regime, RegimePreset};

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeWeightTable {
    trending_bull: RegimePreset,
    choppy: RegimePreset,
    high_vol: RegimePreset,
    default_regime: Regime,
}

impl RegimeWeightTable {
    /// The built-in presets with `TrendingBull` as the default.
    pub fn builtin() -> Self {
        Self {
            trending_bull: RegimePreset::builtin(Regime::TrendingBull),
            choppy: RegimePreset::builtin(Regime::Choppy),
            high_vol: RegimePreset::builtin(Regime::HighVol),
            default_regime: Regime::TrendingBull,
        }
    }

    /// Build from explicit presets.  Every regime must be present, every
    /// category table must pass validation and every timeframe weight must be
    /// finite and non-negative.
    pub fn new(
        presets: BTreeMap<Regime, RegimePreset>,
        default_regime: Regime,
    ) -> Result<Self, WeightError> {
        let take = |regime: Regime| -> Result<RegimePreset, WeightError> {
            let preset = presets
                .get(&regime)
                .copied()
                .ok_or_else(|| WeightError::UnknownRegimePreset(regime.to_string()))?;
            preset.category.validate(regime.as_str())?;
            preset.timeframe.validate(regime.as_str())?;
            Ok(preset)
        };

        let table = Self {
            trending_bull: take(Regime::TrendingBull)?,
            choppy: take(Regime::Choppy)?,
            high_vol: take(Regime::HighVol)?,
            default_regime,
        };

        info!(
            default_regime = %default_regime,
            regimes = Regime::ALL.len(),
            "regime weight table validated"
        );

        Ok(table)
    }

    pub fn default_regime(&self) -> Regime {
        self.default_regime
    }

    /// Resolve a regime label.  The flag is `false` when the label was not
    /// recognised and the default was substituted.
    pub fn resolve(&self, label: &str) -> (Regime, bool) {
        match Regime::parse(label) {
            Some(regime) => (regime, true),
            None => {
                warn!(
                    label,
                    fallback = %self.default_regime,
                    "unknown regime label, using default"
                );
                (self.default_regime, false)
            }
        }
    }

    pub fn preset(&self, regime: Regime) -> &RegimePreset {
        match regime {
            Regime::TrendingBull => &self.trending_bull,
            Regime::Choppy => &self.choppy,
            Regime::HighVol => &self.high_vol,
        }
    }

    /// Resolve `label` and return its preset.
    pub fn lookup(&self, label: &str) -> (Regime, &RegimePreset) {
        let (regime, _) = self.resolve(label);
        (regime, self.preset(regime))
    }
}

impl Default for RegimeWeightTable {
    fn default() -> Self {
        Self::builtin()
    }
}
