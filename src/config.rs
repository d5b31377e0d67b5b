// =============================================================================
// Engine Configuration: regime weights, gate thresholds and caps
// =============================================================================
//
// Every tunable of the decision core lives here.  All fields carry serde
// defaults so that an empty `{}` file yields the built-in configuration and
// adding new fields never breaks loading an older file.
//
// Regime weight maps stay string-keyed in JSON; `regime_table()` validates
// them once and hands the scorer an immutable `RegimeWeightTable`.
//
// Persistence uses an atomic tmp + rename pattern.
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{InvalidSetting, WeightError};
use crate::gates::GateThresholds;
use crate::regime::{CategoryWeights, Regime, RegimePreset, RegimeWeightTable, TimeframeWeights};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_regime() -> String {
    Regime::TrendingBull.as_str().to_string()
}

fn default_orthogonality_tolerance() -> f64 {
    0.01
}

fn default_social_cap() -> f64 {
    10.0
}

fn default_measurement_boost_cap() -> f64 {
    4.0
}

fn default_regimes() -> BTreeMap<String, RegimeConfig> {
    Regime::ALL
        .iter()
        .map(|r| {
            let preset = RegimePreset::builtin(*r);
            (
                r.as_str().to_string(),
                RegimeConfig {
                    category: preset.category.to_map(),
                    timeframe: preset.timeframe,
                },
            )
        })
        .collect()
}

// =============================================================================
// RegimeConfig
// =============================================================================

/// Weights for one regime as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// momentum_core / technical_resid / supply_demand_block / catalyst_block.
    pub category: BTreeMap<String, f64>,

    /// 1h / 4h / 12h / 24h / 7d MomentumCore blend.
    pub timeframe: TimeframeWeights,
}

// =============================================================================
// EngineConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Regime used when an input carries an unrecognised label.
    #[serde(default = "default_regime")]
    pub default_regime: String,

    /// Maximum |dot| between any two orthogonalized factors.
    #[serde(default = "default_orthogonality_tolerance")]
    pub orthogonality_tolerance: f64,

    /// Per-regime weights, keyed by regime name (legacy aliases accepted).
    #[serde(default = "default_regimes")]
    pub regimes: BTreeMap<String, RegimeConfig>,

    #[serde(default)]
    pub gates: GateThresholds,

    /// Upper bound of the social overlay.
    #[serde(default = "default_social_cap")]
    pub social_cap: f64,

    /// Upper bound of the external measurements boost.
    #[serde(default = "default_measurement_boost_cap")]
    pub measurement_boost_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_regime: default_regime(),
            orthogonality_tolerance: default_orthogonality_tolerance(),
            regimes: default_regimes(),
            gates: GateThresholds::default(),
            social_cap: default_social_cap(),
            measurement_boost_cap: default_measurement_boost_cap(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            default_regime = %config.default_regime,
            regimes = config.regimes.len(),
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist to `path` using an atomic write (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Tolerance and caps must be finite and non-negative.
    pub fn validate_settings(&self) -> std::result::Result<(), InvalidSetting> {
        let settings = [
            ("orthogonality_tolerance", self.orthogonality_tolerance),
            ("social_cap", self.social_cap),
            ("measurement_boost_cap", self.measurement_boost_cap),
        ];
        for (field, value) in settings {
            if value < 0.0 || !value.is_finite() {
                return Err(InvalidSetting { field, value });
            }
        }
        Ok(())
    }

    /// Validate every regime entry and build the immutable lookup table.
    pub fn regime_table(&self) -> Result<RegimeWeightTable, WeightError> {
        let default = Regime::parse(&self.default_regime)
            .ok_or_else(|| WeightError::UnknownRegimePreset(self.default_regime.clone()))?;

        let mut presets = BTreeMap::new();
        let mut seen: BTreeMap<Regime, &str> = BTreeMap::new();
        for (name, entry) in &self.regimes {
            let regime =
                Regime::parse(name).ok_or_else(|| WeightError::UnknownRegimePreset(name.clone()))?;
            if let Some(first) = seen.insert(regime, name) {
                return Err(WeightError::DuplicateRegime {
                    regime: regime.to_string(),
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
            let category = CategoryWeights::from_map(name, &entry.category)?;
            entry.timeframe.validate(name)?;
            presets.insert(
                regime,
                RegimePreset {
                    timeframe: entry.timeframe,
                    category,
                },
            );
        }

        RegimeWeightTable::new(presets, default)
    }
}
