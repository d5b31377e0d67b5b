// =============================================================================
// Composite Scorer
// =============================================================================
//
// Pipeline for one (symbol, timestamp) request:
//
//   1. resolve regime → timeframe blend + category weights (one default)
//   2. build factor vectors, zero-padded to a common dimension
//   3. orthogonalize against the protected MomentumCore
//   4. normalize residuals with the category weights
//   5. internal score  = clamp(total, 0, 100)
//   6. social overlay  = clamp(avg(social, brand), 0, 10), added last
//   7. final score     = clamp(internal + social, 0, 110)
//
// If steps 3 or 4 fail the result is a tagged fallback:
//   internal = clamp(MomentumCore × 100, 0, 100), residuals zeroed.
//
// A score is immutable once built.  `validate()` only reports bounds
// violations, it never re-clamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{BoundsViolation, Result as CoreResult};
use crate::factors::{
    FactorBuilder, FactorSet, OrthogonalizedFactors, Orthogonalizer, StandardFactorBuilder,
};
use crate::regime::{CategoryWeights, Regime, RegimeWeightTable};
use crate::scoring::input::ScoringInput;
use crate::scoring::normalizer::{
    CategoryContributions, Normalizer, QualityComponents, VolumeComponents,
};
use crate::types::ScoreComputation;

pub const INTERNAL_MAX: f64 = 100.0;
pub const FINAL_MAX: f64 = 110.0;

// =============================================================================
// CompositeScore
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub regime: Regime,

    /// Timeframe-blended momentum in percent units (protected factor).
    pub momentum_core: f64,
    pub technical_resid: f64,
    pub volume_resid: VolumeComponents,
    pub quality_resid: QualityComponents,
    pub catalyst_resid: f64,
    pub social_resid_capped: f64,

    /// Weighted total before social, in [0, 100].
    pub internal_0_100: f64,
    /// Internal plus social, in [0, 110].
    pub final_with_social: f64,

    pub contributions: CategoryContributions,
    pub computation: ScoreComputation,
}

impl CompositeScore {
    fn check(
        &self,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), BoundsViolation> {
        if value.is_finite() && (min..=max).contains(&value) {
            return Ok(());
        }
        Err(BoundsViolation {
            symbol: self.symbol.clone(),
            field,
            value,
            min,
            max,
        })
    }

    /// Re-assert the documented bounds.  The score is left untouched.
    pub fn validate(&self) -> Result<(), BoundsViolation> {
        self.check("internal_0_100", self.internal_0_100, 0.0, INTERNAL_MAX)?;
        self.check("final_with_social", self.final_with_social, 0.0, FINAL_MAX)?;
        self.check("social_resid_capped", self.social_resid_capped, 0.0, 10.0)?;
        Ok(())
    }

    pub fn is_fallback(&self) -> bool {
        !self.computation.is_orthogonalized()
    }
}

/// A score plus the intermediate state the explainer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub score: CompositeScore,
    pub weights: CategoryWeights,
    /// `None` when the score took the fallback path.
    pub factors: Option<OrthogonalizedFactors>,
}

// =============================================================================
// Scorer
// =============================================================================

pub struct Scorer {
    table: RegimeWeightTable,
    orthogonalizer: Orthogonalizer,
    normalizer: Normalizer,
    builder: Box<dyn FactorBuilder>,
    social_cap: f64,
}

impl std::fmt::Debug for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scorer")
            .field("table", &self.table)
            .field("orthogonalizer", &self.orthogonalizer)
            .field("social_cap", &self.social_cap)
            .finish_non_exhaustive()
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(RegimeWeightTable::builtin(), Orthogonalizer::default(), 10.0)
    }
}

impl Scorer {
    pub fn new(table: RegimeWeightTable, orthogonalizer: Orthogonalizer, social_cap: f64) -> Self {
        Self {
            table,
            orthogonalizer,
            normalizer: Normalizer,
            builder: Box::new(StandardFactorBuilder),
            social_cap,
        }
    }

    /// Validate the configured settings and weights once and build the scorer.
    pub fn from_config(config: &EngineConfig) -> CoreResult<Self> {
        config.validate_settings()?;
        Ok(Self::new(
            config.regime_table()?,
            Orthogonalizer::new(config.orthogonality_tolerance),
            config.social_cap,
        ))
    }

    /// Replace the factor builder.
    pub fn with_builder(mut self, builder: Box<dyn FactorBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn table(&self) -> &RegimeWeightTable {
        &self.table
    }

    pub fn orthogonalizer(&self) -> &Orthogonalizer {
        &self.orthogonalizer
    }

    pub fn score(&self, input: &ScoringInput) -> CompositeScore {
        self.score_report(input).score
    }

    /// Score and keep the weights and orthogonalized factors used.
    pub fn score_report(&self, input: &ScoringInput) -> ScoreReport {
        let (regime, preset) = self.table.lookup(&input.regime);
        let set = self.builder.build(input, &preset.timeframe);
        let social = input.social.capped(self.social_cap);

        let outcome = self
            .orthogonalizer
            .orthogonalize(&set.aligned())
            .map_err(|e| e.to_string())
            .and_then(|factors| {
                self.normalizer
                    .normalize(&factors, &preset.category)
                    .map(|n| (factors, n))
                    .map_err(|e| e.to_string())
            });

        let (factors, normalized) = match outcome {
            Ok(ok) => ok,
            Err(reason) => {
                warn!(
                    symbol = %input.symbol,
                    regime = %regime,
                    reason = %reason,
                    "orthogonal scoring failed, using momentum fallback"
                );
                return ScoreReport {
                    score: Self::fallback(input, regime, &set, social, reason),
                    weights: preset.category,
                    factors: None,
                };
            }
        };

        let internal = normalized.total.clamp(0.0, INTERNAL_MAX);
        let final_with_social = (internal + social).clamp(0.0, FINAL_MAX);
        let r = normalized.residuals;

        let score = CompositeScore {
            symbol: input.symbol.clone(),
            timestamp: input.timestamp,
            regime,
            momentum_core: set.momentum_core,
            technical_resid: r.technical,
            volume_resid: r.volume,
            quality_resid: r.quality,
            catalyst_resid: r.catalyst,
            social_resid_capped: social,
            internal_0_100: internal,
            final_with_social,
            contributions: normalized.contributions,
            computation: ScoreComputation::Orthogonalized,
        };

        debug!(
            symbol = %score.symbol,
            regime = %regime,
            internal = format!("{:.1}", score.internal_0_100),
            social = format!("{:.1}", score.social_resid_capped),
            final_score = format!("{:.1}", score.final_with_social),
            "composite score computed"
        );

        ScoreReport {
            score,
            weights: preset.category,
            factors: Some(factors),
        }
    }

    fn fallback(
        input: &ScoringInput,
        regime: Regime,
        set: &FactorSet,
        social: f64,
        reason: String,
    ) -> CompositeScore {
        let momentum_core = if set.momentum_core.is_finite() {
            set.momentum_core
        } else {
            0.0
        };
        let internal = (momentum_core * 100.0).clamp(0.0, INTERNAL_MAX);

        CompositeScore {
            symbol: input.symbol.clone(),
            timestamp: input.timestamp,
            regime,
            momentum_core,
            technical_resid: 0.0,
            volume_resid: VolumeComponents::default(),
            quality_resid: QualityComponents::default(),
            catalyst_resid: 0.0,
            social_resid_capped: social,
            internal_0_100: internal,
            final_with_social: (internal + social).clamp(0.0, FINAL_MAX),
            contributions: CategoryContributions::default(),
            computation: ScoreComputation::Fallback { reason },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::FactorVector;
    use crate::regime::TimeframeWeights;
    use crate::scoring::input::fixtures::sample_input;
    use crate::scoring::input::{MomentumReturns, SocialSignals};

    /// Builder that emits a non-finite technical factor.
    struct BrokenBuilder;

    impl FactorBuilder for BrokenBuilder {
        fn build(&self, input: &ScoringInput, tw: &TimeframeWeights) -> FactorSet {
            let mut set = StandardFactorBuilder.build(input, tw);
            set.technical = FactorVector::new("technical", vec![f64::NAN, 0.0, 0.0]);
            set
        }
    }

    #[test]
    fn scenario_momentum_core_trending_bull() {
        let score = Scorer::default().score(&sample_input());
        assert!((score.momentum_core - 4.57).abs() < 1e-10);
        assert_eq!(score.regime, Regime::TrendingBull);
        assert!(score.computation.is_orthogonalized());
    }

    #[test]
    fn scores_are_bounded_and_validate() {
        let score = Scorer::default().score(&sample_input());
        assert!(score.internal_0_100 >= 0.0 && score.internal_0_100 <= 100.0);
        assert!(score.final_with_social >= 0.0 && score.final_with_social <= 110.0);
        assert!((score.social_resid_capped - 5.0).abs() < 1e-12);
        assert!(
            (score.final_with_social - (score.internal_0_100 + 5.0).min(110.0)).abs() < 1e-9
        );
        assert!(score.validate().is_ok());
    }

    #[test]
    fn extreme_inputs_stay_in_bounds() {
        let mut input = sample_input();
        input.momentum = MomentumReturns {
            r1h: 1e6,
            r4h: 1e6,
            r12h: 1e6,
            r24h: 1e6,
            r7d: 1e6,
        };
        input.volume.volume_surge = 1e9;
        input.quality.oi_absolute = 1e15;
        input.social = SocialSignals {
            social_score: 1e3,
            brand_score: 1e3,
        };
        let score = Scorer::default().score(&input);
        assert!(score.internal_0_100 >= 0.0 && score.internal_0_100 <= 100.0);
        assert!(score.final_with_social >= 0.0 && score.final_with_social <= 110.0);
        assert!((score.social_resid_capped - 10.0).abs() < 1e-12);
        assert!(score.validate().is_ok());

        input.momentum.r1h = -1e6;
        input.momentum.r4h = -1e6;
        input.momentum.r12h = -1e6;
        input.momentum.r24h = -1e6;
        input.momentum.r7d = -1e6;
        let low = Scorer::default().score(&input);
        assert!(low.internal_0_100 >= 0.0);
        assert!(low.validate().is_ok());
    }

    #[test]
    fn scoring_is_idempotent() {
        let scorer = Scorer::default();
        let input = sample_input();
        assert_eq!(scorer.score(&input), scorer.score(&input));
    }

    #[test]
    fn report_momentum_matches_input_vector() {
        let report = Scorer::default().score_report(&sample_input());
        let factors = report.factors.unwrap();
        assert!((factors.momentum.values[0] - 0.457).abs() < 1e-10);
        assert!(factors.momentum.values[1..].iter().all(|v| *v == 0.0));
        assert!(factors.momentum.protected);
    }

    #[test]
    fn orthogonalization_failure_takes_tagged_fallback() {
        let scorer = Scorer::default().with_builder(Box::new(BrokenBuilder));
        let report = scorer.score_report(&sample_input());
        let score = report.score;

        assert!(score.is_fallback());
        assert!(report.factors.is_none());
        assert!(matches!(score.computation, ScoreComputation::Fallback { .. }));
        assert_eq!(score.technical_resid, 0.0);
        assert_eq!(score.volume_resid, VolumeComponents::default());
        assert_eq!(score.quality_resid, QualityComponents::default());
        // 4.57 × 100 is clamped to the internal ceiling
        assert_eq!(score.internal_0_100, 100.0);
        assert!((score.final_with_social - 105.0).abs() < 1e-9);
        assert!(score.validate().is_ok());
    }

    #[test]
    fn fallback_scales_momentum_core_to_points() {
        let mut input = sample_input();
        input.momentum = MomentumReturns {
            r1h: 0.2,
            r4h: 0.2,
            r12h: 0.2,
            r24h: 0.2,
            r7d: 0.2,
        };
        let scorer = Scorer::default().with_builder(Box::new(BrokenBuilder));
        let score = scorer.score(&input);
        // trending_bull weights sum to 1.05: core 0.21 → 21 points
        assert!((score.momentum_core - 0.21).abs() < 1e-12);
        assert!((score.internal_0_100 - 21.0).abs() < 1e-9);
        assert!((score.final_with_social - 26.0).abs() < 1e-9);
    }

    #[test]
    fn catalyst_residual_contributes() {
        let mut input = sample_input();
        // Flat closes (full compression, zero drift) and a 5× volume spike.
        input.catalyst.prices = vec![100.0; 20];
        let mut volumes = vec![10.0; 19];
        volumes.push(50.0);
        input.catalyst.volumes = volumes;

        let report = Scorer::default().score_report(&input);
        let factors = report.factors.as_ref().unwrap();
        let catalyst = factors.catalyst.as_ref().unwrap();
        assert_eq!(catalyst.name, "catalyst_resid");
        assert!(catalyst.values[..4].iter().all(|v| *v == 0.0));

        // expansion = 50 / 12 / 5; scalar = (1 + expansion + 0) / 3
        let expected_scalar = (1.0 + 50.0 / 12.0 / 5.0) / 3.0;
        let score = report.score;
        assert!((score.catalyst_resid - expected_scalar).abs() < 1e-9);
        assert!((score.contributions.catalyst_resid - 0.10 * expected_scalar * 100.0).abs() < 1e-7);
        assert!(score.contributions.catalyst_resid > 6.0);

        let without = Scorer::default().score(&sample_input());
        assert!(score.internal_0_100 > without.internal_0_100);
        assert!(Scorer::default().orthogonalizer().is_orthogonal(factors));
    }

    #[test]
    fn from_config_rejects_negative_social_cap() {
        let config = EngineConfig {
            social_cap: -1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Scorer::from_config(&config),
            Err(crate::error::Error::Setting(_))
        ));
    }

    #[test]
    fn unknown_regime_uses_default_preset() {
        let mut input = sample_input();
        input.regime = "sideways".into();
        let score = Scorer::default().score(&input);
        assert_eq!(score.regime, Regime::TrendingBull);
        assert!((score.momentum_core - 4.57).abs() < 1e-10);
    }

    #[test]
    fn legacy_alias_matches_canonical() {
        let scorer = Scorer::default();
        let mut calm = sample_input();
        calm.regime = "calm".into();
        let mut choppy = sample_input();
        choppy.regime = "choppy".into();
        assert_eq!(scorer.score(&calm), scorer.score(&choppy));
    }

    #[test]
    fn validate_reports_without_clamping() {
        let mut score = Scorer::default().score(&sample_input());
        score.final_with_social = 130.0;
        let err = score.validate().unwrap_err();
        assert_eq!(err.field, "final_with_social");
        assert_eq!(err.symbol, "BTCUSD");
        assert_eq!(score.final_with_social, 130.0);

        score.final_with_social = 50.0;
        score.social_resid_capped = 12.0;
        assert_eq!(score.validate().unwrap_err().field, "social_resid_capped");
    }
}
