// =============================================================================
// Explainer: auditable record of every score and entry decision
// =============================================================================
//
// Reconstructs the full decision trail from a finished score and gate
// result.  The explainer only reads; it never alters the score or the gate
// verdict.  Each explanation carries a UUID v4 so it can be correlated in
// logs and downstream stores.
//
// Reasoning chain order:
//   regime → momentum → technical → volume → quality (→ catalyst)
//   → internal total → social note → failed gate families → final verdict
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::factors::{OrthogonalizedFactors, Orthogonalizer};
use crate::gates::{GateResult, GateThresholds};
use crate::regime::{CategoryWeights, Regime};
use crate::scoring::{CompositeScore, ScoreReport, ScoringInput};
use crate::types::{GateFamily, ScoreComputation};

/// Gates whose failure is always surfaced as critical.
pub const CRITICAL_GATES: [&str; 6] = [
    "composite_score",
    "vadr",
    "funding_divergence",
    "bar_age",
    "spread",
    "depth",
];

const CONFIDENCE_WARN_SCORE: f64 = 80.0;
const SOCIAL_WARN_POINTS: f64 = 8.0;
const SOCIAL_CAP_POINTS: f64 = 10.0;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthogonalityInfo {
    /// Pairwise dot products in factor order.
    pub matrix: Vec<Vec<f64>>,
    pub magnitudes: BTreeMap<String, f64>,
    pub is_orthogonal: bool,
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatePerformance {
    pub total_gates: usize,
    pub passed_gates: usize,
    pub failed_gates: usize,
    pub pass_rate: f64,
    pub critical_fails: Vec<String>,
}

impl GatePerformance {
    pub fn from_result(result: &GateResult) -> Self {
        let total_gates = result.gates_passed.len();
        let passed_gates = result.gates_passed.values().filter(|p| **p).count();
        let pass_rate = if total_gates == 0 {
            0.0
        } else {
            passed_gates as f64 / total_gates as f64
        };
        let critical_fails = result
            .failed_gates()
            .into_iter()
            .filter(|g| CRITICAL_GATES.contains(g))
            .map(str::to_string)
            .collect();

        Self {
            total_gates,
            passed_gates,
            failed_gates: total_gates - passed_gates,
            pass_rate,
            critical_fails,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateExplanation {
    pub overall: GateResult,
    pub thresholds: GateThresholds,
    pub performance: GatePerformance,
}

/// Complete, read-only decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Unique identifier for this explanation (UUID v4).
    pub id: String,

    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub regime: Regime,

    pub score: CompositeScore,
    pub weights: CategoryWeights,

    /// Absent when the score took the fallback path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orthogonality: Option<OrthogonalityInfo>,

    pub gates: GateExplanation,
    pub data_sources: BTreeMap<String, String>,

    pub reasons: Vec<String>,
    pub warnings: Vec<String>,

    pub latency_ms: f64,
    pub computation: ScoreComputation,
}

impl Explanation {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn decision_label(&self) -> &'static str {
        if self.gates.overall.allowed {
            "ALLOWED"
        } else {
            "BLOCKED"
        }
    }

    /// Essential metrics for monitoring.
    pub fn key_metrics(&self) -> BTreeMap<String, serde_json::Value> {
        [
            ("symbol", json!(self.symbol)),
            ("score", json!(self.score.internal_0_100)),
            ("final_with_social", json!(self.score.final_with_social)),
            ("allowed", json!(self.gates.overall.allowed)),
            ("regime", json!(self.regime)),
            ("gate_pass_rate", json!(self.gates.performance.pass_rate)),
            ("social_capped", json!(self.score.social_resid_capped)),
            ("latency_ms", json!(self.latency_ms)),
            ("timestamp", json!(self.timestamp.to_rfc3339())),
            ("orthogonalized", json!(self.computation.is_orthogonalized())),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

impl std::fmt::Display for Explanation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: Score {:.1}, Gates {}/{} passed, Regime {}",
            self.symbol,
            self.decision_label(),
            self.score.internal_0_100,
            self.gates.performance.passed_gates,
            self.gates.performance.total_gates,
            self.regime
        )
    }
}

// =============================================================================
// Explainer
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Explainer {
    orthogonalizer: Orthogonalizer,
    thresholds: GateThresholds,
}

impl Explainer {
    pub fn new(orthogonalizer: Orthogonalizer, thresholds: GateThresholds) -> Self {
        Self {
            orthogonalizer,
            thresholds,
        }
    }

    pub fn explain(
        &self,
        report: &ScoreReport,
        gate_result: &GateResult,
        input: &ScoringInput,
        latency_ms: f64,
    ) -> Explanation {
        let score = &report.score;
        let orthogonality = report.factors.as_ref().map(|f| self.orthogonality(f));

        let reasons = Self::reasons(score, gate_result, self.thresholds.min_composite_score);
        let warnings = Self::warnings(score, gate_result, orthogonality.as_ref());

        let explanation = Explanation {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: score.symbol.clone(),
            timestamp: score.timestamp,
            regime: score.regime,
            score: score.clone(),
            weights: report.weights,
            orthogonality,
            gates: GateExplanation {
                overall: gate_result.clone(),
                thresholds: self.thresholds.clone(),
                performance: GatePerformance::from_result(gate_result),
            },
            data_sources: input.data_sources.clone(),
            reasons,
            warnings,
            latency_ms,
            computation: score.computation.clone(),
        };

        debug!(
            id = %explanation.id,
            symbol = %explanation.symbol,
            decision = explanation.decision_label(),
            reasons = explanation.reasons.len(),
            warnings = explanation.warnings.len(),
            "explanation built"
        );

        explanation
    }

    fn orthogonality(&self, factors: &OrthogonalizedFactors) -> OrthogonalityInfo {
        OrthogonalityInfo {
            matrix: Orthogonalizer::orthogonality_matrix(factors),
            magnitudes: Orthogonalizer::magnitudes(factors),
            is_orthogonal: self.orthogonalizer.is_orthogonal(factors),
            tolerance: self.orthogonalizer.tolerance(),
        }
    }

    /// The verdict line quotes the score the gates actually saw, which is the
    /// boosted score on the measurement path.
    fn reasons(score: &CompositeScore, gates: &GateResult, min_score: f64) -> Vec<String> {
        let c = &score.contributions;
        let mut reasons = vec![
            format!("Regime: {} (affects weight allocation)", score.regime),
            format!("MomentumCore: {:.1} points (protected factor)", c.momentum_core),
            format!(
                "TechnicalResid: {:.1} points (post-momentum residual)",
                c.technical_resid
            ),
            format!(
                "VolumeResid: {:.1} points (volume + ΔOI residual)",
                c.volume_resid
            ),
            format!(
                "QualityResid: {:.1} points (OI + reserves + ETF + venue)",
                c.quality_resid
            ),
        ];
        if c.catalyst_resid > 0.0 {
            reasons.push(format!(
                "CatalystResid: {:.1} points (compression + volume expansion)",
                c.catalyst_resid
            ));
        }
        reasons.push(format!(
            "Internal total: {:.1}/100 (before social)",
            score.internal_0_100
        ));

        if score.social_resid_capped < SOCIAL_CAP_POINTS {
            reasons.push(format!(
                "Social factor contributed +{:.1} points (uncapped)",
                score.social_resid_capped
            ));
        } else {
            reasons.push("Social factor capped at +10.0 points maximum".to_string());
        }

        for family in GateFamily::ALL {
            if gates.family_passed(family) {
                continue;
            }
            let headline = match family {
                GateFamily::Composite => "Failed entry score requirements",
                GateFamily::Freshness => "Data freshness violations",
                GateFamily::Microstructure => "Liquidity/execution violations",
                GateFamily::Fatigue => "Overextension protection triggered",
                GateFamily::Policy => "Timing/administrative violations",
            };
            reasons.push(format!("{} GATES: {}", family, headline));
            reasons.extend(
                gates
                    .family_failures(family)
                    .into_iter()
                    .map(|r| format!("  - {}", r)),
            );
        }

        if gates.allowed {
            reasons.push(format!(
                "Entry ALLOWED: Score {:.1} ≥ {}, all gates passed",
                gates.score, min_score
            ));
        } else {
            reasons.push(format!("Entry BLOCKED: {}", gates.reason));
        }

        reasons
    }

    fn warnings(
        score: &CompositeScore,
        gates: &GateResult,
        orthogonality: Option<&OrthogonalityInfo>,
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        if score.internal_0_100 < CONFIDENCE_WARN_SCORE && gates.allowed {
            warnings.push("Score below 80 - consider higher confidence threshold".to_string());
        }
        if score.social_resid_capped >= SOCIAL_WARN_POINTS {
            warnings
                .push("High social factor influence - verify fundamental strength".to_string());
        }
        if let ScoreComputation::Fallback { reason } = &score.computation {
            warnings.push(format!(
                "Fallback scoring without orthogonalization ({}) - residuals zeroed",
                reason
            ));
        }
        if let Some(info) = orthogonality {
            if !info.is_orthogonal {
                warnings.push(format!(
                    "Residual factors exceed orthogonality tolerance {:.2}",
                    info.tolerance
                ));
            }
        }

        warnings
    }
}
