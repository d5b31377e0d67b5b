// =============================================================================
// Enhanced Explanation: base explanation plus measurement insights
// =============================================================================

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::explain::Explanation;
use crate::scoring::measurements::{etf_boost, funding_boost, oi_boost};
use crate::scoring::BoostedScore;
use crate::types::DataQuality;

const BOOST_INTEGRITY_WARN: f64 = 3.0;
const FUNDING_SIGNAL_WARN: f64 = 1.5;
const OI_SIGNAL_WARN: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedExplanation {
    #[serde(flatten)]
    pub base: Explanation,

    pub funding_insight: String,
    pub oi_insight: String,
    pub etf_insight: String,
    pub measurements_boost: f64,
    pub data_quality: DataQuality,

    /// Internal score plus boost, in [0, 100].
    pub final_score: f64,
    /// Social-inclusive score plus boost, in [0, 114].
    pub final_score_with_social: f64,

    pub funding_attribution: String,
    pub oi_attribution: String,
    pub etf_attribution: String,
}

impl EnhancedExplanation {
    /// Layer `boosted` onto a finished base explanation.
    pub fn new(mut base: Explanation, boosted: &BoostedScore) -> Self {
        let age_secs = (Utc::now() - boosted.base.timestamp).num_seconds().max(0);
        let readings = &boosted.readings;

        let funding_attribution = match readings.funding {
            Some(_) => format!(
                "Funding: Cross-venue 7d σ analysis from Binance/OKX/Bybit (cached {}s ago)",
                age_secs
            ),
            None => "No funding data sources available".to_string(),
        };
        let oi_attribution = match readings.open_interest {
            Some(_) => format!(
                "OI: 1h Δ with β-regression residual from Binance/OKX (cached {}s ago)",
                age_secs
            ),
            None => "No open interest data sources available".to_string(),
        };
        let etf_attribution = match readings.etf_flows {
            Some(_) => format!(
                "ETF: Daily net flows from issuer dashboards vs 7d ADV (cached {}s ago)",
                age_secs
            ),
            None => "No ETF flow data sources available".to_string(),
        };

        base.reasons.extend(Self::extra_reasons(boosted));
        base.warnings.extend(Self::extra_warnings(boosted));

        Self {
            base,
            funding_insight: boosted.funding_insight.clone(),
            oi_insight: boosted.oi_insight.clone(),
            etf_insight: boosted.etf_insight.clone(),
            measurements_boost: boosted.measurements_boost,
            data_quality: boosted.data_quality,
            final_score: boosted.final_score,
            final_score_with_social: boosted.final_score_with_social,
            funding_attribution,
            oi_attribution,
            etf_attribution,
        }
    }

    fn extra_reasons(b: &BoostedScore) -> Vec<String> {
        let mut out = Vec::new();
        if b.measurements_boost > 0.0 {
            out.push(format!(
                "Measurement Boost: +{:.1} points from data insights",
                b.measurements_boost
            ));
            // Only insights that moved the score are listed.
            let r = &b.readings;
            if r.funding.as_ref().is_some_and(|s| funding_boost(s) > 0.0) {
                out.push(format!("  - Funding: {}", b.funding_insight));
            }
            if r.open_interest.as_ref().is_some_and(|s| oi_boost(s) > 0.0) {
                out.push(format!("  - Open Interest: {}", b.oi_insight));
            }
            if r.etf_flows.as_ref().is_some_and(|s| etf_boost(s) > 0.0) {
                out.push(format!("  - ETF Flows: {}", b.etf_insight));
            }
        }
        out.push(format!("Data Coverage: {}", b.data_quality));
        out
    }

    fn extra_warnings(b: &BoostedScore) -> Vec<String> {
        let mut out = Vec::new();
        match b.data_quality {
            DataQuality::Incomplete => out.push(
                "No measurement data available - relying on base factors only".to_string(),
            ),
            DataQuality::Limited => out.push(
                "Limited measurement data - consider waiting for more sources".to_string(),
            ),
            DataQuality::Complete | DataQuality::Good => {}
        }
        if b.measurements_boost >= BOOST_INTEGRITY_WARN {
            out.push("Very high measurement boost - verify data integrity".to_string());
        }
        if b.readings.funding.is_some() && b.measurements_boost >= FUNDING_SIGNAL_WARN {
            out.push("Strong funding signal - monitor for mean reversion".to_string());
        }
        if b.readings.open_interest.is_some() && b.measurements_boost >= OI_SIGNAL_WARN {
            out.push("Significant OI activity - verify volume confirmation".to_string());
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for EnhancedExplanation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let perf = &self.base.gates.performance;
        write!(
            f,
            "{} {}: Score {:.1}+{:.1}, {}, Gates {}/{}, {}",
            self.base.symbol,
            self.base.decision_label(),
            self.base.score.internal_0_100,
            self.measurements_boost,
            self.data_quality,
            perf.passed_gates,
            perf.total_gates,
            self.base.regime
        )
    }
}
