// =============================================================================
// Hard Entry Gates: five independent families, ANDed
// =============================================================================
//
// Every gate must pass for an entry to be allowed.  Gates are evaluated in a
// fixed order and each one records a pass/fail flag and a reason:
//
//   COMPOSITE       composite_score ≥ 75, vadr ≥ 1.8×, funding_divergence z ≤ 0
//   FRESHNESS       bar_age ≤ 2 bars, atr_distance ≤ 1.2× ATR (skipped at ATR 0)
//   MICROSTRUCTURE  spread < 50 bps, depth ≥ $100k (±2%), micro_vadr ≥ 1.75×
//   FATIGUE         blocks when |24h momentum| > 12% AND RSI4h > 70
//   POLICY          execution_delay ≤ 30 000 ms
//
// The ordered failure list is the primary output; the one-line `reason` is
// derived from it.  Evaluation is a pure function of the input.
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gates::GateThresholds;
use crate::types::GateFamily;

pub const GATE_COMPOSITE_SCORE: &str = "composite_score";
pub const GATE_VADR: &str = "vadr";
pub const GATE_FUNDING_DIVERGENCE: &str = "funding_divergence";
pub const GATE_BAR_AGE: &str = "bar_age";
pub const GATE_ATR_DISTANCE: &str = "atr_distance";
pub const GATE_SPREAD: &str = "spread";
pub const GATE_DEPTH: &str = "depth";
pub const GATE_MICRO_VADR: &str = "micro_vadr";
pub const GATE_FATIGUE: &str = "fatigue";
pub const GATE_EXECUTION_DELAY: &str = "execution_delay";

/// Evaluation order and family of every gate.
pub const GATE_ORDER: [(&str, GateFamily); 10] = [
    (GATE_COMPOSITE_SCORE, GateFamily::Composite),
    (GATE_VADR, GateFamily::Composite),
    (GATE_FUNDING_DIVERGENCE, GateFamily::Composite),
    (GATE_BAR_AGE, GateFamily::Freshness),
    (GATE_ATR_DISTANCE, GateFamily::Freshness),
    (GATE_SPREAD, GateFamily::Microstructure),
    (GATE_DEPTH, GateFamily::Microstructure),
    (GATE_MICRO_VADR, GateFamily::Microstructure),
    (GATE_FATIGUE, GateFamily::Fatigue),
    (GATE_EXECUTION_DELAY, GateFamily::Policy),
];

pub fn family_of(gate: &str) -> Option<GateFamily> {
    GATE_ORDER
        .iter()
        .find(|(name, _)| *name == gate)
        .map(|(_, family)| *family)
}

// =============================================================================
// GateInput
// =============================================================================

/// Point-in-time snapshot evaluated by the gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateInput {
    pub symbol: String,
    /// Internal composite score, 0-100.
    pub score: f64,
    pub vadr: f64,
    pub funding_z: f64,
    /// Bars elapsed since the signal bar closed.
    pub bar_age: u32,
    /// Distance from the trigger price, in price units.
    pub atr_distance: f64,
    /// Current ATR, in price units.  Zero disables the ATR check.
    pub atr_current: f64,
    pub spread_bps: f64,
    /// Book depth within the configured band, USD.
    pub depth_usd: f64,
    pub micro_vadr: f64,
    /// 24h momentum in percent.
    pub momentum_24h: f64,
    pub rsi_4h: f64,
    pub signal_time: DateTime<Utc>,
    pub execution_time: DateTime<Utc>,
}

impl GateInput {
    pub fn execution_delay_ms(&self) -> i64 {
        (self.execution_time - self.signal_time).num_milliseconds()
    }
}

// =============================================================================
// GateResult
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub symbol: String,
    /// Score the composite gate compared against the threshold.
    pub score: f64,
    pub allowed: bool,
    pub gates_passed: BTreeMap<String, bool>,
    pub gate_reasons: BTreeMap<String, String>,

    pub composite_passed: bool,
    pub freshness_passed: bool,
    pub microstructure_passed: bool,
    pub fatigue_passed: bool,
    pub policy_passed: bool,

    /// Failure messages in gate order.
    pub failures: Vec<String>,
    /// One-line summary derived from `failures`.
    pub reason: String,
}

impl GateResult {
    pub fn family_passed(&self, family: GateFamily) -> bool {
        match family {
            GateFamily::Composite => self.composite_passed,
            GateFamily::Freshness => self.freshness_passed,
            GateFamily::Microstructure => self.microstructure_passed,
            GateFamily::Fatigue => self.fatigue_passed,
            GateFamily::Policy => self.policy_passed,
        }
    }

    /// Failure reasons of the gates in `family`, in gate order.
    pub fn family_failures(&self, family: GateFamily) -> Vec<&str> {
        GATE_ORDER
            .iter()
            .filter(|(_, f)| *f == family)
            .filter(|(name, _)| self.gates_passed.get(*name) == Some(&false))
            .filter_map(|(name, _)| self.gate_reasons.get(*name).map(String::as_str))
            .collect()
    }

    pub fn failed_gates(&self) -> Vec<&str> {
        GATE_ORDER
            .iter()
            .filter(|(name, _)| self.gates_passed.get(*name) == Some(&false))
            .map(|(name, _)| *name)
            .collect()
    }
}

/// One-line summary of a failure list.
pub fn summarize_failures(failures: &[String]) -> String {
    match failures {
        [] => "all entry gates passed".to_string(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{} (+{} more)", first, rest.len()),
    }
}

// =============================================================================
// HardEntryGates
// =============================================================================

struct GateCheck {
    name: &'static str,
    passed: bool,
    reason: String,
}

impl GateCheck {
    fn new(name: &'static str, passed: bool, pass: String, fail: String) -> Self {
        Self {
            name,
            passed,
            reason: if passed { pass } else { fail },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HardEntryGates {
    thresholds: GateThresholds,
}

impl HardEntryGates {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GateThresholds {
        &self.thresholds
    }

    fn checks(&self, input: &GateInput) -> Vec<GateCheck> {
        let t = &self.thresholds;
        let delay_ms = input.execution_delay_ms();
        let momentum = input.momentum_24h.abs();

        let atr = if input.atr_current == 0.0 {
            GateCheck {
                name: GATE_ATR_DISTANCE,
                passed: true,
                reason: "ATR check skipped (ATR = 0)".to_string(),
            }
        } else {
            let multiple = input.atr_distance / input.atr_current;
            GateCheck::new(
                GATE_ATR_DISTANCE,
                multiple <= t.max_atr_multiple,
                format!("ATR distance {:.2}× ≤ {:.1}×", multiple, t.max_atr_multiple),
                format!(
                    "ATR distance {:.2}× > {:.1}× maximum",
                    multiple, t.max_atr_multiple
                ),
            )
        };

        let fatigued = momentum > t.fatigue_momentum_pct && input.rsi_4h > t.fatigue_rsi;

        vec![
            GateCheck::new(
                GATE_COMPOSITE_SCORE,
                input.score >= t.min_composite_score,
                format!("score {:.1} ≥ {:.1}", input.score, t.min_composite_score),
                format!(
                    "score {:.1} < {:.1} minimum",
                    input.score, t.min_composite_score
                ),
            ),
            GateCheck::new(
                GATE_VADR,
                input.vadr >= t.min_vadr,
                format!("VADR {:.2}× ≥ {:.1}×", input.vadr, t.min_vadr),
                format!("VADR {:.2}× < {:.1}× minimum", input.vadr, t.min_vadr),
            ),
            GateCheck::new(
                GATE_FUNDING_DIVERGENCE,
                input.funding_z <= t.max_funding_z,
                format!(
                    "funding z-score {:.2} ≤ {:.1}",
                    input.funding_z, t.max_funding_z
                ),
                format!(
                    "funding z-score {:.2} > {:.1} (no divergence)",
                    input.funding_z, t.max_funding_z
                ),
            ),
            GateCheck::new(
                GATE_BAR_AGE,
                input.bar_age <= t.max_bar_age,
                format!("bar age {} ≤ {} bars", input.bar_age, t.max_bar_age),
                format!(
                    "bar age {} > {} bars maximum",
                    input.bar_age, t.max_bar_age
                ),
            ),
            atr,
            GateCheck::new(
                GATE_SPREAD,
                input.spread_bps < t.max_spread_bps,
                format!("spread {:.1}bps < {:.1}bps", input.spread_bps, t.max_spread_bps),
                format!(
                    "spread {:.1}bps ≥ {:.1}bps maximum",
                    input.spread_bps, t.max_spread_bps
                ),
            ),
            GateCheck::new(
                GATE_DEPTH,
                input.depth_usd >= t.min_depth_usd,
                format!(
                    "depth ${:.0} ≥ ${:.0} within ±{:.1}%",
                    input.depth_usd, t.min_depth_usd, t.depth_band_pct
                ),
                format!(
                    "depth ${:.0} < ${:.0} minimum",
                    input.depth_usd, t.min_depth_usd
                ),
            ),
            GateCheck::new(
                GATE_MICRO_VADR,
                input.micro_vadr >= t.min_micro_vadr,
                format!(
                    "micro VADR {:.2}× ≥ {:.2}×",
                    input.micro_vadr, t.min_micro_vadr
                ),
                format!(
                    "micro VADR {:.2}× < {:.2}× minimum",
                    input.micro_vadr, t.min_micro_vadr
                ),
            ),
            GateCheck::new(
                GATE_FATIGUE,
                !fatigued,
                format!(
                    "no fatigue: 24h momentum {:.1}%, RSI4h {:.1}",
                    momentum, input.rsi_4h
                ),
                format!(
                    "fatigue: 24h momentum {:.1}% > {:.0}% AND RSI4h {:.1} > {:.0}",
                    momentum, t.fatigue_momentum_pct, input.rsi_4h, t.fatigue_rsi
                ),
            ),
            GateCheck::new(
                GATE_EXECUTION_DELAY,
                delay_ms <= t.max_execution_delay_ms,
                format!(
                    "execution delay {}ms ≤ {}ms",
                    delay_ms, t.max_execution_delay_ms
                ),
                format!(
                    "execution delay {}ms > {}ms maximum",
                    delay_ms, t.max_execution_delay_ms
                ),
            ),
        ]
    }

    /// Evaluate every gate and aggregate the families.
    pub fn evaluate_all(&self, input: &GateInput) -> GateResult {
        let mut gates_passed = BTreeMap::new();
        let mut gate_reasons = BTreeMap::new();
        let mut failures = Vec::new();
        let mut family_ok: BTreeMap<GateFamily, bool> =
            GateFamily::ALL.iter().map(|f| (*f, true)).collect();

        for (check, (_, family)) in self.checks(input).into_iter().zip(GATE_ORDER) {
            if !check.passed {
                debug!(
                    symbol = %input.symbol,
                    gate = check.name,
                    family = %family,
                    reason = %check.reason,
                    "entry gate failed"
                );
                failures.push(check.reason.clone());
                family_ok.insert(family, false);
            }
            gates_passed.insert(check.name.to_string(), check.passed);
            gate_reasons.insert(check.name.to_string(), check.reason);
        }

        let passed = |f: GateFamily| family_ok.get(&f).copied().unwrap_or(false);
        let composite_passed = passed(GateFamily::Composite);
        let freshness_passed = passed(GateFamily::Freshness);
        let microstructure_passed = passed(GateFamily::Microstructure);
        let fatigue_passed = passed(GateFamily::Fatigue);
        let policy_passed = passed(GateFamily::Policy);

        let allowed = composite_passed
            && freshness_passed
            && microstructure_passed
            && fatigue_passed
            && policy_passed;

        GateResult {
            symbol: input.symbol.clone(),
            score: input.score,
            allowed,
            gates_passed,
            gate_reasons,
            composite_passed,
            freshness_passed,
            microstructure_passed,
            fatigue_passed,
            policy_passed,
            reason: summarize_failures(&failures),
            failures,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn passing_input() -> GateInput {
        let t = DateTime::parse_from_rfc3339("2025-09-01T12:00:00Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        GateInput {
            symbol: "BTCUSD".into(),
            score: 80.0,
            vadr: 2.0,
            funding_z: -1.0,
            bar_age: 1,
            atr_distance: 0.0,
            atr_current: 0.0,
            spread_bps: 20.0,
            depth_usd: 150_000.0,
            micro_vadr: 1.9,
            momentum_24h: 5.0,
            rsi_4h: 50.0,
            signal_time: t,
            execution_time: t,
        }
    }

    fn gates() -> HardEntryGates {
        HardEntryGates::default()
    }

    #[test]
    fn scenario_all_gates_pass() {
        let r = gates().evaluate_all(&passing_input());
        assert!(r.allowed);
        assert!(r.failures.is_empty());
        assert_eq!(r.reason, "all entry gates passed");
        assert_eq!(r.gates_passed.len(), 10);
        assert!(r.gates_passed.values().all(|p| *p));
        for family in GateFamily::ALL {
            assert!(r.family_passed(family));
        }
    }

    #[test]
    fn scenario_thin_depth_blocks() {
        let mut input = passing_input();
        input.depth_usd = 50_000.0;
        let r = gates().evaluate_all(&input);
        assert!(!r.allowed);
        assert!(!r.microstructure_passed);
        assert!(r.composite_passed);
        assert!(r.reason.contains("depth $50000 < $100000 minimum"));
        assert_eq!(r.failed_gates(), vec![GATE_DEPTH]);
    }

    #[test]
    fn composite_gate_flips_at_threshold() {
        let mut input = passing_input();
        input.score = 74.9;
        let r = gates().evaluate_all(&input);
        assert!(!r.gates_passed[GATE_COMPOSITE_SCORE]);
        assert!(!r.composite_passed);
        assert_eq!(r.reason, "score 74.9 < 75.0 minimum");
        assert_eq!(r.score, 74.9);

        input.score = 75.1;
        let r = gates().evaluate_all(&input);
        assert!(r.gates_passed[GATE_COMPOSITE_SCORE]);
        assert!(r.allowed);
    }

    #[test]
    fn depth_gate_flips_below_minimum() {
        let mut input = passing_input();
        input.depth_usd = 100_000.0;
        assert!(gates().evaluate_all(&input).microstructure_passed);
        input.depth_usd = 99_999.0;
        assert!(!gates().evaluate_all(&input).microstructure_passed);
    }

    #[test]
    fn multiple_failures_summarize_first_plus_count() {
        let mut input = passing_input();
        input.vadr = 1.5;
        input.spread_bps = 60.0;
        input.bar_age = 4;
        let r = gates().evaluate_all(&input);
        assert_eq!(r.failures.len(), 3);
        assert_eq!(r.failures[0], "VADR 1.50× < 1.8× minimum");
        assert_eq!(r.reason, "VADR 1.50× < 1.8× minimum (+2 more)");
        assert!(!r.composite_passed && !r.freshness_passed && !r.microstructure_passed);
        assert!(r.fatigue_passed && r.policy_passed);
    }

    #[test]
    fn positive_funding_blocks() {
        let mut input = passing_input();
        input.funding_z = 0.5;
        let r = gates().evaluate_all(&input);
        assert_eq!(r.reason, "funding z-score 0.50 > 0.0 (no divergence)");
    }

    #[test]
    fn atr_distance_checked_only_with_atr() {
        let mut input = passing_input();
        input.atr_distance = 500.0;
        assert!(gates().evaluate_all(&input).freshness_passed);

        input.atr_current = 100.0;
        let r = gates().evaluate_all(&input);
        assert!(!r.freshness_passed);
        assert_eq!(r.reason, "ATR distance 5.00× > 1.2× maximum");

        input.atr_distance = 120.0;
        assert!(gates().evaluate_all(&input).freshness_passed);
    }

    #[test]
    fn spread_must_be_strictly_below_limit() {
        let mut input = passing_input();
        input.spread_bps = 50.0;
        assert!(!gates().evaluate_all(&input).microstructure_passed);
        input.spread_bps = 49.9;
        assert!(gates().evaluate_all(&input).microstructure_passed);
    }

    #[test]
    fn fatigue_needs_both_conditions() {
        let mut input = passing_input();
        input.momentum_24h = 15.0;
        assert!(gates().evaluate_all(&input).fatigue_passed);

        input.rsi_4h = 75.0;
        let r = gates().evaluate_all(&input);
        assert!(!r.fatigue_passed);
        assert_eq!(
            r.reason,
            "fatigue: 24h momentum 15.0% > 12% AND RSI4h 75.0 > 70"
        );

        input.momentum_24h = -15.0;
        assert!(!gates().evaluate_all(&input).fatigue_passed);
    }

    #[test]
    fn execution_delay_policy() {
        let mut input = passing_input();
        input.execution_time = input.signal_time + Duration::milliseconds(30_000);
        assert!(gates().evaluate_all(&input).policy_passed);

        input.execution_time = input.signal_time + Duration::milliseconds(30_001);
        let r = gates().evaluate_all(&input);
        assert!(!r.policy_passed);
        assert_eq!(r.reason, "execution delay 30001ms > 30000ms maximum");

        // Execution stamped before the signal is not a delay.
        input.execution_time = input.signal_time - Duration::seconds(5);
        assert!(gates().evaluate_all(&input).policy_passed);
    }

    #[test]
    fn family_failures_follow_gate_order() {
        let mut input = passing_input();
        input.spread_bps = 80.0;
        input.micro_vadr = 1.0;
        let r = gates().evaluate_all(&input);
        let fails = r.family_failures(GateFamily::Microstructure);
        assert_eq!(fails.len(), 2);
        assert!(fails[0].starts_with("spread"));
        assert!(fails[1].starts_with("micro VADR"));
        assert!(r.family_failures(GateFamily::Composite).is_empty());
    }

    #[test]
    fn evaluation_is_pure() {
        let g = gates();
        let input = passing_input();
        assert_eq!(g.evaluate_all(&input), g.evaluate_all(&input));
    }

    #[test]
    fn family_lookup() {
        assert_eq!(family_of(GATE_FATIGUE), Some(GateFamily::Fatigue));
        assert_eq!(family_of("unknown"), None);
    }
}
