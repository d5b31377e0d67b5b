// =============================================================================
// Orthogonalizer: protected-momentum Gram-Schmidt
// =============================================================================
//
// Input order is fixed:
//
//   [momentum (protected), technical, volume, quality (, catalyst)]
//
// Momentum passes through untouched.  Every later factor has the running
// residual projected off each prior output in turn:
//
//   technical_resid = technical - proj(technical → momentum)
//   volume_resid    = volume    - proj(· → momentum) - proj(· → technical_resid)
//   quality_resid   = quality   - proj(· → all three priors)
//   catalyst_resid  = catalyst  - proj(· → all four priors)
//
// All vectors must share one length; mismatches fail fast rather than
// being truncated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::OrthogonalizationError;
use crate::factors::vector::{dot, project_out, FactorVector};

/// Default maximum |dot| for two factors to count as orthogonal.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

// =============================================================================
// OrthogonalizedFactors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthogonalizedFactors {
    /// Identical to the input momentum vector.
    pub momentum: FactorVector,
    pub technical: FactorVector,
    pub volume: FactorVector,
    pub quality: FactorVector,
    #[serde(default)]
    pub catalyst: Option<FactorVector>,
}

impl OrthogonalizedFactors {
    /// All factors in input order.
    pub fn all(&self) -> Vec<&FactorVector> {
        let mut out = vec![&self.momentum, &self.technical, &self.volume, &self.quality];
        if let Some(c) = &self.catalyst {
            out.push(c);
        }
        out
    }
}

// =============================================================================
// Orthogonalizer
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Orthogonalizer {
    tolerance: f64,
}

impl Default for Orthogonalizer {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Orthogonalizer {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Orthogonalize four or five factors against the protected momentum.
    pub fn orthogonalize(
        &self,
        factors: &[FactorVector],
    ) -> Result<OrthogonalizedFactors, OrthogonalizationError> {
        Self::check_shape(factors)?;

        let momentum = factors[0].clone();
        let mut outputs: Vec<FactorVector> = vec![momentum];

        for factor in &factors[1..] {
            let mut residual = factor.values.clone();
            for prior in &outputs {
                residual = project_out(&residual, &prior.values);
            }

            let out = FactorVector {
                name: format!("{}_resid", factor.name),
                values: residual,
                protected: false,
            };
            if let Some(index) = out.first_non_finite() {
                return Err(OrthogonalizationError::NonFinite {
                    name: out.name,
                    index,
                });
            }

            trace!(
                factor = %factor.name,
                magnitude = format!("{:.4}", out.magnitude()),
                "residual computed"
            );
            outputs.push(out);
        }

        let mut iter = outputs.into_iter();
        let (Some(momentum), Some(technical), Some(volume), Some(quality)) =
            (iter.next(), iter.next(), iter.next(), iter.next())
        else {
            return Err(OrthogonalizationError::FactorCount {
                expected: "4 or 5".to_string(),
                actual: factors.len(),
            });
        };

        Ok(OrthogonalizedFactors {
            momentum,
            technical,
            volume,
            quality,
            catalyst: iter.next(),
        })
    }

    fn check_shape(factors: &[FactorVector]) -> Result<(), OrthogonalizationError> {
        if factors.len() != 4 && factors.len() != 5 {
            let expected = if factors.len() < 4 { "4" } else { "4 or 5" };
            return Err(OrthogonalizationError::FactorCount {
                expected: expected.to_string(),
                actual: factors.len(),
            });
        }

        let first = &factors[0];
        if !first.protected || first.name != "momentum_core" {
            return Err(OrthogonalizationError::UnprotectedMomentum {
                name: first.name.clone(),
                protected: first.protected,
            });
        }

        let dim = first.len();
        for factor in factors {
            if factor.len() != dim {
                return Err(OrthogonalizationError::LengthMismatch {
                    name: factor.name.clone(),
                    expected: dim,
                    actual: factor.len(),
                });
            }
            if let Some(index) = factor.first_non_finite() {
                return Err(OrthogonalizationError::NonFinite {
                    name: factor.name.clone(),
                    index,
                });
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    /// Pairwise dot-product matrix in input order.
    pub fn orthogonality_matrix(factors: &OrthogonalizedFactors) -> Vec<Vec<f64>> {
        let all = factors.all();
        all.iter()
            .map(|a| all.iter().map(|b| dot(&a.values, &b.values)).collect())
            .collect()
    }

    /// Euclidean magnitude per factor name.
    pub fn magnitudes(factors: &OrthogonalizedFactors) -> BTreeMap<String, f64> {
        factors
            .all()
            .into_iter()
            .map(|f| (f.name.clone(), f.magnitude()))
            .collect()
    }

    /// First off-diagonal pair whose |dot| exceeds the tolerance.
    pub fn validate_orthogonality(
        &self,
        factors: &OrthogonalizedFactors,
    ) -> Result<(), OrthogonalizationError> {
        let all = factors.all();
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                let d = dot(&all[i].values, &all[j].values);
                if d.abs() > self.tolerance {
                    return Err(OrthogonalizationError::NotOrthogonal {
                        a: all[i].name.clone(),
                        b: all[j].name.clone(),
                        dot: d,
                        tolerance: self.tolerance,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn is_orthogonal(&self, factors: &OrthogonalizedFactors) -> bool {
        self.validate_orthogonality(factors).is_ok()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn four(m: Vec<f64>, t: Vec<f64>, v: Vec<f64>, q: Vec<f64>) -> Vec<FactorVector> {
        vec![
            FactorVector::protected("momentum_core", m),
            FactorVector::new("technical", t),
            FactorVector::new("volume", v),
            FactorVector::new("quality", q),
        ]
    }

    fn correlated() -> Vec<FactorVector> {
        vec![
            FactorVector::protected("momentum_core", vec![0.8, 0.1, 0.3, 0.5]),
            FactorVector::new("technical", vec![0.7, 0.2, 0.4, 0.6]),
            FactorVector::new("volume", vec![0.9, 0.5, 0.1, 0.2]),
            FactorVector::new("quality", vec![0.3, 0.8, 0.6, 0.1]),
            FactorVector::new("catalyst", vec![0.5, 0.5, 0.5, 0.5]),
        ]
    }

    #[test]
    fn residuals_are_pairwise_orthogonal() {
        let orth = Orthogonalizer::default();
        let out = orth.orthogonalize(&correlated()).unwrap();
        let matrix = Orthogonalizer::orthogonality_matrix(&out);
        for i in 0..matrix.len() {
            for j in 0..matrix.len() {
                if i != j {
                    assert!(matrix[i][j].abs() < 0.01, "[{i}][{j}] = {}", matrix[i][j]);
                }
            }
        }
        assert!(orth.is_orthogonal(&out));
    }

    #[test]
    fn extreme_magnitudes_stay_orthogonal() {
        let orth = Orthogonalizer::default();
        let factors = four(
            vec![50.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.9, 0.8, 0.0],
            vec![40.0, -3.0, 12.0, 0.0],
            vec![25.0, 0.5, -4.0, 9.0],
        );
        let out = orth.orthogonalize(&factors).unwrap();
        assert!(orth.validate_orthogonality(&out).is_ok());
    }

    #[test]
    fn momentum_is_never_mutated() {
        let factors = correlated();
        let out = Orthogonalizer::default().orthogonalize(&factors).unwrap();
        assert_eq!(out.momentum, factors[0]);
        assert!(out.momentum.protected);
    }

    #[test]
    fn residual_names_are_suffixed() {
        let out = Orthogonalizer::default().orthogonalize(&correlated()).unwrap();
        assert_eq!(out.technical.name, "technical_resid");
        assert_eq!(out.catalyst.as_ref().map(|c| c.name.as_str()), Some("catalyst_resid"));
    }

    #[test]
    fn wrong_count_is_rejected() {
        let mut factors = correlated();
        factors.truncate(3);
        let err = Orthogonalizer::default().orthogonalize(&factors).unwrap_err();
        assert!(err.to_string().contains("expected 4 factors"));

        let mut six = correlated();
        six.push(FactorVector::new("extra", vec![0.0; 4]));
        assert!(matches!(
            Orthogonalizer::default().orthogonalize(&six),
            Err(OrthogonalizationError::FactorCount { actual: 6, .. })
        ));
    }

    #[test]
    fn unprotected_first_factor_is_rejected() {
        let mut factors = correlated();
        factors[0].protected = false;
        let err = Orthogonalizer::default().orthogonalize(&factors).unwrap_err();
        assert!(err
            .to_string()
            .contains("first factor must be protected momentum_core"));
    }

    #[test]
    fn length_mismatch_fails_fast() {
        let factors = four(
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.5, 0.5, 0.5],
            vec![0.1, 0.2, 0.3, 0.4],
            vec![0.1, 0.2, 0.3, 0.4],
        );
        assert_eq!(
            Orthogonalizer::default().orthogonalize(&factors).unwrap_err(),
            OrthogonalizationError::LengthMismatch {
                name: "technical".into(),
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let factors = four(
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.5, f64::INFINITY, 0.5, 0.0],
            vec![0.1, 0.2, 0.3, 0.4],
            vec![0.1, 0.2, 0.3, 0.4],
        );
        assert!(matches!(
            Orthogonalizer::default().orthogonalize(&factors),
            Err(OrthogonalizationError::NonFinite { index: 1, .. })
        ));
    }

    #[test]
    fn degenerate_technical_leaves_quality_untouched() {
        // Zero technical factor and a volume factor fully explained by
        // momentum: both priors of quality have v·v < 1e-10.
        let quality = vec![0.0, 0.5, 0.3, 0.2];
        let factors = four(
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
            quality.clone(),
        );
        let out = Orthogonalizer::default().orthogonalize(&factors).unwrap();
        assert_eq!(out.technical.values, vec![0.0; 4]);
        assert_eq!(out.quality.values, quality);
        assert!(out.quality.values.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn magnitudes_and_matrix_shape() {
        let out = Orthogonalizer::default().orthogonalize(&correlated()).unwrap();
        let mags = Orthogonalizer::magnitudes(&out);
        assert_eq!(mags.len(), 5);
        let m = (0.8f64 * 0.8 + 0.1 * 0.1 + 0.3 * 0.3 + 0.5 * 0.5).sqrt();
        assert!((mags["momentum_core"] - m).abs() < 1e-12);
        let matrix = Orthogonalizer::orthogonality_matrix(&out);
        assert_eq!(matrix.len(), 5);
        assert!((matrix[0][0] - m * m).abs() < 1e-12);
    }

    #[test]
    fn tight_tolerance_reports_offending_pair() {
        let factors = correlated();
        let out = Orthogonalizer::default().orthogonalize(&factors).unwrap();
        // Tamper with a residual to break orthogonality.
        let mut broken = out.clone();
        broken.technical = factors[1].clone();
        let err = Orthogonalizer::new(0.01)
            .validate_orthogonality(&broken)
            .unwrap_err();
        assert!(matches!(err, OrthogonalizationError::NotOrthogonal { .. }));
    }
}
