// =============================================================================
// Factor Vector
// =============================================================================
//
// A named, ordered list of pre-scaled components.  The protected flag marks
// the momentum factor, which the orthogonalizer never mutates.
//
// Projection of u onto v removes the v-component of u:
//
//   u - (u·v / v·v) · v
//
// When v·v < 1e-10 the projection is skipped and u is returned unchanged.

use serde::{Deserialize, Serialize};

/// Denominator below which a projection is skipped.
pub const PROJECTION_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorVector {
    pub name: String,
    pub values: Vec<f64>,
    #[serde(default)]
    pub protected: bool,
}

impl FactorVector {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            protected: false,
        }
    }

    pub fn protected(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            protected: true,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy zero-padded on the right to `dim` components.
    ///
    /// Vectors already at or above `dim` are returned as is.
    pub fn padded(&self, dim: usize) -> Self {
        let mut values = self.values.clone();
        if values.len() < dim {
            values.resize(dim, 0.0);
        }
        Self {
            name: self.name.clone(),
            values,
            protected: self.protected,
        }
    }

    /// Copy placed on its own axes: `offset` leading zeros before the
    /// components.
    pub fn shifted(&self, offset: usize) -> Self {
        let mut values = vec![0.0; offset];
        values.extend_from_slice(&self.values);
        Self {
            name: self.name.clone(),
            values,
            protected: self.protected,
        }
    }

    pub fn magnitude(&self) -> f64 {
        dot(&self.values, &self.values).sqrt()
    }

    /// Index of the first non-finite component, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.values.iter().position(|v| !v.is_finite())
    }

    /// Arithmetic mean of the components, 0 for an empty vector.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// Dot product of two equal-length slices.
///
/// Lengths are checked by the orthogonalizer before any arithmetic runs.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Remove the component of `u` along `v`.
pub fn project_out(u: &[f64], v: &[f64]) -> Vec<f64> {
    let vv = dot(v, v);
    if vv < PROJECTION_EPSILON {
        return u.to_vec();
    }
    let coeff = dot(u, v) / vv;
    u.iter().zip(v).map(|(ui, vi)| ui - coeff * vi).collect()
}
