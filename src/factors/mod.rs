// =============================================================================
// Factors Module
// =============================================================================
//
// Factor vectors and the protected-momentum Gram-Schmidt orthogonalizer:
// - `vector`          FactorVector plus dot / magnitude / projection helpers
// - `builder`         FactorBuilder contract and the standard scaling builder
// - `orthogonalizer`  sequential projection and orthogonality diagnostics

pub mod builder;
pub mod orthogonalizer;
pub mod vector;

pub use builder::{FactorBuilder, FactorSet, StandardFactorBuilder};
pub use orthogonalizer::{OrthogonalizedFactors, Orthogonalizer};
pub use vector::FactorVector;
