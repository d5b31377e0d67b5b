// =============================================================================
// Shared types used across the scoring, gating and explain layers
// =============================================================================

use serde::{Deserialize, Serialize};

/// How a composite score was produced.
///
/// A fallback score never carries residuals, so callers can tell it apart
/// from a fully orthogonalized one without inspecting the numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreComputation {
    Orthogonalized,
    Fallback { reason: String },
}

impl ScoreComputation {
    pub fn is_orthogonalized(&self) -> bool {
        matches!(self, Self::Orthogonalized)
    }
}

impl Default for ScoreComputation {
    fn default() -> Self {
        Self::Orthogonalized
    }
}

impl std::fmt::Display for ScoreComputation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Orthogonalized => write!(f, "orthogonalized"),
            Self::Fallback { reason } => write!(f, "fallback ({reason})"),
        }
    }
}

/// The five independent entry-gate families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateFamily {
    Composite,
    Freshness,
    Microstructure,
    Fatigue,
    Policy,
}

impl GateFamily {
    pub const ALL: [GateFamily; 5] = [
        Self::Composite,
        Self::Freshness,
        Self::Microstructure,
        Self::Fatigue,
        Self::Policy,
    ];
}

impl std::fmt::Display for GateFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Composite => write!(f, "COMPOSITE"),
            Self::Freshness => write!(f, "FRESHNESS"),
            Self::Microstructure => write!(f, "MICROSTRUCTURE"),
            Self::Fatigue => write!(f, "FATIGUE"),
            Self::Policy => write!(f, "POLICY"),
        }
    }
}

/// Completeness of the external measurement sources behind a boosted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Complete,
    Good,
    Limited,
    Incomplete,
}

impl DataQuality {
    /// Tier from the number of sources (out of three) that answered.
    pub fn from_available(available: usize) -> Self {
        match available {
            3.. => Self::Complete,
            2 => Self::Good,
            1 => Self::Limited,
            _ => Self::Incomplete,
        }
    }

    pub fn available_sources(self) -> usize {
        match self {
            Self::Complete => 3,
            Self::Good => 2,
            Self::Limited => 1,
            Self::Incomplete => 0,
        }
    }
}

impl std::fmt::Display for DataQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Complete => "Complete",
            Self::Good => "Good",
            Self::Limited => "Limited",
            Self::Incomplete => "Incomplete",
        };
        write!(f, "{} ({}/3 sources)", label, self.available_sources())
    }
}
