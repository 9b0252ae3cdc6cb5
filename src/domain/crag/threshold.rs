//! Threshold policy: the minimum acceptable fraction of relevant passages

use serde::{Deserialize, Serialize};

/// Which threshold rule is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    Fixed,
    Dynamic,
}

impl std::fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Threshold configuration; exactly one mode is active per instance.
///
/// Dynamic mode keeps the absolute number of trustworthy passages stable as the
/// retrieval width changes, so it does not need re-tuning when `k` does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdSpec {
    /// A fixed ratio in `[0, 1]`, independent of `k`
    Fixed { ratio: f64 },
    /// `min(1.0, min_relevant / k)`, or `1.0` when `k == 0`
    Dynamic { min_relevant: usize },
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        Self::Fixed { ratio: 0.6 }
    }
}

impl ThresholdSpec {
    pub fn fixed(ratio: f64) -> Self {
        Self::Fixed { ratio }
    }

    pub fn dynamic(min_relevant: usize) -> Self {
        Self::Dynamic { min_relevant }
    }

    pub fn mode(&self) -> ThresholdMode {
        match self {
            Self::Fixed { .. } => ThresholdMode::Fixed,
            Self::Dynamic { .. } => ThresholdMode::Dynamic,
        }
    }

    pub fn min_relevant(&self) -> Option<usize> {
        match self {
            Self::Fixed { .. } => None,
            Self::Dynamic { min_relevant } => Some(*min_relevant),
        }
    }

    /// Resolve the threshold for a retrieval width of `k`. Always in `[0, 1]`.
    pub fn resolve(&self, k: usize) -> f64 {
        match *self {
            Self::Fixed { ratio } if ratio.is_nan() => 1.0,
            Self::Fixed { ratio } => ratio.clamp(0.0, 1.0),
            Self::Dynamic { .. } if k == 0 => 1.0,
            Self::Dynamic { min_relevant } => (min_relevant as f64 / k as f64).min(1.0),
        }
    }

    /// Reject fixed ratios outside `[0, 1]`
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::Fixed { ratio } if !(0.0..=1.0).contains(&ratio) => {
                Err(format!("fixed threshold ratio must be within [0, 1], got {}", ratio))
            }
            _ => Ok(()),
        }
    }
}
