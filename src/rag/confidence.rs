use serde::{Deserialize, Serialize};

/// Scores above this are `High`
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.8;
/// Scores above this (and not above the high threshold) are `Medium`
pub const MEDIUM_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Coarse summary of how relevant the best retrieved chunk was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Classify by the best reranker score; no scores means `Low`
    #[inline]
    pub fn from_scores(scores: &[f32]) -> Self {
        let Some(best) = scores.iter().copied().reduce(f32::max) else {
            return Self::Low;
        };

        if best > HIGH_CONFIDENCE_THRESHOLD {
            Self::High
        } else if best > MEDIUM_CONFIDENCE_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for Confidence {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}
