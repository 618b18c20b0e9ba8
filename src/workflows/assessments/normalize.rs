use serde::{Deserialize, Serialize};

use super::domain::AssessmentKind;

/// Process-wide comparison scales and pass thresholds. Injected into the
/// services at construction so tests can exercise alternate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub general_scale: u32,
    pub general_threshold: u32,
    pub specialized_scale: u32,
    pub specialized_threshold: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            general_scale: 1000,
            general_threshold: 800,
            specialized_scale: 600,
            specialized_threshold: 400,
        }
    }
}

impl ScoringConfig {
    pub const fn scale(&self, kind: AssessmentKind) -> u32 {
        match kind {
            AssessmentKind::GeneralCompetencies => self.general_scale,
            AssessmentKind::SpecializedCompetencies => self.specialized_scale,
        }
    }

    pub const fn threshold(&self, kind: AssessmentKind) -> u32 {
        match kind {
            AssessmentKind::GeneralCompetencies => self.general_threshold,
            AssessmentKind::SpecializedCompetencies => self.specialized_threshold,
        }
    }

    pub fn normalize_for(&self, raw: u32, max: u32, kind: AssessmentKind) -> u32 {
        normalize(raw, max, self.scale(kind))
    }

    pub fn passed(&self, normalized: u32, kind: AssessmentKind) -> bool {
        normalized >= self.threshold(kind)
    }
}

/// Rescale a raw score onto a fixed comparison scale. A zero maximum maps
/// to 0 instead of dividing by zero.
pub fn normalize(raw: u32, max: u32, scale: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    (f64::from(raw) / f64::from(max) * f64::from(scale)).round() as u32
}
