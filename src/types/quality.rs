//! Quality reports produced per generation attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::quality::AXIS_FLOOR;

/// The three fixed scoring axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityAxis {
    Structural,
    Completeness,
    Consistency,
}

impl fmt::Display for QualityAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => write!(f, "structural"),
            Self::Completeness => write!(f, "completeness"),
            Self::Consistency => write!(f, "consistency"),
        }
    }
}

/// Section name used for notes that apply to the whole document
pub const DOCUMENT_SCOPE: &str = "(document)";

/// Targeted feedback for the next attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementNote {
    pub axis: QualityAxis,
    pub section: String,
    pub message: String,
}

impl ImprovementNote {
    pub fn new(axis: QualityAxis, section: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            axis,
            section: section.into(),
            message: message.into(),
        }
    }

    pub fn document(axis: QualityAxis, message: impl Into<String>) -> Self {
        Self::new(axis, DOCUMENT_SCOPE, message)
    }
}

impl fmt::Display for ImprovementNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.axis, self.section, self.message)
    }
}

/// Scores for one attempt. A new report is produced per attempt; reports are
/// never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub attempt: u32,
    pub structural: f64,
    pub completeness: f64,
    pub consistency: f64,
    /// Weighted mean of the three axes
    pub validator_score: f64,
    /// Score reported by the generation capability, normalized to 0..=1
    pub capability_score: Option<f64>,
    /// Authoritative score: the validator score, or the aligned blend
    pub aggregate: f64,
    pub passed: bool,
    pub low_confidence: bool,
    pub notes: Vec<ImprovementNote>,
}

impl QualityReport {
    /// Accepted only when passing and not flagged
    pub fn acceptable(&self) -> bool {
        self.passed && !self.low_confidence
    }

    /// Any single axis below [`AXIS_FLOOR`]; such a report never passes
    pub fn below_axis_floor(&self) -> bool {
        [self.structural, self.completeness, self.consistency]
            .iter()
            .any(|score| *score < AXIS_FLOOR)
    }

    pub fn failing_axes(&self, threshold: f64) -> Vec<QualityAxis> {
        [
            (QualityAxis::Structural, self.structural),
            (QualityAxis::Completeness, self.completeness),
            (QualityAxis::Consistency, self.consistency),
        ]
        .into_iter()
        .filter(|(_, score)| *score < threshold)
        .map(|(axis, _)| axis)
        .collect()
    }
}
