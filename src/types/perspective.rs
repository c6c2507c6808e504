//! Documentation perspectives and the selector's per-perspective decisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One fixed category of documentation concern.
///
/// Declaration order is evaluation order and presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Perspective {
    /// How external actors interact with the system
    Engagement,
    /// What the system currently is and does
    CurrentState,
    /// Notable decisions, reversals, and learnings
    DecisionHistory,
}

impl Perspective {
    pub const ALL: [Perspective; 3] = [
        Perspective::Engagement,
        Perspective::CurrentState,
        Perspective::DecisionHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Engagement => "engagement",
            Self::CurrentState => "current-state",
            Self::DecisionHistory => "decision-history",
        }
    }

    /// Position in the fixed evaluation order
    pub fn rank(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Perspective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "engagement" => Ok(Self::Engagement),
            "current-state" => Ok(Self::CurrentState),
            "decision-history" => Ok(Self::DecisionHistory),
            _ => Err(format!(
                "Unknown perspective: '{}'. Valid: engagement, current-state, decision-history",
                s
            )),
        }
    }
}

/// Selector output for one perspective. Never revisited once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveDecision {
    pub perspective: Perspective,
    pub triggered: bool,
    pub reason: String,
    pub confidence: f64,
}

impl PerspectiveDecision {
    pub fn triggered(perspective: Perspective, reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            perspective,
            triggered: true,
            reason: reason.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn skipped(perspective: Perspective, reason: impl Into<String>) -> Self {
        Self {
            perspective,
            triggered: false,
            reason: reason.into(),
            confidence: 1.0,
        }
    }
}
