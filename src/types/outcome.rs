//! Terminal per-target outcomes and the final orchestration result.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::change::ChangeKind;
use super::perspective::{Perspective, PerspectiveDecision};
use super::plan::UpdateStrategy;
use super::quality::QualityReport;
use crate::ai::metrics::MetricsSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Accepted,
    Partial,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Retry controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryState {
    Pending,
    Generating,
    Validating,
    Retrying,
    Accepted,
    Failed,
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Failed)
    }

    /// Edges of the retry state machine
    pub fn can_transition_to(&self, next: RetryState) -> bool {
        use RetryState::*;
        matches!(
            (self, next),
            (Pending, Generating)
                | (Pending, Failed)
                | (Generating, Validating)
                | (Generating, Retrying)
                | (Generating, Failed)
                | (Validating, Accepted)
                | (Validating, Retrying)
                | (Validating, Failed)
                | (Retrying, Generating)
                | (Retrying, Failed)
        )
    }
}

impl fmt::Display for RetryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Retrying => "retrying",
            Self::Accepted => "accepted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What happened in one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub aggregate: Option<f64>,
    pub passed: bool,
    pub low_confidence: bool,
    pub error: Option<String>,
}

/// Terminal record for one planned target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub perspective: Perspective,
    pub path: String,
    /// `None` when planning itself failed
    pub strategy: Option<UpdateStrategy>,
    pub outcome: Outcome,
    /// Accepted content, or the best attempt's content for partial outcomes
    pub content: Option<String>,
    pub report: Option<QualityReport>,
    pub attempts_used: u32,
    pub reason: Option<String>,
    pub attempts: Vec<AttemptRecord>,
    pub transitions: Vec<RetryState>,
}

impl TargetOutcome {
    /// Outcome for a target that failed before any attempt ran
    pub fn failed_without_attempt(
        perspective: Perspective,
        path: impl Into<String>,
        strategy: Option<UpdateStrategy>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            perspective,
            path: path.into(),
            strategy,
            outcome: Outcome::Failed,
            content: None,
            report: None,
            attempts_used: 0,
            reason: Some(reason.into()),
            attempts: Vec::new(),
            transitions: vec![RetryState::Pending, RetryState::Failed],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub accepted: usize,
    pub partial: usize,
    pub failed: usize,
}

/// The terminal, externally visible artifact of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub run_id: String,
    pub change_id: String,
    pub repository_id: String,
    pub revision_id: String,
    pub change_kind: ChangeKind,
    pub decisions: Vec<PerspectiveDecision>,
    pub targets: Vec<TargetOutcome>,
    pub counts: OutcomeCounts,
    pub cancelled: bool,
    pub metrics: MetricsSummary,
}

impl OrchestrationResult {
    pub fn target(&self, perspective: Perspective) -> Option<&TargetOutcome> {
        self.targets.iter().find(|t| t.perspective == perspective)
    }

    /// Targets carrying deliverable content
    pub fn deliverable(&self, include_partial: bool) -> impl Iterator<Item = &TargetOutcome> {
        self.targets.iter().filter(move |t| {
            t.content.is_some()
                && (t.outcome == Outcome::Accepted
                    || (include_partial && t.outcome == Outcome::Partial))
        })
    }

    pub fn is_noop(&self) -> bool {
        self.targets.is_empty()
    }
}

impl OrchestrationResult {
    /// Human-readable run summary
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "# Documentation Run {}\n\nChange `{}` ({}) on `{}` at `{}`\n",
            self.run_id, self.change_id, self.change_kind, self.repository_id, self.revision_id
        );
        if self.cancelled {
            out.push_str("\n> Run was cancelled; remaining targets were not attempted.\n");
        }

        out.push_str(
            "\n## Perspectives\n\n| Perspective | Triggered | Confidence | Reason |\n|---|---|---|---|\n",
        );
        for d in &self.decisions {
            out.push_str(&format!(
                "| {} | {} | {:.2} | {} |\n",
                d.perspective,
                if d.triggered { "yes" } else { "no" },
                d.confidence,
                d.reason.replace('|', "\\|")
            ));
        }

        if self.targets.is_empty() {
            out.push_str("\nNo documentation affected.\n");
            return out;
        }

        out.push_str(
            "\n## Targets\n\n| Target | Perspective | Strategy | Outcome | Attempts | Score |\n|---|---|---|---|---|---|\n",
        );
        for t in &self.targets {
            out.push_str(&format!(
                "| `{}` | {} | {} | {} | {} | {} |\n",
                t.path,
                t.perspective,
                t.strategy.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                t.outcome,
                t.attempts_used,
                t.report
                    .as_ref()
                    .map(|r| format!("{:.2}", r.aggregate))
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }

        let explained: Vec<&TargetOutcome> =
            self.targets.iter().filter(|t| t.reason.is_some()).collect();
        if !explained.is_empty() {
            out.push_str("\n## Notes\n\n");
            for t in explained {
                out.push_str(&format!(
                    "- `{}`: {}\n",
                    t.path,
                    t.reason.as_deref().unwrap_or_default()
                ));
            }
        }

        out.push_str(&format!(
            "\n{} accepted, {} partial, {} failed\n",
            self.counts.accepted, self.counts.partial, self.counts.failed
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_state_edges() {
        use RetryState::*;
        assert!(Pending.can_transition_to(Generating));
        assert!(Validating.can_transition_to(Retrying));
        assert!(Retrying.can_transition_to(Generating));
        assert!(!Accepted.can_transition_to(Generating));
        assert!(!Pending.can_transition_to(Accepted));
        assert!(!Failed.can_transition_to(Retrying));
    }

    #[test]
    fn test_failed_without_attempt() {
        let outcome = TargetOutcome::failed_without_attempt(
            Perspective::Engagement,
            "README.md",
            None,
            "store unavailable",
        );
        assert_eq!(outcome.attempts_used, 0);
        assert_eq!(outcome.transitions, vec![RetryState::Pending, RetryState::Failed]);
        assert!(outcome.content.is_none());
    }
}
