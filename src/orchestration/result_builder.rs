//! Orchestration Result Builder
//!
//! Pure fold from terminal per-target records into the run result. Every
//! planned target appears exactly once, ordered by perspective.

use std::collections::HashMap;

use crate::ai::metrics::MetricsSummary;
use crate::types::{
    ChangeEvent, OrchestrationResult, Outcome, OutcomeCounts, Perspective, PerspectiveDecision,
    TargetOutcome, UpdateStrategy,
};

/// A target the run committed to, whether or not it was ever attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTarget {
    pub perspective: Perspective,
    pub path: String,
    pub strategy: Option<UpdateStrategy>,
}

pub fn build_result(
    run_id: &str,
    event: &ChangeEvent,
    decisions: Vec<PerspectiveDecision>,
    planned: &[PlannedTarget],
    outcomes: Vec<TargetOutcome>,
    cancelled: bool,
    metrics: MetricsSummary,
) -> OrchestrationResult {
    let mut by_key: HashMap<(Perspective, String), TargetOutcome> = outcomes
        .into_iter()
        .map(|o| ((o.perspective, o.path.clone()), o))
        .collect();

    let mut targets: Vec<TargetOutcome> = planned
        .iter()
        .map(|p| {
            by_key
                .remove(&(p.perspective, p.path.clone()))
                .unwrap_or_else(|| {
                    let reason = if cancelled {
                        "cancelled before dispatch"
                    } else {
                        "not executed"
                    };
                    TargetOutcome::failed_without_attempt(
                        p.perspective,
                        p.path.clone(),
                        p.strategy,
                        reason,
                    )
                })
        })
        .collect();
    targets.sort_by(|a, b| {
        a.perspective
            .rank()
            .cmp(&b.perspective.rank())
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut counts = OutcomeCounts::default();
    for t in &targets {
        match t.outcome {
            Outcome::Accepted => counts.accepted += 1,
            Outcome::Partial => counts.partial += 1,
            Outcome::Failed => counts.failed += 1,
        }
    }

    let mut decisions = decisions;
    decisions.sort_by_key(|d| d.perspective.rank());

    OrchestrationResult {
        run_id: run_id.to_string(),
        change_id: event.id.clone(),
        repository_id: event.repository_id.clone(),
        revision_id: event.revision_id.clone(),
        change_kind: event.kind,
        decisions,
        targets,
        counts,
        cancelled,
        metrics,
    }
}
