//! Documentation Orchestration Engine
//!
//! One run turns a raw change into an [`OrchestrationResult`]:
//!
//! ```text
//! RawChange
//!   -> ChangeClassifier      (typed ChangeEvent)
//!   -> RepositoryFacts       (snapshot, "unknown" on failure)
//!   -> PerspectiveSelector   (one decision per perspective)
//!   -> UpdatePlanner         (one plan per triggered perspective)
//!   -> GenerationCoordinator (bounded concurrency, per-target serialization)
//!        -> RetryController  (generate -> validate -> align, bounded attempts)
//!   -> build_result          (every planned target exactly once)
//! ```
//!
//! Only invalid input, context ownership conflicts, and plan invariant
//! breaches abort a run. Every other failure is recorded on its target.

pub mod aligner;
pub mod broker;
pub mod classifier;
pub mod coordinator;
pub mod planner;
pub mod ports;
pub mod result_builder;
pub mod retry;
pub mod selector;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use aligner::QualityAligner;
pub use broker::{ContextBroker, Owner, SharedBroker, keys};
pub use classifier::ChangeClassifier;
pub use coordinator::GenerationCoordinator;
pub use planner::UpdatePlanner;
pub use ports::{
    DocumentStore, GenerationCapability, RepositoryFacts, SharedCapability, SharedFacts,
    SharedStore,
};
pub use result_builder::{PlannedTarget, build_result};
pub use retry::{RetryController, RetryPolicy};
pub use selector::PerspectiveSelector;
pub use validator::QualityValidator;

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::ai::metrics::create_shared_metrics;
use crate::config::Config;
use crate::types::{
    ChangeEvent, OrchestrationResult, PerspectiveDecision, RawChange, RepositorySnapshot, Result,
    RunId, TargetOutcome, UpdatePlan,
};

/// Classification, selection and planning without generation
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub change: ChangeEvent,
    pub snapshot: RepositorySnapshot,
    pub decisions: Vec<PerspectiveDecision>,
    pub plans: Vec<UpdatePlan>,
    /// Triggered perspectives whose target could not be planned
    pub failures: Vec<TargetOutcome>,
}

/// Everything decided before the first generation call
struct Prepared {
    event: Arc<ChangeEvent>,
    snapshot: RepositorySnapshot,
    decisions: Vec<PerspectiveDecision>,
    plans: Vec<UpdatePlan>,
    failures: Vec<TargetOutcome>,
    broker: SharedBroker,
}

impl Prepared {
    fn planned(&self) -> Vec<PlannedTarget> {
        self.plans
            .iter()
            .map(|p| PlannedTarget {
                perspective: p.perspective(),
                path: p.path().to_string(),
                strategy: Some(p.strategy),
            })
            .chain(self.failures.iter().map(|f| PlannedTarget {
                perspective: f.perspective,
                path: f.path.clone(),
                strategy: f.strategy,
            }))
            .collect()
    }
}

pub struct Orchestrator {
    config: Config,
    capability: SharedCapability,
    facts: SharedFacts,
    store: SharedStore,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        capability: SharedCapability,
        facts: SharedFacts,
        store: SharedStore,
    ) -> Self {
        Self {
            config,
            capability,
            facts,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn start(&self, raw: &RawChange) -> Result<OrchestrationResult> {
        self.start_with_cancel(raw, CancellationToken::new()).await
    }

    /// Full run. Cancellation stops new attempts; the result still lists
    /// every planned target.
    #[instrument(skip_all, fields(repo = %raw.repository_id, rev = %raw.revision_id))]
    pub async fn start_with_cancel(
        &self,
        raw: &RawChange,
        cancel: CancellationToken,
    ) -> Result<OrchestrationResult> {
        let run_id = RunId::generate();
        let metrics = create_shared_metrics(run_id.as_str());
        info!("Run {} started", run_id);

        let prepared = self.prepare(raw).await?;
        let planned = prepared.planned();
        let Prepared {
            event,
            decisions,
            plans,
            failures,
            broker,
            ..
        } = prepared;

        let mut outcomes = if plans.is_empty() {
            Vec::new()
        } else if cancel.is_cancelled() {
            info!("Cancelled before dispatch; {} target(s) not attempted", plans.len());
            Vec::new()
        } else {
            let orchestration = &self.config.orchestration;
            let controller = RetryController::new(
                Arc::clone(&self.capability),
                Arc::new(QualityValidator::new(self.config.quality.clone())),
                Arc::new(QualityAligner::new(
                    self.config.alignment.clone(),
                    self.config.quality.pass_threshold,
                )),
                RetryPolicy::from_config(orchestration),
                Arc::clone(&metrics),
                cancel.clone(),
            );
            GenerationCoordinator::new(Arc::new(controller), orchestration.max_concurrency)
                .execute(plans, Arc::clone(&event), broker)
                .await?
        };
        outcomes.extend(failures);

        let result = build_result(
            run_id.as_str(),
            &event,
            decisions,
            &planned,
            outcomes,
            cancel.is_cancelled(),
            metrics.summary(),
        );
        info!(
            "Run {} finished: {} accepted, {} partial, {} failed",
            run_id, result.counts.accepted, result.counts.partial, result.counts.failed
        );
        Ok(result)
    }

    /// Everything up to dispatch, for previews
    pub async fn plan(&self, raw: &RawChange) -> Result<PlanReport> {
        let prepared = self.prepare(raw).await?;
        Ok(PlanReport {
            change: Arc::unwrap_or_clone(prepared.event),
            snapshot: prepared.snapshot,
            decisions: prepared.decisions,
            plans: prepared.plans,
            failures: prepared.failures,
        })
    }

    async fn prepare(&self, raw: &RawChange) -> Result<Prepared> {
        let classifier = ChangeClassifier::new(&self.config.selection.decision_keywords);
        let event = classifier.classify(raw)?;
        info!(
            "Change {} ({}): {} path(s)",
            event.id,
            event.kind,
            event.paths.len()
        );

        let snapshot = match self
            .facts
            .get_snapshot(&event.repository_id, &event.revision_id)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Repository facts unavailable, using unknown snapshot: {}", e);
                RepositorySnapshot::unknown(&event.repository_id, &event.revision_id)
            }
        };

        let broker: SharedBroker = Arc::new(ContextBroker::new());
        broker.put_typed(Owner::Orchestrator, keys::CHANGE, &event)?;
        broker.put_typed(Owner::Orchestrator, keys::SNAPSHOT, &snapshot)?;

        let decisions = PerspectiveSelector::select(&event, &snapshot);
        broker.put_typed(Owner::Orchestrator, keys::DECISIONS, &decisions)?;

        let planner = UpdatePlanner::new(self.config.targets.clone(), Arc::clone(&self.store));
        let mut plans = Vec::new();
        let mut failures = Vec::new();
        for decision in decisions.iter().filter(|d| d.triggered) {
            let perspective = decision.perspective;
            match planner.plan(perspective, &event, &snapshot).await {
                Ok(plan) => {
                    let owner = Owner::Perspective(perspective);
                    broker.put_typed(owner, &ContextBroker::key(owner, "plan"), &plan)?;
                    plans.push(plan);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let path = planner.target_path(perspective, &snapshot);
                    warn!("Could not plan {} ({}): {}", perspective, path, e);
                    failures.push(TargetOutcome::failed_without_attempt(
                        perspective,
                        path,
                        None,
                        format!("planning failed: {}", e),
                    ));
                }
            }
        }

        Ok(Prepared {
            event: Arc::new(event),
            snapshot,
            decisions,
            plans,
            failures,
            broker,
        })
    }
}
