//! Generation Coordinator
//!
//! Dispatches plans to the retry controller. Plans are grouped by target
//! path: groups run concurrently (bounded by `max_concurrency`), plans that
//! share a path run one after another inside their group.

use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::broker::SharedBroker;
use super::retry::RetryController;
use crate::types::{ChangeEvent, Result, TargetOutcome, UpdatePlan};

pub struct GenerationCoordinator {
    controller: Arc<RetryController>,
    max_concurrency: usize,
}

impl GenerationCoordinator {
    pub fn new(controller: Arc<RetryController>, max_concurrency: usize) -> Self {
        Self {
            controller,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Outcomes in completion order. Only fatal errors abort.
    pub async fn execute(
        &self,
        plans: Vec<UpdatePlan>,
        event: Arc<ChangeEvent>,
        broker: SharedBroker,
    ) -> Result<Vec<TargetOutcome>> {
        let groups = group_by_target(plans);
        info!(
            "Dispatching {} target(s), max concurrency {}",
            groups.len(),
            self.max_concurrency
        );

        let mut outcomes = Vec::new();
        let mut stream = futures::stream::iter(groups)
            .map(|(path, group)| {
                let controller = Arc::clone(&self.controller);
                let event = Arc::clone(&event);
                let broker = Arc::clone(&broker);
                async move {
                    let mut done = Vec::with_capacity(group.len());
                    for plan in group {
                        let plan = Arc::new(plan);
                        match controller.run(Arc::clone(&plan), &event, &broker).await {
                            Ok(outcome) => done.push(outcome),
                            Err(e) if e.is_fatal() => return Err(e),
                            Err(e) => {
                                warn!("Target {} failed outside the retry loop: {}", path, e);
                                done.push(TargetOutcome::failed_without_attempt(
                                    plan.perspective(),
                                    plan.path(),
                                    Some(plan.strategy),
                                    e.to_string(),
                                ));
                            }
                        }
                    }
                    Ok(done)
                }
            })
            .buffer_unordered(self.max_concurrency);

        while let Some(result) = stream.next().await {
            outcomes.extend(result?);
        }

        Ok(outcomes)
    }
}

/// Plans keyed by target path, input order kept within each group
fn group_by_target(plans: Vec<UpdatePlan>) -> Vec<(String, Vec<UpdatePlan>)> {
    let mut groups: BTreeMap<String, Vec<UpdatePlan>> = BTreeMap::new();
    for plan in plans {
        groups.entry(plan.path().to_string()).or_default().push(plan);
    }
    groups.into_iter().collect()
}
