//! Retry Controller
//!
//! Drives one target through `Pending -> Generating -> Validating ->
//! {Accepted | Retrying | Failed}`. Attempts are strictly sequential and
//! bounded by the policy. Quality rejections retry immediately with the
//! report's notes as feedback. Every non-fatal capability error spends an
//! attempt; transient ones (unavailable, timeout, rate limit) first wait an
//! exponential backoff that cancellation cuts short, while permanent ones
//! (auth, bad request) go straight to the next attempt.
//!
//! When attempts run out, the best-scoring attempt is kept as a `partial`
//! outcome. Ties keep the earliest attempt.

use backon::{BackoffBuilder, ExponentialBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::aligner::QualityAligner;
use super::broker::{ContextBroker, Owner};
use super::ports::SharedCapability;
use super::validator::QualityValidator;
use crate::ai::metrics::SharedMetrics;
use crate::ai::timeout::with_timeout;
use crate::config::OrchestrationConfig;
use crate::constants::retry as retry_constants;
use crate::types::{
    AttemptRecord, ChangeEvent, DocweaveError, GenerationRequest, ImprovementNote, Outcome,
    QualityReport, Result, RetryState, TargetOutcome, UpdatePlan,
};

/// Attempt budget, backoff, and per-call time limit
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Zero disables waiting between unavailable attempts
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry_constants::DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_delay: Duration::from_millis(retry_constants::MAX_DELAY_MS),
            timeout: Duration::from_secs(crate::constants::generation::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &OrchestrationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.retry_backoff_ms),
            max_delay: Duration::from_millis(
                config.retry_backoff_max_ms.max(config.retry_backoff_ms),
            ),
            timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }

    /// Delays between unavailable attempts
    fn backoff(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        if self.base_delay.is_zero() {
            return Box::new(std::iter::empty());
        }
        Box::new(
            ExponentialBuilder::default()
                .with_min_delay(self.base_delay)
                .with_max_delay(self.max_delay)
                .with_factor(retry_constants::BACKOFF_FACTOR)
                .with_jitter()
                .with_max_times(self.max_attempts as usize)
                .build(),
        )
    }
}

/// State plus the path taken to reach it
struct Machine {
    state: RetryState,
    transitions: Vec<RetryState>,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: RetryState::Pending,
            transitions: vec![RetryState::Pending],
        }
    }

    fn advance(&mut self, next: RetryState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid retry transition {} -> {}",
            self.state,
            next
        );
        debug!("{} -> {}", self.state, next);
        self.state = next;
        self.transitions.push(next);
    }
}

/// Best failing attempt so far
struct Candidate {
    content: String,
    report: QualityReport,
}

pub struct RetryController {
    capability: SharedCapability,
    validator: Arc<QualityValidator>,
    aligner: Arc<QualityAligner>,
    policy: RetryPolicy,
    metrics: SharedMetrics,
    cancel: CancellationToken,
}

impl RetryController {
    pub fn new(
        capability: SharedCapability,
        validator: Arc<QualityValidator>,
        aligner: Arc<QualityAligner>,
        policy: RetryPolicy,
        metrics: SharedMetrics,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            capability,
            validator,
            aligner,
            policy,
            metrics,
            cancel,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run attempts for one plan until accepted, exhausted, or cancelled.
    /// Only fatal errors are returned as `Err`.
    #[instrument(skip_all, fields(target = %plan.path(), perspective = %plan.perspective()))]
    pub async fn run(
        &self,
        plan: Arc<UpdatePlan>,
        event: &ChangeEvent,
        broker: &ContextBroker,
    ) -> Result<TargetOutcome> {
        let label = format!("{}:{}", plan.perspective(), plan.path());
        let max_attempts = self.policy.max_attempts;
        let mut machine = Machine::new();
        let mut records: Vec<AttemptRecord> = Vec::new();
        let mut best: Option<Candidate> = None;
        let mut feedback: Vec<ImprovementNote> = Vec::new();
        let mut backoff = self.policy.backoff();
        let mut last_error: Option<String> = None;

        for attempt in 1..=max_attempts {
            if self.cancel.is_cancelled() {
                info!("Cancelled before attempt {} for {}", attempt, label);
                machine.advance(RetryState::Failed);
                let reason = format!("cancelled before attempt {}", attempt);
                return self.finish(&plan, broker, machine, records, best, Some(reason));
            }

            machine.advance(RetryState::Generating);
            let request = GenerationRequest {
                plan: Arc::clone(&plan),
                context: broker.snapshot(),
                attempt,
                feedback: std::mem::take(&mut feedback),
            };

            let started = Instant::now();
            let generated = with_timeout(
                self.policy.timeout,
                self.capability.generate(request),
                &format!("generate {}", label),
            )
            .await;
            let latency_ms = started.elapsed().as_millis() as u64;

            let result = match generated {
                Ok(result) => {
                    self.metrics.record_generation(result.tokens_used, latency_ms);
                    result
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    if matches!(e, DocweaveError::Timeout { .. }) {
                        self.metrics.record_timeout(latency_ms);
                    } else {
                        self.metrics.record_failure(latency_ms);
                    }
                    let delay = if e.is_retryable() {
                        e.retry_hint().or_else(|| backoff.next())
                    } else {
                        None
                    };
                    let error = e.into_unavailable(&label).to_string();
                    warn!("Attempt {}/{} failed: {}", attempt, max_attempts, error);
                    records.push(AttemptRecord {
                        attempt,
                        aggregate: None,
                        passed: false,
                        low_confidence: false,
                        error: Some(error.clone()),
                    });
                    last_error = Some(error);

                    if attempt == max_attempts {
                        break;
                    }
                    machine.advance(RetryState::Retrying);
                    self.metrics.record_retry();
                    if let Some(delay) = delay
                        && !self.wait(delay).await
                    {
                        machine.advance(RetryState::Failed);
                        let reason = format!(
                            "cancelled while waiting to retry after: {}",
                            last_error.unwrap_or_default()
                        );
                        return self.finish(&plan, broker, machine, records, best, Some(reason));
                    }
                    continue;
                }
            };

            machine.advance(RetryState::Validating);
            let validated = self.validator.validate(&result, event);
            let report = self.aligner.align(&validated, result.self_score);
            self.metrics.record_validation();
            records.push(AttemptRecord {
                attempt,
                aggregate: Some(report.aggregate),
                passed: report.passed,
                low_confidence: report.low_confidence,
                error: None,
            });

            if report.acceptable() {
                machine.advance(RetryState::Accepted);
                info!(
                    "Accepted {} on attempt {} (score {:.2})",
                    label, attempt, report.aggregate
                );
                return self.settle(
                    &plan,
                    broker,
                    TargetOutcome {
                        perspective: plan.perspective(),
                        path: plan.path().to_string(),
                        strategy: Some(plan.strategy),
                        outcome: Outcome::Accepted,
                        content: Some(result.content),
                        report: Some(report),
                        attempts_used: records.len() as u32,
                        reason: None,
                        attempts: records,
                        transitions: machine.transitions,
                    },
                );
            }

            debug!(
                "Attempt {}/{} rejected: score {:.2}, low confidence {}, {} notes",
                attempt,
                max_attempts,
                report.aggregate,
                report.low_confidence,
                report.notes.len()
            );
            feedback = report.notes.clone();
            if best
                .as_ref()
                .is_none_or(|b| report.aggregate > b.report.aggregate)
            {
                best = Some(Candidate {
                    content: result.content,
                    report,
                });
            }

            if attempt < max_attempts {
                machine.advance(RetryState::Retrying);
                self.metrics.record_retry();
            }
        }

        machine.advance(RetryState::Failed);
        self.finish(&plan, broker, machine, records, best, last_error)
    }

    /// Wait out a backoff delay; false when cancelled first
    async fn wait(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Terminal record after a non-accepting run
    fn finish(
        &self,
        plan: &UpdatePlan,
        broker: &ContextBroker,
        machine: Machine,
        records: Vec<AttemptRecord>,
        best: Option<Candidate>,
        reason: Option<String>,
    ) -> Result<TargetOutcome> {
        let attempts_used = records.len() as u32;
        let outcome = match best {
            Some(candidate) => {
                let reason = reason.unwrap_or_else(|| {
                    format!(
                        "no attempt reached the threshold {:.2}; kept attempt {} (score {:.2})",
                        self.validator.threshold(),
                        candidate.report.attempt,
                        candidate.report.aggregate
                    )
                });
                warn!("{} ended partial: {}", plan.path(), reason);
                TargetOutcome {
                    perspective: plan.perspective(),
                    path: plan.path().to_string(),
                    strategy: Some(plan.strategy),
                    outcome: Outcome::Partial,
                    content: Some(candidate.content),
                    report: Some(candidate.report),
                    attempts_used,
                    reason: Some(reason),
                    attempts: records,
                    transitions: machine.transitions,
                }
            }
            None => {
                let reason = reason.unwrap_or_else(|| "no attempt produced content".to_string());
                warn!("{} failed: {}", plan.path(), reason);
                TargetOutcome {
                    perspective: plan.perspective(),
                    path: plan.path().to_string(),
                    strategy: Some(plan.strategy),
                    outcome: Outcome::Failed,
                    content: None,
                    report: None,
                    attempts_used,
                    reason: Some(reason),
                    attempts: records,
                    transitions: machine.transitions,
                }
            }
        };
        self.settle(plan, broker, outcome)
    }

    /// Publish the terminal state into the perspective's broker namespace
    fn settle(
        &self,
        plan: &UpdatePlan,
        broker: &ContextBroker,
        outcome: TargetOutcome,
    ) -> Result<TargetOutcome> {
        let owner = Owner::Perspective(plan.perspective());
        broker.put(
            owner,
            &ContextBroker::key(owner, "outcome"),
            serde_json::json!({
                "path": outcome.path,
                "outcome": outcome.outcome,
                "attempts_used": outcome.attempts_used,
            }),
        )?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::metrics::create_shared_metrics;
    use crate::config::{AlignmentConfig, QualityConfig};
    use crate::orchestration::testing::{ScriptedCapability, Step, fixtures};
    use crate::types::ErrorCategory;
    use proptest::prelude::*;

    fn controller(capability: Arc<ScriptedCapability>, max_attempts: u32) -> RetryController {
        controller_with(capability, max_attempts, CancellationToken::new())
    }

    fn controller_with(
        capability: Arc<ScriptedCapability>,
        max_attempts: u32,
        cancel: CancellationToken,
    ) -> RetryController {
        let quality = QualityConfig::default();
        RetryController::new(
            capability,
            Arc::new(QualityValidator::new(quality.clone())),
            Arc::new(QualityAligner::new(AlignmentConfig::default(), quality.pass_threshold)),
            RetryPolicy {
                max_attempts,
                timeout: Duration::from_secs(5),
                ..RetryPolicy::default()
            },
            create_shared_metrics("test"),
            cancel,
        )
    }

    async fn run(controller: &RetryController) -> TargetOutcome {
        let (plan, event) = fixtures::create_readme();
        controller
            .run(Arc::new(plan), &event, &ContextBroker::new())
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepts_first_good_attempt() {
        let capability = ScriptedCapability::new(vec![Step::content(fixtures::GOOD_README)]);
        let outcome = run(&controller(capability.clone(), 3)).await;

        assert_eq!(outcome.outcome, Outcome::Accepted);
        assert_eq!(outcome.attempts_used, 1);
        assert_eq!(
            outcome.transitions,
            vec![
                RetryState::Pending,
                RetryState::Generating,
                RetryState::Validating,
                RetryState::Accepted,
            ]
        );
        assert_eq!(capability.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feedback_carried_to_next_attempt() {
        let capability = ScriptedCapability::new(vec![
            Step::content(fixtures::WEAK_README),
            Step::content(fixtures::GOOD_README),
        ]);
        let outcome = run(&controller(capability.clone(), 3)).await;

        assert_eq!(outcome.outcome, Outcome::Accepted);
        assert_eq!(outcome.attempts_used, 2);
        let requests = capability.requests();
        assert_eq!(requests[0].attempt, 1);
        assert!(requests[0].feedback.is_empty());
        assert_eq!(requests[1].attempt, 2);
        assert!(!requests[1].feedback.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_keeps_best_attempt() {
        let capability = ScriptedCapability::new(vec![
            Step::content(fixtures::BARE_README),
            Step::content(fixtures::WEAK_README),
            Step::content(fixtures::BARE_README),
        ]);
        let outcome = run(&controller(capability, 3)).await;

        assert_eq!(outcome.outcome, Outcome::Partial);
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(outcome.content.as_deref(), Some(fixtures::WEAK_README));
        assert_eq!(outcome.report.as_ref().unwrap().attempt, 2);
        assert_eq!(outcome.transitions.last(), Some(&RetryState::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_scores_keep_earliest() {
        let capability = ScriptedCapability::new(vec![
            Step::content(fixtures::WEAK_README),
            Step::content(fixtures::WEAK_README),
        ]);
        let outcome = run(&controller(capability, 2)).await;
        assert_eq!(outcome.report.unwrap().attempt, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_every_time_fails_without_content() {
        let capability = ScriptedCapability::new(vec![
            Step::Unavailable("503".into()),
            Step::Unavailable("503".into()),
            Step::Unavailable("503".into()),
        ]);
        let outcome = run(&controller(capability, 3)).await;

        assert_eq!(outcome.outcome, Outcome::Failed);
        assert_eq!(outcome.attempts_used, 3);
        assert!(outcome.content.is_none());
        assert!(outcome.reason.unwrap().contains("Generation unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_consume_attempts() {
        let capability = ScriptedCapability::new(vec![
            Step::Timeout,
            Step::Timeout,
            Step::content(fixtures::GOOD_README),
        ]);
        let outcome = run(&controller(capability, 3)).await;

        assert_eq!(outcome.outcome, Outcome::Accepted);
        assert_eq!(outcome.attempts_used, 3);
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("Timeout"));
        assert!(outcome.attempts[1].error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_spend_attempts_without_backoff() {
        let capability = ScriptedCapability::new(vec![
            Step::Rejected(ErrorCategory::Auth),
            Step::Rejected(ErrorCategory::BadRequest),
            Step::content(fixtures::GOOD_README),
        ]);
        let controller = controller(capability.clone(), 3);
        let started = tokio::time::Instant::now();
        let outcome = run(&controller).await;

        assert_eq!(outcome.outcome, Outcome::Accepted);
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(capability.calls(), 3);
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("AUTH"));
        assert!(started.elapsed() < controller.policy().base_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_wait_before_retrying() {
        let capability = ScriptedCapability::new(vec![
            Step::Rejected(ErrorCategory::RateLimit),
            Step::content(fixtures::GOOD_README),
        ]);
        let controller = controller(capability, 3);
        let started = tokio::time::Instant::now();
        let outcome = run(&controller).await;

        assert_eq!(outcome.outcome, Outcome::Accepted);
        assert_eq!(outcome.attempts_used, 2);
        assert!(started.elapsed() >= controller.policy().base_delay / 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let capability = ScriptedCapability::new(vec![Step::content(fixtures::GOOD_README)]);
        let outcome = run(&controller_with(capability.clone(), 3, cancel)).await;

        assert_eq!(outcome.outcome, Outcome::Failed);
        assert_eq!(outcome.attempts_used, 0);
        assert_eq!(capability.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_retrying() {
        let cancel = CancellationToken::new();
        let capability = ScriptedCapability::new(vec![
            Step::Unavailable("down".into()),
            Step::content(fixtures::GOOD_README),
        ]);
        let controller = controller_with(capability.clone(), 3, cancel.clone());
        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let outcome = run(&controller).await;
        trigger.await.unwrap();

        assert_eq!(outcome.outcome, Outcome::Failed);
        assert_eq!(capability.calls(), 1);
        assert!(outcome.reason.unwrap().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_outcome_published_to_broker() {
        let capability = ScriptedCapability::new(vec![Step::content(fixtures::GOOD_README)]);
        let controller = controller(capability, 3);
        let (plan, event) = fixtures::create_readme();
        let broker = ContextBroker::new();
        controller.run(Arc::new(plan), &event, &broker).await.unwrap();

        let published = broker.get("engagement/outcome").unwrap();
        assert_eq!(published["outcome"], "accepted");
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::content(fixtures::GOOD_README)),
            Just(Step::content(fixtures::WEAK_README)),
            Just(Step::content(fixtures::BARE_README)),
            Just(Step::Unavailable("flaky".into())),
            Just(Step::Rejected(ErrorCategory::Auth)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_attempts_bounded(
            steps in prop::collection::vec(arb_step(), 0..6),
            max_attempts in 1u32..5,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
                .unwrap();
            let outcome = runtime.block_on(async {
                run(&controller(ScriptedCapability::new(steps), max_attempts)).await
            });

            prop_assert!(outcome.attempts_used <= max_attempts);
            match outcome.outcome {
                Outcome::Accepted => {
                    let report = outcome.report.as_ref().unwrap();
                    prop_assert!(report.aggregate >= QualityConfig::default().pass_threshold);
                }
                Outcome::Partial | Outcome::Failed => {
                    prop_assert_eq!(outcome.attempts_used, max_attempts);
                    prop_assert!(outcome.attempts.iter().all(|a| !(a.passed && !a.low_confidence)));
                }
            }
        }
    }
}
