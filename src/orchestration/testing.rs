//! Test doubles shared by the orchestration tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::ports::GenerationCapability;
use crate::types::{
    DocweaveError, ErrorCategory, GenerationRequest, GenerationResult, LlmError, Result,
};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Step {
    Content { content: String, score: Option<f64> },
    /// Never answers within any realistic timeout
    Timeout,
    Unavailable(String),
    /// Provider error of the given category
    Rejected(ErrorCategory),
}

impl Step {
    pub fn content(content: &str) -> Self {
        Self::Content {
            content: content.to_string(),
            score: None,
        }
    }

    pub fn scored(content: &str, score: f64) -> Self {
        Self::Content {
            content: content.to_string(),
            score: Some(score),
        }
    }
}

/// Replays scripted steps; per-target scripts win over the shared one.
/// An exhausted script answers `GenerationUnavailable`.
#[derive(Default)]
pub struct ScriptedCapability {
    shared: Mutex<VecDeque<Step>>,
    by_target: Mutex<HashMap<String, VecDeque<Step>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedCapability {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            shared: Mutex::new(steps.into()),
            ..Default::default()
        })
    }

    pub fn per_target(scripts: Vec<(&str, Vec<Step>)>) -> Arc<Self> {
        Arc::new(Self {
            by_target: Mutex::new(
                scripts
                    .into_iter()
                    .map(|(path, steps)| (path.to_string(), steps.into()))
                    .collect(),
            ),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, path: &str) -> Vec<GenerationRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.plan.path() == path)
            .collect()
    }

    fn next_step(&self, path: &str) -> Option<Step> {
        if let Some(steps) = self.by_target.lock().unwrap().get_mut(path) {
            return steps.pop_front();
        }
        self.shared.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl GenerationCapability for ScriptedCapability {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        self.requests.lock().unwrap().push(request.clone());
        let label = request.target_label();

        match self.next_step(request.plan.path()) {
            Some(Step::Content { content, score }) => {
                let result = GenerationResult::new(request, content);
                Ok(match score {
                    Some(s) => result.with_score(s),
                    None => result,
                })
            }
            Some(Step::Timeout) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(DocweaveError::unavailable(label, "slept through the timeout"))
            }
            Some(Step::Unavailable(reason)) => Err(DocweaveError::unavailable(label, reason)),
            Some(Step::Rejected(category)) => {
                Err(LlmError::with_provider(category, "scripted rejection", "scripted").into())
            }
            None => Err(DocweaveError::unavailable(label, "script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub mod fixtures {
    use crate::orchestration::classifier::ChangeClassifier;
    use crate::orchestration::planner::plan_for_target;
    use crate::types::{
        ChangeEvent, ChangeMetadata, ChangedFile, DocumentTarget, Perspective, RawChange,
        UpdatePlan,
    };

    /// Fills every engagement template section and names the changed cli module
    pub const GOOD_README: &str = "# Overview\n\nAcme is a command line tool for managing invoices. The new export command in the cli writes every invoice for a period to a single CSV file.\n\n## Getting Started\n\nInstall the binary with cargo install acme, then run acme init inside a project directory to create the configuration file and the local invoice store.\n\n## Usage\n\nRun acme export --from 2024-01 --to 2024-03 to write all invoices in that range to invoices.csv. Use the output flag to choose another file path instead.\n";

    /// Right headings, thin bodies, no mention of the change
    pub const WEAK_README: &str =
        "# Overview\n\nA tool.\n\n## Getting Started\n\nInstall it.\n\n## Usage\n\nRun it.\n";

    /// No headings at all
    pub const BARE_README: &str = "Acme manages invoices.\n";

    pub fn raw(files: Vec<ChangedFile>, message: &str) -> RawChange {
        RawChange {
            repository_id: "acme/app".into(),
            revision_id: "4f2c9e1a7b".into(),
            files,
            diff: None,
            metadata: ChangeMetadata {
                commit_message: Some(message.into()),
                ..Default::default()
            },
        }
    }

    pub fn event(files: Vec<ChangedFile>, message: &str) -> ChangeEvent {
        ChangeClassifier::default()
            .classify(&raw(files, message))
            .unwrap()
    }

    /// A `create` plan for a missing README after a cli change
    pub fn create_readme() -> (UpdatePlan, ChangeEvent) {
        let event = event(
            vec![ChangedFile::modified("src/cli/export.rs")],
            "feat(cli): add export command",
        );
        let plan = plan_for_target(
            DocumentTarget::missing(Perspective::Engagement, "README.md"),
            &event,
        );
        (plan, event)
    }
}
