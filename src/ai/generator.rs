//! LLM-backed generation capability
//!
//! Turns a [`GenerationRequest`] into a prompt, calls the configured
//! provider, and reads back `{ "content": string, "confidence": number }`.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::prompt::PromptBuilder;
use super::provider::SharedProvider;
use crate::orchestration::ports::GenerationCapability;
use crate::types::{
    ErrorCategory, GenerationRequest, GenerationResult, LlmError, Perspective, Result,
    UpdateStrategy,
};

pub struct LlmGenerator {
    provider: SharedProvider,
}

impl LlmGenerator {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The complete Markdown document"
                },
                "confidence": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 1,
                    "description": "Your confidence that the document is accurate and complete"
                }
            },
            "required": ["content", "confidence"]
        })
    }
}

fn perspective_brief(perspective: Perspective) -> (&'static str, &'static str) {
    match perspective {
        Perspective::Engagement => (
            "developer-experience writer",
            "onboarding and usage documentation: how people install, run, and interact with the system",
        ),
        Perspective::CurrentState => (
            "software architect",
            "current-state documentation: what the system is, its components, and their interfaces",
        ),
        Perspective::DecisionHistory => (
            "engineering historian",
            "decision records: context, the decision taken, alternatives rejected, and consequences",
        ),
    }
}

/// Render the prompt for one attempt
pub fn build_prompt(request: &GenerationRequest) -> String {
    let plan = &request.plan;
    let (expertise, task) = perspective_brief(plan.perspective());

    let regenerate: Vec<String> = plan.regenerate.iter().map(|s| s.heading.clone()).collect();
    let preserve: Vec<String> = plan.preserve.iter().map(|s| s.heading.clone()).collect();

    let mut objectives = vec![match plan.strategy {
        UpdateStrategy::Create => format!(
            "Write a new document with these sections: {}",
            regenerate.join(", ")
        ),
        UpdateStrategy::Update => format!(
            "Rewrite only these sections to reflect the change: {}",
            regenerate.join(", ")
        ),
        UpdateStrategy::Merge => format!(
            "Integrate the change into the existing document, regenerating: {}",
            regenerate.join(", ")
        ),
    }];
    if !preserve.is_empty() {
        objectives.push(format!(
            "Keep these sections exactly as they are, headings included: {}",
            preserve.join(", ")
        ));
    }
    objectives.push("Return the complete document, not a fragment".to_string());

    let mut builder = PromptBuilder::new()
        .role(expertise, task)
        .objectives(&objectives)
        .context_item("Target", plan.path())
        .context_item("Perspective", plan.perspective().as_str())
        .context_item("Strategy", &plan.strategy.to_string())
        .context_item("Attempt", &request.attempt.to_string())
        .context_item("Changed paths", &plan.scope.join(", "));

    let scoped = request.context.scoped(plan.perspective());
    if !scoped.is_empty() {
        let facts = serde_json::to_string_pretty(&scoped).unwrap_or_default();
        builder = builder
            .section("Run Context", "Facts shared across this run:")
            .code("json", &facts);
    }

    if let Some(existing) = plan.existing_content() {
        builder = builder
            .section("Existing Document", "The full current content of the target:")
            .code("markdown", existing);
    }

    let preserved = plan.preserved_sections();
    if !preserved.is_empty() {
        let rendered: Vec<String> = preserved.iter().map(|s| s.to_markdown()).collect();
        builder = builder
            .section("Preserved Sections", "Copy these verbatim into your output:")
            .code("markdown", &rendered.join("\n"));
    }

    if !request.feedback.is_empty() {
        let notes: Vec<String> = request.feedback.iter().map(|n| format!("- {}", n)).collect();
        builder = builder.section(
            "Feedback From Previous Attempt",
            &format!("The previous attempt was rejected. Fix these issues:\n{}", notes.join("\n")),
        );
    }

    builder
        .focus(
            "the listed sections and changed paths",
            &[
                "Do not invent features absent from the change or existing document",
                "Do not leave placeholders such as TODO or TBD",
                "Use ATX headings (#, ##) without skipping levels",
            ],
        )
        .build()
}

#[async_trait]
impl GenerationCapability for LlmGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        let prompt = build_prompt(&request);
        debug!(
            "Prompt for {} attempt {}: {} chars",
            request.target_label(),
            request.attempt,
            prompt.len()
        );

        let response = self.provider.generate(&prompt, &Self::schema()).await?;

        let content = response
            .content
            .get("content")
            .and_then(Value::as_str)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                LlmError::with_provider(
                    ErrorCategory::ParseError,
                    "reply has no 'content' field",
                    self.provider.name(),
                )
            })?
            .to_string();
        let confidence = response.content.get("confidence").and_then(Value::as_f64);

        Ok(GenerationResult {
            request,
            content,
            self_score: confidence,
            tokens_used: Some(response.usage.total() as u64),
        })
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{LlmProvider, LlmResponse};
    use crate::types::{
        ContextSnapshot, DocumentTarget, ImprovementNote, QualityAxis, SectionRef, UpdatePlan,
    };
    use std::sync::Arc;

    struct FixedProvider(Value);

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            Ok(LlmResponse::content_only(self.0.clone()))
        }
        fn name(&self) -> &str {
            "fixed"
        }
        fn model(&self) -> &str {
            "fixed-model"
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn request(strategy: UpdateStrategy) -> GenerationRequest {
        let target = DocumentTarget::existing(
            Perspective::CurrentState,
            "docs/current-state.md",
            "# Overview\nAll about it.\n## Cache\nCache notes.\n".into(),
        );
        GenerationRequest {
            plan: Arc::new(UpdatePlan {
                target,
                strategy,
                preserve: vec![SectionRef::new("Overview", 1)],
                regenerate: vec![SectionRef::new("Cache", 2)],
                scope: vec!["src/cache.rs".into()],
                rationale: "test".into(),
            }),
            context: ContextSnapshot::default(),
            attempt: 2,
            feedback: vec![ImprovementNote::new(
                QualityAxis::Completeness,
                "Cache",
                "mention eviction",
            )],
        }
    }

    #[test]
    fn test_prompt_carries_plan_material() {
        let prompt = build_prompt(&request(UpdateStrategy::Update));
        assert!(prompt.contains("Rewrite only these sections to reflect the change: Cache"));
        assert!(
            prompt.contains("Keep these sections exactly as they are, headings included: Overview")
        );
        assert!(prompt.contains("# Existing Document"));
        assert!(prompt.contains("# Preserved Sections"));
        assert!(prompt.contains("[completeness] Cache: mention eviction"));
        assert!(prompt.contains("**Changed paths**: src/cache.rs"));
    }

    #[tokio::test]
    async fn test_generate_reads_content_and_confidence() {
        let provider: SharedProvider = Arc::new(FixedProvider(
            json!({"content": "# Doc\nBody", "confidence": 0.8}),
        ));
        let generator = LlmGenerator::new(provider);
        let result = generator.generate(request(UpdateStrategy::Merge)).await.unwrap();
        assert_eq!(result.content, "# Doc\nBody");
        assert_eq!(result.self_score, Some(0.8));
        assert_eq!(result.request.attempt, 2);
    }

    #[tokio::test]
    async fn test_missing_content_is_retryable_error() {
        let provider: SharedProvider = Arc::new(FixedProvider(json!({"confidence": 0.8})));
        let generator = LlmGenerator::new(provider);
        let err = generator.generate(request(UpdateStrategy::Create)).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
