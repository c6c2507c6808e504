//! AI Integration Layer
//!
//! LLM access for the generation capability: providers, prompt assembly,
//! reply parsing, timeouts, and run metrics.

pub mod generator;
pub mod json;
pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod timeout;

pub use generator::LlmGenerator;
pub use metrics::{MetricsCollector, MetricsSummary, SharedMetrics, create_shared_metrics};
pub use prompt::{PromptBuilder, PromptSection};
pub use provider::{
    LlmProvider, LlmResponse, OpenAiProvider, ProviderConfig, SharedProvider, TokenUsage,
    create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout};
