//! Collaborator contracts consumed by the engine.
//!
//! Implementations live outside the orchestration core: `ai::LlmGenerator`
//! for generation, `document` for targets, `repository` for snapshots.

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::{
    DocumentTarget, GenerationRequest, GenerationResult, Perspective, RepositorySnapshot, Result,
};

/// External content-generation service
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    /// One attempt. Failures are surfaced to the retry controller as
    /// `GenerationUnavailable`.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait RepositoryFacts: Send + Sync {
    async fn get_snapshot(&self, repository_id: &str, revision_id: &str)
    -> Result<RepositorySnapshot>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Resolve a target. A missing document is `exists: false`, not an error.
    async fn get_target(&self, perspective: Perspective, path: &str) -> Result<DocumentTarget>;

    async fn exists(&self, path: &str) -> Result<bool>;
}

pub type SharedCapability = Arc<dyn GenerationCapability>;
pub type SharedFacts = Arc<dyn RepositoryFacts>;
pub type SharedStore = Arc<dyn DocumentStore>;
