//! docweave - Change-Driven Documentation Orchestration
//!
//! Turns one repository change into targeted documentation updates: the
//! change is classified, the affected documentation perspectives are
//! selected, each affected document gets an explicit update plan, and
//! generation runs under a bounded, quality-gated retry loop.
//!
//! ## Core Features
//!
//! - **Explicit selection**: three fixed perspectives (engagement,
//!   current-state, decision-history) with inspectable decisions
//! - **Plans, not rewrites**: `create`, `update`, or `merge` with named
//!   sections to preserve and regenerate
//! - **Quality gate**: structural, completeness, and consistency scores,
//!   aligned with the generator's self-reported confidence
//! - **Partial success**: the best attempt is delivered when none passes
//!
//! ## Quick Start
//!
//! ```ignore
//! use docweave::{Config, Orchestrator, RawChange};
//! use docweave::document::FsDocumentStore;
//! use docweave::repository::FsRepositoryFacts;
//!
//! let orchestrator = Orchestrator::new(
//!     Config::default(),
//!     capability,
//!     Arc::new(FsRepositoryFacts::new(".")),
//!     Arc::new(FsDocumentStore::new(".")),
//! );
//! let result = orchestrator.start(&RawChange::from_file(path)?).await?;
//! ```
//!
//! ## Modules
//!
//! - [`orchestration`]: the engine and its collaborator ports
//! - [`document`]: Markdown model and document stores
//! - [`repository`]: repository snapshot providers
//! - [`ai`]: LLM-backed generation capability
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod document;
pub mod orchestration;
pub mod repository;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader, QualityMode};

pub use types::error::{DocweaveError, ErrorCategory, Result};

pub use types::{
    ChangeEvent, OrchestrationResult, Outcome, Perspective, RawChange, RepositorySnapshot,
    TargetOutcome, UpdatePlan, UpdateStrategy,
};

// =============================================================================
// Engine Re-exports
// =============================================================================

pub use orchestration::{
    DocumentStore, GenerationCapability, Orchestrator, PlanReport, RepositoryFacts,
};

pub use ai::{LlmGenerator, LlmProvider, create_provider};
