//! Global Constants
//!
//! Centralized defaults for orchestration tuning.
//! Every configurable default lives here so config types and tests agree.

/// Retry controller constants
pub mod retry {
    /// Total attempts per target, including the first
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Base delay before re-dispatching after an unavailable capability (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Upper bound for a single backoff delay (milliseconds)
    pub const MAX_DELAY_MS: u64 = 8_000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Quality validator constants
pub mod quality {
    /// Aggregate score required to accept a result
    pub const DEFAULT_PASS_THRESHOLD: f64 = 0.70;

    /// Axis weights (sum to 1.0)
    pub const STRUCTURAL_WEIGHT: f64 = 0.30;
    pub const COMPLETENESS_WEIGHT: f64 = 0.40;
    pub const CONSISTENCY_WEIGHT: f64 = 0.30;

    /// Any single axis below this fails the report, whatever the aggregate
    pub const AXIS_FLOOR: f64 = 0.50;

    /// Minimum body words for a regenerated section to count as filled
    pub const MIN_SECTION_WORDS: usize = 20;

    /// Token-set similarity a merged document must keep with each preserved section
    pub const MERGE_RETENTION: f64 = 0.80;

    /// Placeholder markers that make a section count as unfinished
    pub const PLACEHOLDER_MARKERS: &[&str] = &["TODO", "TBD", "lorem ipsum", "[insert", "FIXME"];
}

/// Quality aligner constants
pub mod alignment {
    pub const VALIDATOR_WEIGHT: f64 = 0.70;
    pub const CAPABILITY_WEIGHT: f64 = 0.30;

    /// Absolute score gap that flags a report as low confidence
    pub const DIVERGENCE_THRESHOLD: f64 = 0.25;
}

/// Generation coordinator constants
pub mod generation {
    /// Independent targets generated at the same time
    pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

    /// Wall-clock limit per generation call (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Diff text kept on a change event for prompt context (bytes)
    pub const MAX_DIFF_EXCERPT: usize = 4_000;
}

/// Perspective selector constants
pub mod selection {
    /// Source deletions or renames that count as an architecture shift on their own
    pub const STRUCTURAL_REMOVAL_THRESHOLD: usize = 3;
}

/// Default document locations per perspective
pub mod targets {
    pub const ENGAGEMENT: &str = "README.md";
    pub const CURRENT_STATE: &str = "docs/current-state.md";
    pub const DECISION_HISTORY: &str = "docs/decisions.md";
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
