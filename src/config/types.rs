//! Configuration Types
//!
//! All configuration structures with defaults taken from [`crate::constants`].

use serde::{Deserialize, Serialize};

use crate::constants::{alignment, generation, network, quality, retry, targets};
use crate::types::{DocweaveError, Perspective, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub llm: LlmConfig,
    pub orchestration: OrchestrationConfig,
    pub quality: QualityConfig,
    pub alignment: AlignmentConfig,
    pub targets: TargetsConfig,
    pub selection: SelectionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            orchestration: OrchestrationConfig::default(),
            quality: QualityConfig::default(),
            alignment: AlignmentConfig::default(),
            targets: TargetsConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| -> Result<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(DocweaveError::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, v
                )))
            }
        };

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DocweaveError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(DocweaveError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.orchestration.max_attempts == 0 {
            return Err(DocweaveError::Config(
                "orchestration.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.orchestration.max_concurrency == 0 {
            return Err(DocweaveError::Config(
                "orchestration.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.orchestration.generation_timeout_secs == 0 {
            return Err(DocweaveError::Config(
                "orchestration.generation_timeout_secs must be greater than 0".to_string(),
            ));
        }

        unit("quality.pass_threshold", self.quality.pass_threshold)?;
        unit("quality.merge_retention", self.quality.merge_retention)?;
        unit("alignment.divergence_threshold", self.alignment.divergence_threshold)?;

        let w = &self.quality.weights;
        for (name, v) in [
            ("quality.weights.structural", w.structural),
            ("quality.weights.completeness", w.completeness),
            ("quality.weights.consistency", w.consistency),
        ] {
            if v < 0.0 {
                return Err(DocweaveError::Config(format!("{} must not be negative", name)));
            }
        }
        if w.total() <= 0.0 {
            return Err(DocweaveError::Config(
                "quality.weights must have a positive sum".to_string(),
            ));
        }

        let a = &self.alignment;
        if a.validator_weight < 0.0 || a.capability_weight < 0.0 {
            return Err(DocweaveError::Config(
                "alignment weights must not be negative".to_string(),
            ));
        }
        if a.validator_weight <= a.capability_weight {
            return Err(DocweaveError::Config(format!(
                "alignment.validator_weight ({}) must be greater than alignment.capability_weight ({})",
                a.validator_weight, a.capability_weight
            )));
        }

        Ok(())
    }

    /// Apply a quality mode preset to threshold and attempt budget
    pub fn apply_mode(&mut self, mode: QualityMode) {
        let (threshold, attempts) = mode.preset();
        self.orchestration.mode = mode;
        self.quality.pass_threshold = threshold;
        self.orchestration.max_attempts = attempts;
    }
}

// =============================================================================
// Quality Mode
// =============================================================================

/// Preset trading generation cost against the quality bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    /// Lower bar, fewer attempts; for previews and CI
    Fast,
    #[default]
    Standard,
    /// Higher bar, one extra attempt; for releases
    Deep,
}

impl QualityMode {
    /// (pass threshold, max attempts)
    pub fn preset(&self) -> (f64, u32) {
        match self {
            QualityMode::Fast => (0.60, 2),
            QualityMode::Standard => (quality::DEFAULT_PASS_THRESHOLD, retry::DEFAULT_MAX_ATTEMPTS),
            QualityMode::Deep => (0.80, 4),
        }
    }
}

impl std::fmt::Display for QualityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityMode::Fast => write!(f, "fast"),
            QualityMode::Standard => write!(f, "standard"),
            QualityMode::Deep => write!(f, "deep"),
        }
    }
}

impl std::str::FromStr for QualityMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(QualityMode::Fast),
            "standard" => Ok(QualityMode::Standard),
            "deep" => Ok(QualityMode::Deep),
            _ => Err(format!(
                "Unknown quality mode: {}. Valid values: fast, standard, deep",
                s
            )),
        }
    }
}

// =============================================================================
// Orchestration Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub mode: QualityMode,
    /// Total attempts per target, including the first
    pub max_attempts: u32,
    /// Independent targets generated concurrently
    pub max_concurrency: usize,
    /// Wall-clock limit per generation call
    pub generation_timeout_secs: u64,
    /// First backoff delay after an unavailable capability; 0 disables waiting
    pub retry_backoff_ms: u64,
    pub retry_backoff_max_ms: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            mode: QualityMode::Standard,
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            max_concurrency: generation::DEFAULT_MAX_CONCURRENCY,
            generation_timeout_secs: generation::DEFAULT_TIMEOUT_SECS,
            retry_backoff_ms: retry::BASE_DELAY_MS,
            retry_backoff_max_ms: retry::MAX_DELAY_MS,
        }
    }
}

// =============================================================================
// Quality Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisWeights {
    pub structural: f64,
    pub completeness: f64,
    pub consistency: f64,
}

impl AxisWeights {
    pub fn total(&self) -> f64 {
        self.structural + self.completeness + self.consistency
    }
}

impl Default for AxisWeights {
    fn default() -> Self {
        Self {
            structural: quality::STRUCTURAL_WEIGHT,
            completeness: quality::COMPLETENESS_WEIGHT,
            consistency: quality::CONSISTENCY_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub pass_threshold: f64,
    pub weights: AxisWeights,
    pub min_section_words: usize,
    /// Similarity a merge must keep with each preserved section
    pub merge_retention: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            pass_threshold: quality::DEFAULT_PASS_THRESHOLD,
            weights: AxisWeights::default(),
            min_section_words: quality::MIN_SECTION_WORDS,
            merge_retention: quality::MERGE_RETENTION,
        }
    }
}

// =============================================================================
// Alignment Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub validator_weight: f64,
    pub capability_weight: f64,
    pub divergence_threshold: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            validator_weight: alignment::VALIDATOR_WEIGHT,
            capability_weight: alignment::CAPABILITY_WEIGHT,
            divergence_threshold: alignment::DIVERGENCE_THRESHOLD,
        }
    }
}

// =============================================================================
// Targets & Selection
// =============================================================================

/// Default document path per perspective
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    pub engagement: String,
    pub current_state: String,
    pub decision_history: String,
}

impl TargetsConfig {
    pub fn path_for(&self, perspective: Perspective) -> &str {
        match perspective {
            Perspective::Engagement => &self.engagement,
            Perspective::CurrentState => &self.current_state,
            Perspective::DecisionHistory => &self.decision_history,
        }
    }
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            engagement: targets::ENGAGEMENT.to_string(),
            current_state: targets::CURRENT_STATE.to_string(),
            decision_history: targets::DECISION_HISTORY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Extra phrases that mark a change as a notable decision
    pub decision_keywords: Vec<String>,
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai` or `ollama`
    pub provider: String,
    pub model: String,
    /// Overrides the provider's default endpoint
    pub api_base: Option<String>,
    pub timeout_secs: u64,
    /// Default: 0.2 for stable prose
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
