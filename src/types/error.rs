//! Unified Error Type System
//!
//! One error type for the whole engine, plus a structured LLM error used by
//! the generation adapter.
//!
//! ## Propagation
//!
//! - **Fatal** (`is_fatal`): invalid change input, context ownership
//!   conflicts, and plan invariant breaches abort the whole run
//! - Any other capability error spends one attempt of the target's budget
//! - **Transient** (`is_retryable`): unavailable capability, timeouts, and
//!   retryable LLM categories wait out a backoff before the next attempt
//! - Errors outside generation are recorded against the affected target only

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// LLM failure categories used to classify provider errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited by the provider
    RateLimit,
    /// Prompt exceeded the model context
    TokenLimit,
    /// Authentication failed
    Auth,
    /// Connectivity issues
    Network,
    /// Provider or model unavailable
    Unavailable,
    /// Request rejected as malformed
    BadRequest,
    /// Provider answered but the payload could not be parsed
    ParseError,
    /// Temporary server-side failure
    Transient,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::RateLimit => "RATE_LIMIT",
            Self::TokenLimit => "TOKEN_LIMIT",
            Self::Auth => "AUTH",
            Self::Network => "NETWORK",
            Self::Unavailable => "UNAVAILABLE",
            Self::BadRequest => "BAD_REQUEST",
            Self::ParseError => "PARSE_ERROR",
            Self::Transient => "TRANSIENT",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

impl ErrorCategory {
    /// Whether another attempt against the same provider can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit
                | Self::Network
                | Self::Transient
                | Self::ParseError
                | Self::Unavailable
        )
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Structured LLM error with category and retry hint
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
    /// Provider-suggested wait before retrying
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "[{}:{}] {}", provider, self.category, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self::new(category, message).provider(provider)
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps provider failures onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a free-form provider error message
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        let category = if has(&["rate limit", "429", "too many requests", "quota exceeded"]) {
            ErrorCategory::RateLimit
        } else if has(&["context length", "context too long", "too large"])
            || (lower.contains("token") && has(&["limit", "exceed", "maximum"]))
        {
            ErrorCategory::TokenLimit
        } else if has(&["unauthorized", "401", "403", "api key", "permission denied"]) {
            ErrorCategory::Auth
        } else if has(&["connection", "dns", "timed out", "timeout", "unreachable", "network"]) {
            ErrorCategory::Network
        } else if has(&["503", "502", "service unavailable", "model not found", "not installed"])
        {
            ErrorCategory::Unavailable
        } else if has(&["400", "bad request", "malformed"]) {
            ErrorCategory::BadRequest
        } else if has(&["parse", "json", "unexpected token"]) {
            ErrorCategory::ParseError
        } else if has(&["overloaded", "temporary", "500", "internal error"]) {
            ErrorCategory::Transient
        } else {
            ErrorCategory::Unknown
        };

        let err = LlmError::with_provider(category, message, provider);
        match category {
            ErrorCategory::RateLimit => err.retry_after(Duration::from_secs(30)),
            ErrorCategory::Network => err.retry_after(Duration::from_secs(5)),
            _ => err,
        }
    }

    /// Classify an HTTP status code directly
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            500..=599 => LlmError::with_provider(ErrorCategory::Transient, message, provider),
            _ => Self::classify(message, provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DocweaveError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Run-level Errors (abort the orchestration)
    // -------------------------------------------------------------------------
    #[error("Invalid change: {0}")]
    InvalidChange(String),

    #[error("Context conflict on '{key}': owned by {owner}, written by {writer}")]
    ContextConflict {
        key: String,
        owner: String,
        writer: String,
    },

    #[error("Plan invariant violated for {target}: {message}")]
    PlanInvariant { target: String, message: String },

    // -------------------------------------------------------------------------
    // Target-level Errors
    // -------------------------------------------------------------------------
    #[error("Generation unavailable for {target}: {reason}")]
    GenerationUnavailable { target: String, reason: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Document store error for {path}: {message}")]
    DocumentStore { path: String, message: String },

    // -------------------------------------------------------------------------
    // Collaborator and Setup Errors
    // -------------------------------------------------------------------------
    #[error("Context key not found: {0}")]
    ContextNotFound(String),

    #[error("Repository facts unavailable: {0}")]
    RepositoryFacts(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<LlmError> for DocweaveError {
    fn from(err: LlmError) -> Self {
        DocweaveError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, DocweaveError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl DocweaveError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn unavailable(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GenerationUnavailable {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_change(message: impl Into<String>) -> Self {
        Self::InvalidChange(message.into())
    }

    pub fn document_store(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DocumentStore {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Errors that abort the entire orchestration run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidChange(_) | Self::ContextConflict { .. } | Self::PlanInvariant { .. }
        )
    }

    /// Transient errors, worth a backoff before the next attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GenerationUnavailable { .. } | Self::Timeout { .. } => true,
            Self::Llm(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Re-express any capability failure as `GenerationUnavailable` for one target
    pub fn into_unavailable(self, target: &str) -> Self {
        match self {
            Self::GenerationUnavailable { .. } => self,
            other if other.is_fatal() => other,
            other => Self::unavailable(target, other.to_string()),
        }
    }

    /// Provider-suggested retry delay, when known
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::Llm(e) => e.retry_after,
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(DocweaveError::invalid_change("no paths").is_fatal());
        assert!(
            DocweaveError::ContextConflict {
                key: "k".into(),
                owner: "engagement".into(),
                writer: "current-state".into(),
            }
            .is_fatal()
        );
        assert!(!DocweaveError::unavailable("README.md", "down").is_fatal());
        assert!(!DocweaveError::timeout("generate", Duration::from_secs(1)).is_fatal());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(DocweaveError::unavailable("README.md", "down").is_retryable());
        assert!(DocweaveError::timeout("generate", Duration::from_secs(1)).is_retryable());
        assert!(!DocweaveError::Config("bad".into()).is_retryable());
        let auth = LlmError::new(ErrorCategory::Auth, "invalid key");
        assert!(!DocweaveError::from(auth).is_retryable());
    }

    #[test]
    fn test_into_unavailable_keeps_fatal() {
        let timeout = DocweaveError::timeout("generate", Duration::from_secs(2));
        assert!(matches!(
            timeout.into_unavailable("docs/a.md"),
            DocweaveError::GenerationUnavailable { ref target, .. } if target == "docs/a.md"
        ));

        let fatal = DocweaveError::invalid_change("x");
        assert!(matches!(
            fatal.into_unavailable("docs/a.md"),
            DocweaveError::InvalidChange(_)
        ));
    }

    #[test]
    fn test_classify_messages() {
        assert_eq!(
            ErrorClassifier::classify("Rate limit exceeded", "openai").category,
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorClassifier::classify("maximum context length is 8192 tokens", "openai").category,
            ErrorCategory::TokenLimit
        );
        assert_eq!(
            ErrorClassifier::classify("Invalid API key provided", "openai").category,
            ErrorCategory::Auth
        );
        assert_eq!(
            ErrorClassifier::classify("Connection refused", "ollama").category,
            ErrorCategory::Network
        );
        assert_eq!(
            ErrorClassifier::classify("something odd", "test").category,
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_classify_http_status() {
        let rate = ErrorClassifier::classify_http_status(429, "slow down", "openai");
        assert_eq!(rate.category, ErrorCategory::RateLimit);
        assert_eq!(rate.retry_after, Some(Duration::from_secs(30)));

        let server = ErrorClassifier::classify_http_status(502, "bad gateway", "openai");
        assert!(server.is_retryable());

        let auth = ErrorClassifier::classify_http_status(401, "nope", "openai");
        assert!(!auth.is_retryable());
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");
    }
}
