pub mod change;
pub mod error;
pub mod generation;
pub mod outcome;
pub mod perspective;
pub mod plan;
pub mod quality;
pub mod snapshot;

pub use change::*;
pub use error::{DocweaveError, ErrorCategory, ErrorClassifier, LlmError, Result};
pub use generation::*;
pub use outcome::*;
pub use perspective::*;
pub use plan::*;
pub use quality::*;
pub use snapshot::*;

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Identifier for one orchestration run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Score clamped to `0.0..=1.0`
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::generate(), RunId::generate());
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(1.5), 1.0);
        assert_eq!(clamp_unit(-0.1), 0.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }
}
