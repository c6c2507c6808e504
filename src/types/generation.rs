//! Generation requests and results exchanged with the generation capability.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::perspective::Perspective;
use super::plan::UpdatePlan;
use super::quality::ImprovementNote;

/// Immutable view of the context broker at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
    entries: Arc<BTreeMap<String, Value>>,
}

impl ContextSnapshot {
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Entries visible to one perspective: run-wide keys plus its own namespace
    pub fn scoped(&self, perspective: Perspective) -> BTreeMap<String, Value> {
        let own = format!("{}/", perspective.as_str());
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with("run/") || k.starts_with(&own))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// One attempt's request. Built fresh for every attempt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub plan: Arc<UpdatePlan>,
    pub context: ContextSnapshot,
    /// 1-based, strictly increasing per target
    pub attempt: u32,
    /// Notes from the previous failed attempt
    pub feedback: Vec<ImprovementNote>,
}

impl GenerationRequest {
    pub fn target_label(&self) -> String {
        format!("{}:{}", self.plan.perspective(), self.plan.path())
    }
}

/// Output of one completed generation call
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub request: GenerationRequest,
    pub content: String,
    /// Capability's own score, on a 0..=1 or 0..=100 scale
    pub self_score: Option<f64>,
    pub tokens_used: Option<u64>,
}

impl GenerationResult {
    pub fn new(request: GenerationRequest, content: impl Into<String>) -> Self {
        Self {
            request,
            content: content.into(),
            self_score: None,
            tokens_used: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.self_score = Some(score);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scoped_view_filters_namespaces() {
        let mut entries = BTreeMap::new();
        entries.insert("run/change".to_string(), json!({"id": "c1"}));
        entries.insert("engagement/plan".to_string(), json!("create"));
        entries.insert("current-state/plan".to_string(), json!("update"));
        let snap = ContextSnapshot::new(entries);

        let scoped = snap.scoped(Perspective::Engagement);
        assert!(scoped.contains_key("run/change"));
        assert!(scoped.contains_key("engagement/plan"));
        assert!(!scoped.contains_key("current-state/plan"));
    }
}
