//! Document targets and update plans.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::perspective::Perspective;
use crate::document::{MarkdownDocument, Section};

/// Short description of a target's current content
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentSummary {
    pub headings: Vec<String>,
    pub section_count: usize,
    pub word_count: usize,
}

/// One document associated with a perspective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTarget {
    pub perspective: Perspective,
    pub path: String,
    pub exists: bool,
    pub summary: Option<ContentSummary>,
    /// Full current content, when the document exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DocumentTarget {
    pub fn missing(perspective: Perspective, path: impl Into<String>) -> Self {
        Self {
            perspective,
            path: path.into(),
            exists: false,
            summary: None,
            content: None,
        }
    }

    pub fn existing(perspective: Perspective, path: impl Into<String>, content: String) -> Self {
        let doc = MarkdownDocument::parse(&content);
        Self {
            perspective,
            path: path.into(),
            exists: true,
            summary: Some(ContentSummary {
                headings: doc.headings(),
                section_count: doc.sections.len(),
                word_count: doc.word_count(),
            }),
            content: Some(content),
        }
    }

    /// Exists and has non-whitespace content
    pub fn has_content(&self) -> bool {
        self.exists && self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    pub fn document(&self) -> MarkdownDocument {
        self.content
            .as_deref()
            .map(MarkdownDocument::parse)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStrategy {
    Create,
    Update,
    Merge,
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// Reference to a document section by slug
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionRef {
    pub slug: String,
    pub heading: String,
    pub level: u8,
}

impl SectionRef {
    pub fn new(heading: impl Into<String>, level: u8) -> Self {
        let heading = heading.into();
        Self {
            slug: crate::document::slugify(&heading),
            heading,
            level,
        }
    }
}

impl From<&Section> for SectionRef {
    fn from(section: &Section) -> Self {
        Self {
            slug: section.slug.clone(),
            heading: section.heading.clone(),
            level: section.level,
        }
    }
}

/// Strategy for one triggered perspective. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub target: DocumentTarget,
    pub strategy: UpdateStrategy,
    pub preserve: Vec<SectionRef>,
    pub regenerate: Vec<SectionRef>,
    /// Changed paths this plan is responsible for
    pub scope: Vec<String>,
    /// Why the strategy was chosen
    pub rationale: String,
}

impl UpdatePlan {
    pub fn perspective(&self) -> Perspective {
        self.target.perspective
    }

    pub fn path(&self) -> &str {
        &self.target.path
    }

    /// Existing content the generation request must carry in full
    pub fn existing_content(&self) -> Option<&str> {
        match self.strategy {
            UpdateStrategy::Create => None,
            UpdateStrategy::Update | UpdateStrategy::Merge => self.target.content.as_deref(),
        }
    }

    /// Preserved sections with their current bodies
    pub fn preserved_sections(&self) -> Vec<Section> {
        let doc = self.target.document();
        self.preserve
            .iter()
            .filter_map(|r| doc.lookup(&r.slug))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_target_summary() {
        let target = DocumentTarget::existing(
            Perspective::CurrentState,
            "docs/current-state.md",
            "# Overview\nSystem text.\n## Cache\nCache text here.\n".to_string(),
        );
        let summary = target.summary.as_ref().unwrap();
        assert_eq!(summary.section_count, 2);
        assert_eq!(summary.headings, vec!["Overview", "Cache"]);
        assert!(target.has_content());
    }

    #[test]
    fn test_blank_existing_target_has_no_content() {
        let target = DocumentTarget::existing(Perspective::Engagement, "README.md", "  \n".into());
        assert!(target.exists);
        assert!(!target.has_content());
    }

    #[test]
    fn test_section_ref_slug() {
        let r = SectionRef::new("Getting Started", 2);
        assert_eq!(r.slug, "getting-started");
    }
}
