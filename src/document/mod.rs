//! Documentation model
//!
//! Markdown section parsing, per-perspective templates, and document store
//! adapters.

pub mod markdown;
pub mod store;

pub use markdown::{
    MarkdownDocument, PREAMBLE_SLUG, Section, fences_balanced, module_name, normalize_whitespace,
    retention, similarity, slugify, tokens,
};
pub use store::{FsDocumentStore, MemoryDocumentStore};

use crate::types::{Perspective, SectionRef};

/// Sections a newly created document of each perspective must have
pub fn template_sections(perspective: Perspective) -> Vec<SectionRef> {
    let (title, sections): (&str, &[&str]) = match perspective {
        Perspective::Engagement => ("Overview", &["Getting Started", "Usage"]),
        Perspective::CurrentState => ("Overview", &["Architecture", "Components", "Interfaces"]),
        Perspective::DecisionHistory => ("Decision Log", &["Context", "Decision", "Consequences"]),
    };

    std::iter::once(SectionRef::new(title, 1))
        .chain(sections.iter().map(|h| SectionRef::new(*h, 2)))
        .collect()
}

/// Heading of the section appended to a decision log for one change
pub fn decision_entry_heading(revision_id: &str, subject: Option<&str>) -> String {
    let short: String = revision_id.chars().take(8).collect();
    match (subject, short.is_empty()) {
        (Some(s), false) => format!("{} ({})", s.trim(), short),
        (Some(s), true) => s.trim().to_string(),
        (None, false) => format!("Decision at {}", short),
        (None, true) => "New Decision".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_have_title_first() {
        for p in Perspective::ALL {
            let sections = template_sections(p);
            assert_eq!(sections[0].level, 1);
            assert!(sections.iter().skip(1).all(|s| s.level == 2));
        }
        let engagement = template_sections(Perspective::Engagement);
        assert_eq!(engagement[1].slug, "getting-started");
    }

    #[test]
    fn test_decision_entry_heading() {
        assert_eq!(
            decision_entry_heading("0123456789abcdef", Some("Replace cache with redis")),
            "Replace cache with redis (01234567)"
        );
        assert_eq!(decision_entry_heading("", None), "New Decision");
    }
}
