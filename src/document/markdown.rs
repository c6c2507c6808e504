//! Markdown section model
//!
//! Documents are split into ATX-heading sections. Headings inside fenced code
//! blocks are ignored. A section may declare the paths it documents with a
//! coverage hint comment:
//!
//! ```markdown
//! ## Storage
//! <!-- covers: src/storage/**, migrations/* -->
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})[ \t]+(.+?)[ \t]*#*[ \t]*$").expect("valid heading regex")
});

static COVERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*covers:\s*(.+?)\s*-->").expect("valid covers regex"));

/// Slug addressing a document's text before its first heading
pub const PREAMBLE_SLUG: &str = "_preamble";

/// Directories too generic to name a module
const CONTAINER_DIRS: &[&str] = &[
    "src", "lib", "app", "apps", "pkg", "packages", "crates", "internal", "source", "modules",
];

/// File stems too generic to identify a module on their own
const GENERIC_STEMS: &[&str] = &["mod", "lib", "index", "main", "init", "__init__", "readme"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub slug: String,
    pub heading: String,
    pub level: u8,
    pub body: String,
    /// Glob patterns from `<!-- covers: ... -->` hints
    pub covers: Vec<String>,
}

impl Section {
    pub fn new(heading: impl Into<String>, level: u8, body: impl Into<String>) -> Self {
        let heading = heading.into();
        let body = body.into();
        Self {
            slug: slugify(&heading),
            covers: coverage_hints(&body),
            heading,
            level,
            body,
        }
    }

    /// Pseudo-section holding heading-less lead text
    pub fn preamble(body: impl Into<String>) -> Self {
        Self {
            slug: PREAMBLE_SLUG.to_string(),
            heading: String::new(),
            level: 0,
            body: body.into(),
            covers: Vec::new(),
        }
    }

    pub fn word_count(&self) -> usize {
        word_count(&strip_comments(&self.body))
    }

    /// Body without coverage hints, trimmed
    pub fn text(&self) -> String {
        strip_comments(&self.body).trim().to_string()
    }

    /// Whether this section documents `path`, via a coverage glob or by
    /// naming the path's module as a whole word
    pub fn covers_path(&self, path: &str) -> bool {
        let glob_hit = self.covers.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(path))
                .unwrap_or(false)
        });
        if glob_hit {
            return true;
        }

        let words = tokens(&format!("{}\n{}", self.heading, self.body));
        [module_name(path), parent_module(path)]
            .into_iter()
            .flatten()
            .any(|name| words.contains(&name))
    }

    pub fn to_markdown(&self) -> String {
        if self.level == 0 {
            return format!("{}\n", self.body.trim_end());
        }
        let hashes = "#".repeat(self.level.clamp(1, 6) as usize);
        let body = self.body.trim_end();
        if body.is_empty() {
            format!("{} {}\n", hashes, self.heading)
        } else {
            format!("{} {}\n{}\n", hashes, self.heading, body)
        }
    }
}

/// A parsed Markdown document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarkdownDocument {
    /// Text before the first heading
    pub preamble: String,
    pub sections: Vec<Section>,
}

impl MarkdownDocument {
    pub fn parse(content: &str) -> Self {
        let mut preamble = String::new();
        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<(String, u8, String)> = None;
        let mut fence: Option<&str> = None;

        for line in content.lines() {
            let trimmed = line.trim_start();
            if let Some(marker) = fence_marker(trimmed) {
                match fence {
                    Some(open) if marker == open => fence = None,
                    None => fence = Some(marker),
                    _ => {}
                }
            } else if fence.is_none()
                && let Some(caps) = HEADING.captures(line)
            {
                if let Some((heading, level, body)) = current.take() {
                    sections.push(Section::new(heading, level, body));
                }
                let level = caps[1].len() as u8;
                current = Some((caps[2].trim().to_string(), level, String::new()));
                continue;
            }

            let target = match current.as_mut() {
                Some((_, _, body)) => body,
                None => &mut preamble,
            };
            target.push_str(line);
            target.push('\n');
        }

        if let Some((heading, level, body)) = current {
            sections.push(Section::new(heading, level, body));
        }

        dedupe_slugs(&mut sections);
        Self { preamble, sections }
    }

    pub fn section(&self, slug: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.slug == slug)
    }

    /// Owned section by slug, including the preamble pseudo-section
    pub fn lookup(&self, slug: &str) -> Option<Section> {
        if slug == PREAMBLE_SLUG {
            return (!self.preamble.trim().is_empty())
                .then(|| Section::preamble(self.preamble.clone()));
        }
        self.section(slug).cloned()
    }

    pub fn headings(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.heading.clone()).collect()
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.preamble) + self.sections.iter().map(Section::word_count).sum::<usize>()
    }

    pub fn is_blank(&self) -> bool {
        self.preamble.trim().is_empty() && self.sections.is_empty()
    }

    /// Pairs of (previous level, level) where a heading skips a level going deeper
    pub fn level_skips(&self) -> Vec<(&Section, u8)> {
        let mut skips = Vec::new();
        let mut previous: Option<u8> = None;
        for section in &self.sections {
            if let Some(prev) = previous
                && section.level > prev + 1
            {
                skips.push((section, prev));
            }
            previous = Some(section.level);
        }
        skips
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if !self.preamble.trim().is_empty() {
            out.push_str(self.preamble.trim_end());
            out.push_str("\n\n");
        }
        let rendered: Vec<String> = self.sections.iter().map(Section::to_markdown).collect();
        out.push_str(&rendered.join("\n"));
        out
    }
}

// =============================================================================
// Text helpers
// =============================================================================

pub fn slugify(heading: &str) -> String {
    let mut slug = String::with_capacity(heading.len());
    let mut dash = false;
    for c in heading.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn dedupe_slugs(sections: &mut [Section]) {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for section in sections.iter_mut() {
        let base = section.slug.clone();
        let mut n = 1;
        while !seen.insert(section.slug.clone()) {
            section.slug = format!("{}-{}", base, n);
            n += 1;
        }
    }
}

fn fence_marker(line: &str) -> Option<&'static str> {
    if line.starts_with("```") {
        Some("```")
    } else if line.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Whether every opened code fence is closed
pub fn fences_balanced(content: &str) -> bool {
    let mut open: Option<&str> = None;
    for line in content.lines() {
        if let Some(marker) = fence_marker(line.trim_start()) {
            match open {
                Some(o) if o == marker => open = None,
                None => open = Some(marker),
                _ => {}
            }
        }
    }
    open.is_none()
}

fn coverage_hints(body: &str) -> Vec<String> {
    COVERS
        .captures_iter(body)
        .flat_map(|caps| {
            caps[1]
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn strip_comments(body: &str) -> String {
    COVERS.replace_all(body, "").into_owned()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// Lowercase word set; `/` and `.` separate words so paths split into parts
pub fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .map(|t| t.trim_matches('-').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Jaccard similarity of the word sets of two texts
pub fn similarity(a: &str, b: &str) -> f64 {
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

/// Share of `original`'s words still present in `revised`
pub fn retention(original: &str, revised: &str) -> f64 {
    let before = tokens(original);
    if before.is_empty() {
        return 1.0;
    }
    let after = tokens(revised);
    before.intersection(&after).count() as f64 / before.len() as f64
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name a path is referred to by in prose: its file stem, or the parent
/// directory for generic stems like `mod.rs`
pub fn module_name(path: &str) -> Option<String> {
    let p = Path::new(path);
    let stem = p.file_stem()?.to_str()?.to_lowercase();
    if !GENERIC_STEMS.contains(&stem.as_str()) {
        return Some(stem);
    }
    p.parent()
        .and_then(|parent| parent.file_name())
        .and_then(|n| n.to_str())
        .map(str::to_lowercase)
}

fn parent_module(path: &str) -> Option<String> {
    let name = Path::new(path).parent()?.file_name()?.to_str()?.to_lowercase();
    (!CONTAINER_DIRS.contains(&name.as_str())).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Billing Service\n\nIntro text.\n\n## Overview\nThe service bills.\n\n## Invoices\n<!-- covers: src/invoices/** -->\nInvoices are rendered by the renderer module.\n\n```rust\n# not a heading\n```\n\n## Overview\nDuplicate heading.\n";

    #[test]
    fn test_parse_sections_and_preamble() {
        let doc = MarkdownDocument::parse(DOC);
        assert!(doc.preamble.is_empty());
        let slugs: Vec<_> = doc.sections.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["billing-service", "overview", "invoices", "overview-1"]
        );
        assert_eq!(doc.sections[0].level, 1);
        assert!(doc.sections[2].body.contains("# not a heading"));
    }

    #[test]
    fn test_coverage_by_glob_and_name() {
        let doc = MarkdownDocument::parse(DOC);
        let invoices = doc.section("invoices").unwrap();
        assert_eq!(invoices.covers, vec!["src/invoices/**".to_string()]);
        assert!(invoices.covers_path("src/invoices/pdf.rs"));
        assert!(invoices.covers_path("src/render/renderer.rs"));
        assert!(!invoices.covers_path("src/payments/stripe.rs"));
    }

    #[test]
    fn test_retention() {
        assert_eq!(retention("alpha beta", "alpha beta gamma delta"), 1.0);
        assert_eq!(retention("alpha beta", "alpha"), 0.5);
        assert_eq!(retention("", "anything"), 1.0);
    }

    #[test]
    fn test_preamble_lookup() {
        let doc = MarkdownDocument::parse("Just some lead text.\n");
        assert!(doc.sections.is_empty());
        let lead = doc.lookup(PREAMBLE_SLUG).unwrap();
        assert_eq!(lead.level, 0);
        assert_eq!(lead.to_markdown(), "Just some lead text.\n");
        assert!(MarkdownDocument::parse(DOC).lookup(PREAMBLE_SLUG).is_none());
    }

    #[test]
    fn test_generic_stem_uses_parent() {
        assert_eq!(module_name("src/auth/mod.rs").as_deref(), Some("auth"));
        assert_eq!(module_name("src/cache.rs").as_deref(), Some("cache"));
    }

    #[test]
    fn test_fences_balanced() {
        assert!(fences_balanced("```\ncode\n```\n"));
        assert!(!fences_balanced("```\ncode\n"));
        assert!(fences_balanced("~~~\n```\n~~~\n"));
    }

    #[test]
    fn test_level_skips() {
        let doc = MarkdownDocument::parse("# A\n### C\n## B\n");
        let skips = doc.level_skips();
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].0.heading, "C");
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("a b c", "a b c"), 1.0);
        assert!(similarity("alpha beta", "gamma delta") < 0.01);
        assert!((similarity("a b c d", "a b c e") - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_word_count_ignores_hints() {
        let s = Section::new("X", 2, "<!-- covers: src/** -->\none two three\n");
        assert_eq!(s.word_count(), 3);
        assert_eq!(s.text(), "one two three");
    }
}
