//! Change Classifier
//!
//! Turns a [`RawChange`] into an immutable [`ChangeEvent`]: normalized and
//! classified paths, parsed commit header, decision markers, a coarse change
//! kind, and a diff summary. Fails with `InvalidChange` when no path remains.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use crate::constants::generation::MAX_DIFF_EXCERPT;
use crate::types::{
    ChangeEvent, ChangeKind, ChangedFile, ClassifiedPath, CommitInfo, DiffSummary, DocweaveError,
    FileStatus, PathClass, RawChange, Result,
};

static CONVENTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[A-Za-z]+)(?:\((?P<scope>[^)]*)\))?(?P<bang>!)?:\s*(?P<subject>.+)$")
        .expect("valid conventional commit regex")
});

static DECISION_MARKERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("revert", r"(?i)\brevert"),
        ("rollback", r"(?i)\broll(?:ed)?[ -]?back\b"),
        ("replace", r"(?i)\breplac(?:e|es|ed|ing)\b"),
        ("migrate", r"(?i)\bmigrat(?:e|es|ed|ing)\b"),
        ("deprecate", r"(?i)\bdeprecat"),
        ("instead of", r"(?i)\binstead of\b"),
        ("switch", r"(?i)\bswitch(?:ed|ing)? (?:to|from)\b"),
        ("rejected", r"(?i)\breject(?:ed|ing)?\b"),
        ("decided", r"(?i)\bdecid(?:e|ed|ing)\b"),
        ("adr", r"(?i)\badr\b"),
        ("trade-off", r"(?i)\btrade-?offs?\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("valid marker regex")))
    .collect()
});

const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "rst", "adoc", "txt"];

/// Directories that hold modules rather than being modules themselves
const CONTAINER_DIRS: &[&str] = &[
    "src", "lib", "app", "apps", "pkg", "packages", "crates", "services", "internal", "modules",
    "cmd",
];

const BUILD_FILES: &[&str] = &[
    "cargo.toml",
    "cargo.lock",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "go.mod",
    "go.sum",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "makefile",
    "justfile",
    "dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".gitlab-ci.yml",
    "build.rs",
];

const ENTRY_STEMS: &[&str] = &["main", "__main__", "cli", "app", "server", "index"];
const ENTRY_DIRS: &[&str] = &["bin", "cmd", "cli", "routes", "router", "commands", "handlers"];
const INTERFACE_DIRS: &[&str] = &["api", "apis", "interfaces", "include", "sdk", "public", "proto"];
const INTERFACE_EXTENSIONS: &[&str] = &["proto", "graphql", "gql", "thrift", "avsc"];
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs", "testdata", "fixtures"];
const ENGAGEMENT_WORDS: &[&str] = &[
    "readme",
    "contributing",
    "getting-started",
    "getting_started",
    "quickstart",
    "usage",
    "guide",
    "tutorial",
    "install",
    "installation",
];

pub struct ChangeClassifier {
    extra_markers: Vec<(String, Regex)>,
}

impl Default for ChangeClassifier {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl ChangeClassifier {
    /// `keywords` extend the built-in decision markers
    pub fn new(keywords: &[String]) -> Self {
        let extra_markers = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .filter_map(|k| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(k)))
                    .ok()
                    .map(|re| (k.to_lowercase(), re))
            })
            .collect();
        Self { extra_markers }
    }

    pub fn classify(&self, raw: &RawChange) -> Result<ChangeEvent> {
        let files = normalize_files(&raw.files);
        if files.is_empty() {
            return Err(DocweaveError::invalid_change(
                "change carries no file paths",
            ));
        }

        let paths: Vec<ClassifiedPath> = files
            .iter()
            .map(|f| ClassifiedPath {
                path: f.path.clone(),
                status: f.status,
                class: classify_path(&f.path),
                area: area_of(&f.path),
            })
            .collect();

        let commit = parse_commit(raw);
        let text = raw.metadata.text();
        let decision_markers = self.markers(&text);
        let diff = summarize(&files, &paths, raw.diff.as_deref());
        let kind = change_kind(&paths, &commit, &decision_markers);

        Ok(ChangeEvent {
            id: event_id(&raw.repository_id, &raw.revision_id, &paths),
            repository_id: raw.repository_id.clone(),
            revision_id: raw.revision_id.clone(),
            paths,
            metadata: raw.metadata.clone(),
            commit,
            decision_markers,
            kind,
            diff,
        })
    }

    fn markers(&self, text: &str) -> Vec<String> {
        let builtin = DECISION_MARKERS
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(label, _)| label.to_string());
        let extra = self
            .extra_markers
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(label, _)| label.clone());

        builtin
            .chain(extra)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// =============================================================================
// Paths
// =============================================================================

fn normalize_files(files: &[ChangedFile]) -> Vec<ChangedFile> {
    let mut seen = BTreeSet::new();
    files
        .iter()
        .filter_map(|f| {
            let path = f.path.trim().replace('\\', "/");
            let path = path.trim_start_matches("./").to_string();
            if path.is_empty() || !seen.insert(path.clone()) {
                return None;
            }
            Some(ChangedFile {
                path,
                ..f.clone()
            })
        })
        .collect()
}

/// Role a path plays, by location and name
pub fn classify_path(path: &str) -> PathClass {
    let lower = path.to_lowercase();
    let p = Path::new(&lower);
    let file_name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let stem = p.file_stem().and_then(|n| n.to_str()).unwrap_or("");
    let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
    let dirs: Vec<&str> = lower.split('/').rev().skip(1).collect();
    let in_dir = |names: &[&str]| dirs.iter().any(|d| names.contains(d));

    let is_doc = (DOC_EXTENSIONS.contains(&ext) && ext != "txt")
        || (ext == "txt" && !file_name.starts_with("requirements"))
        || dirs.last() == Some(&"docs");
    if is_doc {
        if in_dir(&["adr", "adrs", "decisions", "decision-records"])
            || stem.starts_with("adr-")
            || stem.contains("decision")
        {
            return PathClass::DecisionRecord;
        }
        if ENGAGEMENT_WORDS.iter().any(|w| stem.contains(w)) {
            return PathClass::EngagementDoc;
        }
        return PathClass::Documentation;
    }

    if in_dir(TEST_DIRS)
        || stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with(".test")
        || stem.ends_with(".spec")
    {
        return PathClass::Test;
    }

    if BUILD_FILES.contains(&file_name)
        || file_name.starts_with("dockerfile")
        || lower.starts_with(".github/")
        || lower.starts_with(".circleci/")
        || in_dir(&["deploy", "deployment", "helm", "k8s", "terraform"])
    {
        return PathClass::Build;
    }

    if ENTRY_STEMS.contains(&stem) || in_dir(ENTRY_DIRS) {
        return PathClass::EntryPoint;
    }

    if file_name == "lib.rs"
        || INTERFACE_EXTENSIONS.contains(&ext)
        || in_dir(INTERFACE_DIRS)
        || stem.contains("openapi")
        || stem.contains("swagger")
        || stem == "schema"
    {
        return PathClass::PublicInterface;
    }

    PathClass::Source
}

/// Module area: container dir plus module (`src/auth`), else the first dir
pub fn area_of(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match parts.as_slice() {
        [] | [_] => ".".to_string(),
        [first, second, _, ..] if CONTAINER_DIRS.contains(&first.to_lowercase().as_str()) => {
            format!("{}/{}", first, second)
        }
        [first, ..] => first.to_string(),
    }
}

// =============================================================================
// Metadata
// =============================================================================

fn parse_commit(raw: &RawChange) -> CommitInfo {
    let header = raw
        .metadata
        .commit_message
        .as_deref()
        .or(raw.metadata.pr_title.as_deref())
        .and_then(|m| m.lines().find(|l| !l.trim().is_empty()))
        .map(str::trim);

    let text = raw.metadata.text();
    let breaking_footer = text.contains("BREAKING CHANGE") || text.contains("BREAKING-CHANGE");

    let Some(header) = header else {
        return CommitInfo {
            breaking: breaking_footer,
            ..Default::default()
        };
    };

    match CONVENTIONAL.captures(header) {
        Some(caps) => CommitInfo {
            kind: Some(caps["kind"].to_lowercase()),
            scope: caps.name("scope").map(|s| s.as_str().to_string()),
            breaking: caps.name("bang").is_some() || breaking_footer,
            subject: Some(caps["subject"].trim().to_string()),
        },
        None => CommitInfo {
            kind: None,
            scope: None,
            breaking: breaking_footer,
            subject: Some(header.to_string()),
        },
    }
}

fn change_kind(paths: &[ClassifiedPath], commit: &CommitInfo, markers: &[String]) -> ChangeKind {
    let any = |class: PathClass| paths.iter().any(|p| p.class == class);

    if commit.breaking || any(PathClass::EntryPoint) || any(PathClass::PublicInterface) {
        ChangeKind::InterfaceAffecting
    } else if !markers.is_empty()
        || any(PathClass::DecisionRecord)
        || commit.kind.as_deref() == Some("revert")
    {
        ChangeKind::DecisionAffecting
    } else if paths.iter().any(|p| p.class.is_system()) {
        ChangeKind::Structural
    } else {
        ChangeKind::Cosmetic
    }
}

fn summarize(files: &[ChangedFile], paths: &[ClassifiedPath], diff: Option<&str>) -> DiffSummary {
    let count = |status: FileStatus| files.iter().filter(|f| f.status == status).count();
    let areas: BTreeSet<String> = paths
        .iter()
        .filter(|p| p.class.is_system() && p.area != ".")
        .map(|p| p.area.clone())
        .collect();

    DiffSummary {
        files_changed: files.len(),
        additions: files.iter().map(|f| f.additions as u64).sum(),
        deletions: files.iter().map(|f| f.deletions as u64).sum(),
        added: count(FileStatus::Added),
        deleted: count(FileStatus::Deleted),
        renamed: count(FileStatus::Renamed),
        areas: areas.into_iter().collect(),
        excerpt: diff.filter(|d| !d.trim().is_empty()).map(excerpt),
    }
}

fn excerpt(diff: &str) -> String {
    if diff.len() <= MAX_DIFF_EXCERPT {
        return diff.to_string();
    }
    let mut end = MAX_DIFF_EXCERPT;
    while !diff.is_char_boundary(end) {
        end -= 1;
    }
    diff[..end].to_string()
}

/// Stable id: SHA-256 over repository, revision, and sorted paths
fn event_id(repository_id: &str, revision_id: &str, paths: &[ClassifiedPath]) -> String {
    let mut sorted: Vec<&str> = paths.iter().map(|p| p.path.as_str()).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(repository_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(revision_id.as_bytes());
    for path in sorted {
        hasher.update([0u8]);
        hasher.update(path.as_bytes());
    }
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("chg-{}", hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeMetadata;

    fn raw(paths: &[&str], message: &str) -> RawChange {
        RawChange {
            repository_id: "acme/app".into(),
            revision_id: "abc123".into(),
            files: paths.iter().map(|p| ChangedFile::modified(*p)).collect(),
            diff: None,
            metadata: ChangeMetadata {
                commit_message: Some(message.into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_no_paths_is_invalid() {
        let classifier = ChangeClassifier::default();
        let err = classifier.classify(&raw(&[], "fix: x")).unwrap_err();
        assert!(matches!(err, DocweaveError::InvalidChange(_)));

        let err = classifier.classify(&raw(&["  ", ""], "fix: x")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_path_classes() {
        assert_eq!(classify_path("README.md"), PathClass::EngagementDoc);
        assert_eq!(classify_path("docs/getting-started.md"), PathClass::EngagementDoc);
        assert_eq!(classify_path("docs/adr/0004-use-redis.md"), PathClass::DecisionRecord);
        assert_eq!(classify_path("docs/internals.md"), PathClass::Documentation);
        assert_eq!(classify_path("src/main.rs"), PathClass::EntryPoint);
        assert_eq!(classify_path("src/bin/worker.rs"), PathClass::EntryPoint);
        assert_eq!(classify_path("src/lib.rs"), PathClass::PublicInterface);
        assert_eq!(classify_path("api/v1/users.proto"), PathClass::PublicInterface);
        assert_eq!(classify_path("Cargo.toml"), PathClass::Build);
        assert_eq!(classify_path(".github/workflows/ci.yml"), PathClass::Build);
        assert_eq!(classify_path("tests/cache_test.rs"), PathClass::Test);
        assert_eq!(classify_path("web/src/button.test.ts"), PathClass::Test);
        assert_eq!(classify_path("src/cache/lru.rs"), PathClass::Source);
        assert_eq!(classify_path("requirements.txt"), PathClass::Build);
    }

    #[test]
    fn test_areas() {
        assert_eq!(area_of("src/auth/token.rs"), "src/auth");
        assert_eq!(area_of("src/lib.rs"), "src");
        assert_eq!(area_of("web/index.ts"), "web");
        assert_eq!(area_of("Cargo.toml"), ".");
    }

    #[test]
    fn test_conventional_commit() {
        let classifier = ChangeClassifier::default();
        let event = classifier
            .classify(&raw(&["src/api/users.rs"], "feat(api)!: drop v1 endpoints\n\nbody"))
            .unwrap();
        assert_eq!(event.commit.kind.as_deref(), Some("feat"));
        assert_eq!(event.commit.scope.as_deref(), Some("api"));
        assert!(event.commit.breaking);
        assert_eq!(event.commit.subject.as_deref(), Some("drop v1 endpoints"));
        assert_eq!(event.kind, ChangeKind::InterfaceAffecting);
    }

    #[test]
    fn test_breaking_footer_and_plain_header() {
        let classifier = ChangeClassifier::default();
        let event = classifier
            .classify(&raw(
                &["src/cache/lru.rs"],
                "Tune cache\n\nBREAKING CHANGE: capacity is now required",
            ))
            .unwrap();
        assert!(event.commit.breaking);
        assert_eq!(event.commit.kind, None);
        assert_eq!(event.commit.subject.as_deref(), Some("Tune cache"));
    }

    #[test]
    fn test_decision_markers_and_kind() {
        let classifier = ChangeClassifier::new(&["Spike Outcome".to_string()]);
        let event = classifier
            .classify(&raw(
                &["src/cache/lru.rs"],
                "Replace the LRU cache with redis instead of memcached; spike outcome",
            ))
            .unwrap();
        assert_eq!(event.decision_markers, vec!["instead of", "replace", "spike outcome"]);
        assert_eq!(event.kind, ChangeKind::DecisionAffecting);
    }

    #[test]
    fn test_kinds_structural_and_cosmetic() {
        let classifier = ChangeClassifier::default();
        let structural = classifier.classify(&raw(&["src/cache/lru.rs"], "perf: faster")).unwrap();
        assert_eq!(structural.kind, ChangeKind::Structural);
        let cosmetic = classifier.classify(&raw(&["docs/internals.md"], "docs: typo")).unwrap();
        assert_eq!(cosmetic.kind, ChangeKind::Cosmetic);
    }

    #[test]
    fn test_event_id_stable_and_order_independent() {
        let classifier = ChangeClassifier::default();
        let a = classifier.classify(&raw(&["a.rs", "b.rs"], "x")).unwrap();
        let b = classifier.classify(&raw(&["b.rs", "a.rs"], "x")).unwrap();
        let c = classifier.classify(&raw(&["a.rs"], "x")).unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert!(a.id.starts_with("chg-"));
    }

    #[test]
    fn test_paths_normalized_and_deduplicated() {
        let classifier = ChangeClassifier::default();
        let event = classifier
            .classify(&raw(&["./src/a.rs", "src\\a.rs", "src/b.rs"], "x"))
            .unwrap();
        assert_eq!(event.path_strings(), vec!["src/a.rs", "src/b.rs"]);
    }

    #[test]
    fn test_diff_summary() {
        let mut change = raw(&["src/auth/token.rs", "src/billing/invoice.rs", "README.md"], "x");
        change.files[0].status = FileStatus::Deleted;
        change.files[1].additions = 10;
        change.diff = Some("é".repeat(MAX_DIFF_EXCERPT));
        let event = ChangeClassifier::default().classify(&change).unwrap();
        assert_eq!(event.diff.deleted, 1);
        assert_eq!(event.diff.additions, 10);
        assert_eq!(event.diff.areas, vec!["src/auth", "src/billing"]);
        assert!(event.diff.excerpt.unwrap().len() <= MAX_DIFF_EXCERPT);
    }
}
