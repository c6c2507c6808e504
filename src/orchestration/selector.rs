//! Perspective Selector
//!
//! Three independent predicates, evaluated in fixed order. Each one collects
//! weighted signals from the change; any signal fires the perspective and the
//! summed weights (capped at 1.0) become its confidence. Always returns one
//! decision per perspective in [`Perspective::ALL`] order.

use tracing::{debug, info};

use crate::constants::selection::STRUCTURAL_REMOVAL_THRESHOLD;
use crate::types::{
    ChangeEvent, FileStatus, PathClass, Perspective, PerspectiveDecision, RepositorySnapshot,
};

/// Paths listed in a reason before eliding the rest
const REASON_PATHS: usize = 3;

#[derive(Default)]
struct Signals(Vec<(String, f64)>);

impl Signals {
    fn add(&mut self, reason: String, weight: f64) {
        self.0.push((reason, weight));
    }

    fn paths(&mut self, label: &str, paths: &[&str], weight: f64) {
        if !paths.is_empty() {
            self.add(format!("{}: {}", label, list_paths(paths)), weight);
        }
    }

    fn into_decision(self, perspective: Perspective, idle: &str) -> PerspectiveDecision {
        if self.0.is_empty() {
            return PerspectiveDecision::skipped(perspective, idle);
        }
        let confidence: f64 = self.0.iter().map(|(_, w)| w).sum();
        let reason = self
            .0
            .into_iter()
            .map(|(r, _)| r)
            .collect::<Vec<_>>()
            .join("; ");
        PerspectiveDecision::triggered(perspective, reason, confidence.min(1.0))
    }
}

fn list_paths(paths: &[&str]) -> String {
    let shown = paths
        .iter()
        .take(REASON_PATHS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    match paths.len().saturating_sub(REASON_PATHS) {
        0 => shown,
        more => format!("{} and {} more", shown, more),
    }
}

fn paths_of(event: &ChangeEvent, class: PathClass) -> Vec<&str> {
    event.with_class(class).map(|p| p.path.as_str()).collect()
}

pub struct PerspectiveSelector;

impl PerspectiveSelector {
    pub fn select(event: &ChangeEvent, snapshot: &RepositorySnapshot) -> Vec<PerspectiveDecision> {
        let decisions = vec![
            Self::engagement(event),
            Self::current_state(event),
            Self::decision_history(event, snapshot),
        ];

        for d in &decisions {
            debug!(
                "{}: triggered={} confidence={:.2} ({})",
                d.perspective, d.triggered, d.confidence, d.reason
            );
        }
        if decisions.iter().all(|d| !d.triggered) {
            info!("No perspective affected by {}; nothing to document", event.id);
        }
        decisions
    }

    /// Does the change alter how an external actor interacts with the system?
    fn engagement(event: &ChangeEvent) -> PerspectiveDecision {
        let mut signals = Signals::default();

        signals.paths("entry points changed", &paths_of(event, PathClass::EntryPoint), 0.6);
        signals.paths(
            "onboarding docs touched",
            &paths_of(event, PathClass::EngagementDoc),
            0.5,
        );
        let interface_shape: Vec<&str> = event
            .with_class(PathClass::PublicInterface)
            .filter(|p| p.status.is_structural())
            .map(|p| p.path.as_str())
            .collect();
        signals.paths("public interface added or removed", &interface_shape, 0.5);
        if event.is_breaking() {
            signals.add("breaking change declared".to_string(), 0.4);
        }

        signals.into_decision(Perspective::Engagement, "no entry point or usage change")
    }

    /// Does the change alter what the system currently is or does?
    fn current_state(event: &ChangeEvent) -> PerspectiveDecision {
        let mut signals = Signals::default();

        signals.paths(
            "public interface changed",
            &paths_of(event, PathClass::PublicInterface),
            0.5,
        );
        signals.paths("source changed", &paths_of(event, PathClass::Source), 0.4);
        signals.paths("entry points changed", &paths_of(event, PathClass::EntryPoint), 0.3);
        signals.paths("build or deployment changed", &paths_of(event, PathClass::Build), 0.3);
        let reshaped: Vec<&str> = event
            .paths
            .iter()
            .filter(|p| p.class.is_system() && p.status.is_structural())
            .map(|p| p.path.as_str())
            .collect();
        signals.paths("files added, removed or renamed", &reshaped, 0.2);

        signals.into_decision(Perspective::CurrentState, "no system path changed")
    }

    /// Does the change represent a notable decision or learning?
    fn decision_history(event: &ChangeEvent, snapshot: &RepositorySnapshot) -> PerspectiveDecision {
        let mut signals = Signals::default();

        if !event.decision_markers.is_empty() {
            signals.add(
                format!("decision language: {}", event.decision_markers.join(", ")),
                0.5,
            );
        }
        signals.paths(
            "decision records touched",
            &paths_of(event, PathClass::DecisionRecord),
            0.6,
        );
        if event.commit.kind.as_deref() == Some("revert") {
            signals.add("revert commit".to_string(), 0.6);
        }

        let breadth = snapshot.size_class.architecture_breadth();
        if event.diff.areas.len() >= breadth {
            signals.add(
                format!(
                    "architecture shift across {} areas ({} repository threshold {})",
                    event.diff.areas.len(),
                    snapshot.size_class,
                    breadth
                ),
                0.5,
            );
        }

        let removed = event
            .paths
            .iter()
            .filter(|p| p.class == PathClass::Source)
            .filter(|p| matches!(p.status, FileStatus::Deleted | FileStatus::Renamed))
            .count();
        if removed >= STRUCTURAL_REMOVAL_THRESHOLD {
            signals.add(format!("{} source files removed or renamed", removed), 0.4);
        }

        signals.into_decision(Perspective::DecisionHistory, "no decision signal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::classifier::ChangeClassifier;
    use crate::types::{ChangeMetadata, ChangedFile, RawChange, SizeClass};
    use proptest::prelude::*;

    fn event(files: Vec<ChangedFile>, message: &str) -> ChangeEvent {
        let raw = RawChange {
            repository_id: "acme/app".into(),
            revision_id: "r1".into(),
            files,
            diff: None,
            metadata: ChangeMetadata {
                commit_message: Some(message.into()),
                ..Default::default()
            },
        };
        ChangeClassifier::default().classify(&raw).unwrap()
    }

    fn triggered(decisions: &[PerspectiveDecision]) -> Vec<Perspective> {
        decisions
            .iter()
            .filter(|d| d.triggered)
            .map(|d| d.perspective)
            .collect()
    }

    #[test]
    fn test_readme_only_triggers_engagement() {
        let e = event(vec![ChangedFile::modified("README.md")], "docs: clarify install");
        let decisions = PerspectiveSelector::select(&e, &RepositorySnapshot::default());
        assert_eq!(decisions.len(), 3);
        assert_eq!(triggered(&decisions), vec![Perspective::Engagement]);
        assert!(decisions[0].reason.contains("README.md"));
    }

    #[test]
    fn test_internal_module_triggers_current_state() {
        let e = event(vec![ChangedFile::modified("src/cache/lru.rs")], "perf: tighter loop");
        let decisions = PerspectiveSelector::select(&e, &RepositorySnapshot::default());
        assert_eq!(triggered(&decisions), vec![Perspective::CurrentState]);
    }

    #[test]
    fn test_decision_markers_trigger_history() {
        let e = event(
            vec![ChangedFile::modified("src/cache/lru.rs")],
            "Replace memcached with redis",
        );
        let decisions = PerspectiveSelector::select(&e, &RepositorySnapshot::default());
        assert_eq!(
            triggered(&decisions),
            vec![Perspective::CurrentState, Perspective::DecisionHistory]
        );
    }

    #[test]
    fn test_architecture_breadth_depends_on_size() {
        let files = vec![
            ChangedFile::modified("src/auth/a.rs"),
            ChangedFile::modified("src/billing/b.rs"),
            ChangedFile::modified("src/cache/c.rs"),
        ];
        let e = event(files, "refactor: shared error type");

        let medium = RepositorySnapshot::default();
        assert!(PerspectiveSelector::select(&e, &medium)[2].triggered);

        let large = RepositorySnapshot {
            size_class: SizeClass::Large,
            ..Default::default()
        };
        assert!(!PerspectiveSelector::select(&e, &large)[2].triggered);
    }

    #[test]
    fn test_mass_removal_is_a_decision() {
        let files = (0..3)
            .map(|i| ChangedFile::with_status(format!("src/legacy/m{}.rs", i), FileStatus::Deleted))
            .collect();
        let e = event(files, "chore: cleanup");
        let decisions = PerspectiveSelector::select(&e, &RepositorySnapshot::default());
        assert!(decisions[2].triggered);
        assert!(decisions[2].reason.contains("3 source files"));
    }

    #[test]
    fn test_test_only_change_is_noop() {
        let e = event(vec![ChangedFile::modified("tests/cache_test.rs")], "test: more cases");
        let decisions = PerspectiveSelector::select(&e, &RepositorySnapshot::default());
        assert!(triggered(&decisions).is_empty());
        assert!(decisions.iter().all(|d| d.confidence == 1.0));
    }

    #[test]
    fn test_reason_elides_long_path_lists() {
        assert_eq!(list_paths(&["a", "b", "c", "d", "e"]), "a, b, c and 2 more");
        assert_eq!(list_paths(&["a"]), "a");
    }

    fn arb_file() -> impl Strategy<Value = ChangedFile> {
        let dirs = prop::sample::select(vec![
            "src/auth", "src/api", "src/bin", "docs", "docs/adr", "tests", ".github", "web", "",
        ]);
        let names = prop::sample::select(vec![
            "main.rs", "lib.rs", "README.md", "handler.rs", "Cargo.toml", "x_test.rs", "0001.md",
        ]);
        let status = prop::sample::select(vec![
            FileStatus::Added,
            FileStatus::Modified,
            FileStatus::Deleted,
            FileStatus::Renamed,
        ]);
        (dirs, names, status).prop_map(|(d, n, s)| {
            let path = if d.is_empty() { n.to_string() } else { format!("{}/{}", d, n) };
            ChangedFile::with_status(path, s)
        })
    }

    proptest! {
        #[test]
        fn prop_selection_is_fixed_set_and_deterministic(
            files in prop::collection::vec(arb_file(), 1..8),
            message in prop::sample::select(vec!["fix: x", "feat!: y", "Revert \"z\"", "docs: w"]),
        ) {
            let e = event(files, message);
            let snapshot = RepositorySnapshot::default();
            let first = PerspectiveSelector::select(&e, &snapshot);
            let second = PerspectiveSelector::select(&e, &snapshot);

            prop_assert_eq!(&first, &second);
            let order: Vec<Perspective> = first.iter().map(|d| d.perspective).collect();
            prop_assert_eq!(order, Perspective::ALL.to_vec());
            for d in &first {
                prop_assert!((0.0..=1.0).contains(&d.confidence));
            }
        }
    }
}
