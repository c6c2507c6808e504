//! Update Planner
//!
//! Resolves the document target for a triggered perspective and chooses how
//! to change it:
//!
//! | Target                           | Strategy | Regenerate                     |
//! |----------------------------------|----------|--------------------------------|
//! | missing                          | create   | template sections              |
//! | sections cleanly cover the scope | update   | covering sections only         |
//! | scope uncovered or ambiguous     | merge    | covering + integration section |
//! | decision log                     | merge    | one new decision entry         |
//!
//! Every emitted plan is checked by [`validate_plan`]; a breach is fatal.

use std::collections::BTreeSet;
use tracing::debug;

use crate::config::TargetsConfig;
use crate::document::{
    MarkdownDocument, PREAMBLE_SLUG, decision_entry_heading, template_sections,
};
use crate::orchestration::ports::SharedStore;
use crate::types::{
    ChangeEvent, ClassifiedPath, DocumentTarget, DocweaveError, PathClass, Perspective,
    RepositorySnapshot, Result, SectionRef, UpdatePlan, UpdateStrategy,
};

pub struct UpdatePlanner {
    targets: TargetsConfig,
    store: SharedStore,
}

impl UpdatePlanner {
    pub fn new(targets: TargetsConfig, store: SharedStore) -> Self {
        Self { targets, store }
    }

    /// Inventory entry for the perspective, else the configured default
    pub fn target_path(&self, perspective: Perspective, snapshot: &RepositorySnapshot) -> String {
        snapshot
            .target_for(perspective)
            .unwrap_or_else(|| self.targets.path_for(perspective))
            .to_string()
    }

    pub async fn plan(
        &self,
        perspective: Perspective,
        event: &ChangeEvent,
        snapshot: &RepositorySnapshot,
    ) -> Result<UpdatePlan> {
        let path = self.target_path(perspective, snapshot);
        let target = self.store.get_target(perspective, &path).await?;
        let plan = plan_for_target(target, event);
        validate_plan(&plan)?;

        debug!(
            "{} -> {} {} (regenerate {}, preserve {})",
            perspective,
            plan.strategy,
            plan.path(),
            plan.regenerate.len(),
            plan.preserve.len()
        );
        Ok(plan)
    }
}

/// Changed paths a perspective's document answers for
pub fn scope_for(perspective: Perspective, event: &ChangeEvent) -> Vec<String> {
    let relevant = |p: &&ClassifiedPath| match perspective {
        Perspective::Engagement => matches!(
            p.class,
            PathClass::EntryPoint | PathClass::EngagementDoc | PathClass::PublicInterface
        ),
        Perspective::CurrentState => p.class.is_system(),
        Perspective::DecisionHistory => p.class != PathClass::Test,
    };

    let scoped: Vec<String> = event
        .paths
        .iter()
        .filter(relevant)
        .map(|p| p.path.clone())
        .collect();
    if scoped.is_empty() {
        event.path_strings()
    } else {
        scoped
    }
}

/// Pure strategy choice for a resolved target
pub fn plan_for_target(target: DocumentTarget, event: &ChangeEvent) -> UpdatePlan {
    let perspective = target.perspective;
    let scope = scope_for(perspective, event);

    if !target.exists {
        return UpdatePlan {
            rationale: format!(
                "{} does not exist; creating from the {} template",
                target.path, perspective
            ),
            target,
            strategy: UpdateStrategy::Create,
            preserve: Vec::new(),
            regenerate: template_sections(perspective),
            scope,
        };
    }

    let doc = target.document();
    if doc.is_blank() {
        return UpdatePlan {
            rationale: format!("{} exists but is empty; filling the template", target.path),
            target,
            strategy: UpdateStrategy::Merge,
            preserve: Vec::new(),
            regenerate: template_sections(perspective),
            scope,
        };
    }

    if doc.sections.is_empty() {
        return UpdatePlan {
            rationale: format!(
                "{} has no headings; keeping its lead text and adding structure",
                target.path
            ),
            target,
            strategy: UpdateStrategy::Merge,
            preserve: vec![preamble_ref()],
            regenerate: template_sections(perspective),
            scope,
        };
    }

    if perspective == Perspective::DecisionHistory {
        return plan_decision_entry(target, &doc, event, scope);
    }

    plan_by_coverage(target, &doc, scope)
}

fn preamble_ref() -> SectionRef {
    SectionRef {
        slug: PREAMBLE_SLUG.to_string(),
        heading: "Lead text".to_string(),
        level: 0,
    }
}

fn with_preamble(doc: &MarkdownDocument, mut preserve: Vec<SectionRef>) -> Vec<SectionRef> {
    if !doc.preamble.trim().is_empty() {
        preserve.insert(0, preamble_ref());
    }
    preserve
}

/// Reference to a new section whose slug does not clash with the document
fn unique_ref(doc: &MarkdownDocument, heading: &str, level: u8) -> SectionRef {
    let mut candidate = SectionRef::new(heading, level);
    let mut n = 2;
    while doc.section(&candidate.slug).is_some() {
        candidate = SectionRef::new(format!("{} ({})", heading, n), level);
        n += 1;
    }
    candidate
}

/// Decision logs only grow: keep every entry, append one
fn plan_decision_entry(
    target: DocumentTarget,
    doc: &MarkdownDocument,
    event: &ChangeEvent,
    scope: Vec<String>,
) -> UpdatePlan {
    let heading = decision_entry_heading(&event.revision_id, event.commit.subject.as_deref());
    let entry = unique_ref(doc, &heading, 2);
    let preserve = with_preamble(doc, doc.sections.iter().map(SectionRef::from).collect());

    UpdatePlan {
        rationale: format!(
            "decision log is append-only; adding entry '{}' after {} existing sections",
            entry.heading,
            doc.sections.len()
        ),
        target,
        strategy: UpdateStrategy::Merge,
        preserve,
        regenerate: vec![entry],
        scope,
    }
}

/// Section that absorbs changes no existing section covers
fn integration_section(perspective: Perspective, doc: &MarkdownDocument) -> SectionRef {
    if let Some(missing) = template_sections(perspective)
        .into_iter()
        .filter(|s| s.level > 1)
        .find(|s| doc.section(&s.slug).is_none())
    {
        return missing;
    }
    let heading = match perspective {
        Perspective::CurrentState => "Additional Components",
        _ => "Additional Details",
    };
    unique_ref(doc, heading, 2)
}

fn plan_by_coverage(
    target: DocumentTarget,
    doc: &MarkdownDocument,
    scope: Vec<String>,
) -> UpdatePlan {
    let mut matched: BTreeSet<usize> = BTreeSet::new();
    let mut uncovered: Vec<&str> = Vec::new();
    let mut ambiguous: Vec<&str> = Vec::new();

    for path in &scope {
        let covering: Vec<usize> = doc
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.covers_path(path))
            .map(|(i, _)| i)
            .collect();
        let Some(deepest) = covering.iter().map(|i| doc.sections[*i].level).max() else {
            uncovered.push(path);
            continue;
        };
        let best: Vec<usize> = covering
            .into_iter()
            .filter(|i| doc.sections[*i].level == deepest)
            .collect();
        if best.len() > 1 {
            ambiguous.push(path);
        }
        matched.extend(best);
    }

    let refs = |indices: &BTreeSet<usize>| -> Vec<SectionRef> {
        indices.iter().map(|i| SectionRef::from(&doc.sections[*i])).collect()
    };
    let all: BTreeSet<usize> = (0..doc.sections.len()).collect();

    if uncovered.is_empty() && ambiguous.is_empty() && matched.len() < all.len() {
        let rest: BTreeSet<usize> = all.difference(&matched).copied().collect();
        return UpdatePlan {
            rationale: format!(
                "changed paths map to {} existing section(s); the other {} are preserved",
                matched.len(),
                rest.len()
            ),
            preserve: with_preamble(doc, refs(&rest)),
            regenerate: refs(&matched),
            strategy: UpdateStrategy::Update,
            target,
            scope,
        };
    }

    let mut regenerate_idx = matched.clone();
    let mut preserve_idx: BTreeSet<usize> = all.difference(&matched).copied().collect();
    let mut needs_integration = !uncovered.is_empty();

    if preserve_idx.is_empty() {
        if all.len() > 1 {
            regenerate_idx.remove(&0);
            preserve_idx.insert(0);
        } else {
            regenerate_idx.clear();
            preserve_idx.insert(0);
            needs_integration = true;
        }
    }

    let mut regenerate = refs(&regenerate_idx);
    if needs_integration || regenerate.is_empty() {
        regenerate.push(integration_section(target.perspective, doc));
    }

    let mut reasons = Vec::new();
    if !uncovered.is_empty() {
        reasons.push(format!("{} path(s) not covered by any section", uncovered.len()));
    }
    if !ambiguous.is_empty() {
        reasons.push(format!("{} path(s) covered by several sections", ambiguous.len()));
    }
    if reasons.is_empty() {
        reasons.push("change touches every section".to_string());
    }

    UpdatePlan {
        rationale: format!("{}; integrating into the full document", reasons.join(", ")),
        preserve: with_preamble(doc, refs(&preserve_idx)),
        regenerate,
        strategy: UpdateStrategy::Merge,
        target,
        scope,
    }
}

/// Check the plan invariants
pub fn validate_plan(plan: &UpdatePlan) -> Result<()> {
    let breach = |message: String| {
        Err(DocweaveError::PlanInvariant {
            target: plan.path().to_string(),
            message,
        })
    };

    match plan.strategy {
        UpdateStrategy::Create => {
            if plan.target.exists {
                return breach("create planned for an existing target".to_string());
            }
            if !plan.preserve.is_empty() {
                return breach(format!("create plan preserves {} section(s)", plan.preserve.len()));
            }
        }
        UpdateStrategy::Update | UpdateStrategy::Merge => {
            if !plan.target.exists {
                return breach(format!("{} planned for a missing target", plan.strategy));
            }
            if plan.target.has_content() && plan.preserve.is_empty() {
                return breach(format!(
                    "{} would overwrite existing content without preserving a section",
                    plan.strategy
                ));
            }
        }
    }

    if plan.regenerate.is_empty() {
        return breach("nothing to regenerate".to_string());
    }

    let preserved: BTreeSet<&str> = plan.preserve.iter().map(|s| s.slug.as_str()).collect();
    if let Some(both) = plan.regenerate.iter().find(|s| preserved.contains(s.slug.as_str())) {
        return breach(format!("section '{}' is both preserved and regenerated", both.slug));
    }
    Ok(())
}
