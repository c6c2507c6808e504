//! Quality Validator
//!
//! Scores generated content on three fixed axes:
//!
//! - **structural**: required sections present, fences closed, no heading
//!   level skips, no empty or placeholder sections
//! - **completeness**: regenerated sections are filled and the changed
//!   modules are mentioned
//! - **consistency**: preserved sections survive (verbatim for `update`,
//!   retained for `merge`) and removed modules are not still described
//!
//! The aggregate is the configured weighted mean. A report passes only when
//! the aggregate reaches the threshold and no axis is below the
//! [`AXIS_FLOOR`](crate::constants::quality::AXIS_FLOOR).
//! A failing report always carries at least one note per failing axis, each
//! naming a section.

use std::collections::HashSet;
use std::path::Path;

use crate::config::QualityConfig;
use crate::constants::quality::PLACEHOLDER_MARKERS;
use crate::document::{
    MarkdownDocument, PREAMBLE_SLUG, Section, fences_balanced, module_name, normalize_whitespace,
    retention, similarity, tokens,
};
use crate::types::{
    ChangeEvent, DOCUMENT_SCOPE, FileStatus, GenerationResult, ImprovementNote, Perspective,
    QualityAxis, QualityReport, SectionRef, UpdatePlan, UpdateStrategy, clamp_unit,
};

const FENCE_PENALTY: f64 = 0.2;
const LEVEL_SKIP_PENALTY: f64 = 0.1;
const EMPTY_SECTION_PENALTY: f64 = 0.1;
const PLACEHOLDER_PENALTY: f64 = 0.15;
const STALE_MENTION_PENALTY: f64 = 0.1;

const SECTION_SHARE: f64 = 0.7;
const MENTION_SHARE: f64 = 0.3;

const PROSE_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "rst", "adoc", "txt"];

pub struct QualityValidator {
    config: QualityConfig,
}

impl QualityValidator {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn threshold(&self) -> f64 {
        self.config.pass_threshold
    }

    pub fn validate(&self, result: &GenerationResult, event: &ChangeEvent) -> QualityReport {
        let plan = &result.request.plan;
        let doc = MarkdownDocument::parse(&result.content);
        let mut notes = Vec::new();

        let structural = self.structural(plan, &doc, &result.content, &mut notes);
        let completeness = self.completeness(plan, &doc, &mut notes);
        let consistency = self.consistency(plan, &doc, event, &mut notes);

        let w = &self.config.weights;
        let total = w.total();
        let aggregate = if total > 0.0 {
            clamp_unit(
                (w.structural * structural
                    + w.completeness * completeness
                    + w.consistency * consistency)
                    / total,
            )
        } else {
            0.0
        };
        let mut report = QualityReport {
            attempt: result.request.attempt,
            structural,
            completeness,
            consistency,
            validator_score: aggregate,
            capability_score: None,
            aggregate,
            passed: false,
            low_confidence: false,
            notes,
        };
        report.passed = aggregate >= self.config.pass_threshold && !report.below_axis_floor();
        if !report.passed {
            ensure_failure_notes(&mut report, self.config.pass_threshold, lead_section(plan));
        }
        report
    }

    // =========================================================================
    // Axes
    // =========================================================================

    fn structural(
        &self,
        plan: &UpdatePlan,
        doc: &MarkdownDocument,
        content: &str,
        notes: &mut Vec<ImprovementNote>,
    ) -> f64 {
        if doc.sections.is_empty() {
            notes.push(ImprovementNote::document(
                QualityAxis::Structural,
                "output has no Markdown headings",
            ));
            return 0.0;
        }

        let required: Vec<&SectionRef> = plan
            .regenerate
            .iter()
            .chain(plan.preserve.iter())
            .filter(|r| r.level > 0)
            .collect();
        let present = required
            .iter()
            .filter(|r| {
                let found = has_section(doc, r);
                if !found {
                    notes.push(ImprovementNote::new(
                        QualityAxis::Structural,
                        &r.heading,
                        "required section is missing",
                    ));
                }
                found
            })
            .count();
        let mut score = if required.is_empty() {
            1.0
        } else {
            present as f64 / required.len() as f64
        };

        if !fences_balanced(content) {
            score -= FENCE_PENALTY;
            notes.push(ImprovementNote::document(
                QualityAxis::Structural,
                "a code fence is opened but never closed",
            ));
        }

        for (section, previous) in doc.level_skips() {
            score -= LEVEL_SKIP_PENALTY;
            notes.push(ImprovementNote::new(
                QualityAxis::Structural,
                &section.heading,
                format!(
                    "heading jumps from level {} to level {}",
                    previous, section.level
                ),
            ));
        }

        for (i, section) in doc.sections.iter().enumerate() {
            let has_child = doc
                .sections
                .get(i + 1)
                .is_some_and(|next| next.level > section.level);
            if section.word_count() == 0 && !has_child {
                score -= EMPTY_SECTION_PENALTY;
                notes.push(ImprovementNote::new(
                    QualityAxis::Structural,
                    &section.heading,
                    "section is empty",
                ));
            }
            if let Some(marker) = placeholder(section) {
                score -= PLACEHOLDER_PENALTY;
                notes.push(ImprovementNote::new(
                    QualityAxis::Structural,
                    &section.heading,
                    format!("contains placeholder text '{}'", marker),
                ));
            }
        }

        clamp_unit(score)
    }

    fn completeness(
        &self,
        plan: &UpdatePlan,
        doc: &MarkdownDocument,
        notes: &mut Vec<ImprovementNote>,
    ) -> f64 {
        let min_words = self.config.min_section_words;
        let filled = plan
            .regenerate
            .iter()
            .filter(|r| match find_section(doc, r) {
                Some(s) if s.word_count() >= min_words => true,
                Some(s) => {
                    notes.push(ImprovementNote::new(
                        QualityAxis::Completeness,
                        &r.heading,
                        format!(
                            "has {} words; expected at least {}",
                            s.word_count(),
                            min_words
                        ),
                    ));
                    false
                }
                None => {
                    notes.push(ImprovementNote::new(
                        QualityAxis::Completeness,
                        &r.heading,
                        "section to regenerate was not written",
                    ));
                    false
                }
            })
            .count();
        let section_part = if plan.regenerate.is_empty() {
            1.0
        } else {
            filled as f64 / plan.regenerate.len() as f64
        };

        let words = tokens(&doc.to_markdown());
        let names: Vec<(String, Vec<String>)> = plan
            .scope
            .iter()
            .filter(|p| !is_prose(p))
            .map(|p| (p.clone(), names_for(p)))
            .filter(|(_, n)| !n.is_empty())
            .collect();
        let unmentioned: Vec<&str> = names
            .iter()
            .filter(|(_, n)| !n.iter().any(|name| words.contains(name)))
            .map(|(path, _)| path.as_str())
            .collect();
        if names.is_empty() {
            // Prose-only scope has no module names to look for
            return clamp_unit(section_part);
        }
        let mention_part = 1.0 - unmentioned.len() as f64 / names.len() as f64;
        if !unmentioned.is_empty() {
            notes.push(ImprovementNote::new(
                QualityAxis::Completeness,
                lead_section(plan),
                format!("does not mention changed paths: {}", unmentioned.join(", ")),
            ));
        }

        clamp_unit(SECTION_SHARE * section_part + MENTION_SHARE * mention_part)
    }

    fn consistency(
        &self,
        plan: &UpdatePlan,
        doc: &MarkdownDocument,
        event: &ChangeEvent,
        notes: &mut Vec<ImprovementNote>,
    ) -> f64 {
        let originals = plan.preserved_sections();
        let mut score = if originals.is_empty() {
            1.0
        } else {
            let total: f64 = originals
                .iter()
                .map(|original| self.preserved_score(plan.strategy, original, doc, notes))
                .sum();
            total / originals.len() as f64
        };

        if plan.perspective() != Perspective::DecisionHistory {
            let regenerated: String = plan
                .regenerate
                .iter()
                .filter_map(|r| find_section(doc, r))
                .map(|s| s.text())
                .collect::<Vec<_>>()
                .join("\n");
            let words = tokens(&regenerated);
            for file in event.paths.iter().filter(|p| p.status == FileStatus::Deleted) {
                if is_prose(&file.path) {
                    continue;
                }
                if let Some(name) = module_name(&file.path)
                    && words.contains(&name)
                {
                    score -= STALE_MENTION_PENALTY;
                    notes.push(ImprovementNote::new(
                        QualityAxis::Consistency,
                        lead_section(plan),
                        format!("still describes removed {}", file.path),
                    ));
                }
            }
        }

        clamp_unit(score)
    }

    fn preserved_score(
        &self,
        strategy: UpdateStrategy,
        original: &Section,
        doc: &MarkdownDocument,
        notes: &mut Vec<ImprovementNote>,
    ) -> f64 {
        let label = section_label(original);
        let generated_text = if original.slug == PREAMBLE_SLUG {
            // Lead text may move under a new title heading
            Some(doc.to_markdown())
        } else {
            doc.section(&original.slug).map(Section::text)
        };
        let Some(generated) = generated_text else {
            notes.push(ImprovementNote::new(
                QualityAxis::Consistency,
                label,
                "preserved section was removed",
            ));
            return 0.0;
        };

        let before = original.text();
        match strategy {
            UpdateStrategy::Update if original.slug != PREAMBLE_SLUG => {
                if normalize_whitespace(&before) == normalize_whitespace(&generated) {
                    return 1.0;
                }
                let sim = similarity(&before, &generated);
                notes.push(ImprovementNote::new(
                    QualityAxis::Consistency,
                    label,
                    format!("preserved section was rewritten (similarity {:.2})", sim),
                ));
                sim
            }
            _ => {
                let kept = retention(&before, &generated);
                if kept >= self.config.merge_retention {
                    return 1.0;
                }
                notes.push(ImprovementNote::new(
                    QualityAxis::Consistency,
                    label,
                    format!(
                        "preserved content lost (kept {:.0}% of its words)",
                        kept * 100.0
                    ),
                ));
                kept
            }
        }
    }
}

/// Add a note for every failing axis that has none
fn ensure_failure_notes(report: &mut QualityReport, threshold: f64, section: &str) {
    let noted: HashSet<QualityAxis> = report.notes.iter().map(|n| n.axis).collect();
    for axis in report.failing_axes(threshold) {
        if noted.contains(&axis) {
            continue;
        }
        let score = match axis {
            QualityAxis::Structural => report.structural,
            QualityAxis::Completeness => report.completeness,
            QualityAxis::Consistency => report.consistency,
        };
        report.notes.push(ImprovementNote::new(
            axis,
            section,
            format!("{} score {:.2} is below {:.2}", axis, score, threshold),
        ));
    }
}

fn lead_section(plan: &UpdatePlan) -> &str {
    plan.regenerate
        .first()
        .map(|r| r.heading.as_str())
        .unwrap_or(DOCUMENT_SCOPE)
}

fn section_label(section: &Section) -> &str {
    if section.heading.is_empty() {
        "Lead text"
    } else {
        &section.heading
    }
}

/// Top-level headings are titles: any level-1 heading satisfies one
fn find_section<'a>(doc: &'a MarkdownDocument, r: &SectionRef) -> Option<&'a Section> {
    doc.section(&r.slug).or_else(|| {
        (r.level == 1)
            .then(|| doc.sections.iter().find(|s| s.level == 1))
            .flatten()
    })
}

fn has_section(doc: &MarkdownDocument, r: &SectionRef) -> bool {
    find_section(doc, r).is_some()
}

fn placeholder(section: &Section) -> Option<&'static str> {
    let text = section.text().to_lowercase();
    PLACEHOLDER_MARKERS
        .iter()
        .find(|m| text.contains(&m.to_lowercase()))
        .copied()
}

fn is_prose(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PROSE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Words that count as mentioning a path: its module name and parent dir
fn names_for(path: &str) -> Vec<String> {
    let mut names: Vec<String> = module_name(path).into_iter().collect();
    if let Some(parent) = Path::new(path)
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
    {
        names.push(parent.to_lowercase());
    }
    names
}
