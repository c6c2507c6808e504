use console::style;

use crate::orchestration::PlanReport;
use crate::types::{OrchestrationResult, Outcome, PerspectiveDecision};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn decisions(&self, decisions: &[PerspectiveDecision]) {
        self.section("Perspectives");
        for d in decisions {
            let mark = if d.triggered {
                style("●").green()
            } else {
                style("○").dim()
            };
            println!(
                "  {} {:<17} {:.2}  {}",
                mark,
                d.perspective.to_string(),
                d.confidence,
                style(&d.reason).dim()
            );
        }
    }

    pub fn plan_report(&self, report: &PlanReport) {
        self.header(&format!("Plan for change {}", report.change.id));
        println!(
            "  {} path(s), {} change, {} repository",
            report.change.paths.len(),
            report.change.kind,
            report.snapshot.size_class
        );
        self.decisions(&report.decisions);

        if report.plans.is_empty() && report.failures.is_empty() {
            self.info("No documentation affected");
            return;
        }

        self.section("Targets");
        for plan in &report.plans {
            println!(
                "  {} {} ({})",
                style(plan.strategy.to_string()).cyan().bold(),
                plan.path(),
                plan.perspective()
            );
            let list = |refs: &[crate::types::SectionRef]| {
                refs.iter()
                    .map(|r| if r.heading.is_empty() { "Lead text" } else { r.heading.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            if !plan.regenerate.is_empty() {
                println!("      regenerate: {}", list(&plan.regenerate));
            }
            if !plan.preserve.is_empty() {
                println!("      preserve:   {}", list(&plan.preserve));
            }
            println!("      {}", style(&plan.rationale).dim());
        }
        for failure in &report.failures {
            self.error(&format!(
                "{} ({}): {}",
                failure.path,
                failure.perspective,
                failure.reason.as_deref().unwrap_or_default()
            ));
        }
    }

    pub fn result(&self, result: &OrchestrationResult) {
        self.header(&format!("Run {}", result.run_id));
        if result.cancelled {
            self.warning("Run was cancelled");
        }
        self.decisions(&result.decisions);

        if result.is_noop() {
            self.info("No documentation affected");
            return;
        }

        self.section("Targets");
        for t in &result.targets {
            let label = format!(
                "{} [{}] {} attempt(s){}",
                t.path,
                t.perspective,
                t.attempts_used,
                t.report
                    .as_ref()
                    .map(|r| format!(", score {:.2}", r.aggregate))
                    .unwrap_or_default()
            );
            match t.outcome {
                Outcome::Accepted => self.success(&label),
                Outcome::Partial => self.warning(&format!("{} (partial)", label)),
                Outcome::Failed => self.error(&label),
            }
            if let Some(reason) = &t.reason {
                println!("      {}", style(reason).dim());
            }
        }

        self.section("Summary");
        println!(
            "  {} accepted, {} partial, {} failed",
            style(result.counts.accepted).green(),
            style(result.counts.partial).yellow(),
            style(result.counts.failed).red()
        );
        println!("{}", style(result.metrics.display()).dim());
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
