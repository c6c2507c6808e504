//! Quality Aligner
//!
//! Reconciles the validator's score with the capability's self-reported
//! score. With both present the aggregate is the weighted blend (validator
//! weighted higher); a gap wider than the divergence threshold flags the
//! report `low_confidence` regardless of the blend.

use crate::config::AlignmentConfig;
use crate::types::{DOCUMENT_SCOPE, ImprovementNote, QualityAxis, QualityReport, clamp_unit};

pub struct QualityAligner {
    config: AlignmentConfig,
    threshold: f64,
}

/// Scores from here up are read as percentages; between 1.0 and here they clamp
const PERCENT_SCALE_FROM: f64 = 1.5;

pub fn normalize_score(score: f64) -> Option<f64> {
    if !score.is_finite() {
        return None;
    }
    let unit = if score >= PERCENT_SCALE_FROM {
        score / 100.0
    } else {
        score
    };
    Some(clamp_unit(unit))
}

impl QualityAligner {
    pub fn new(config: AlignmentConfig, threshold: f64) -> Self {
        Self { config, threshold }
    }

    /// Produce the authoritative report; the input report is left untouched
    pub fn align(&self, report: &QualityReport, capability_score: Option<f64>) -> QualityReport {
        let mut aligned = report.clone();
        let Some(capability) = capability_score.and_then(normalize_score) else {
            aligned.capability_score = None;
            aligned.aggregate = report.validator_score;
            aligned.passed = self.passes(&aligned);
            return aligned;
        };

        let validator = report.validator_score;
        let (vw, cw) = (self.config.validator_weight, self.config.capability_weight);
        let blended = if vw + cw > 0.0 {
            (vw * validator + cw * capability) / (vw + cw)
        } else {
            validator
        };

        aligned.capability_score = Some(capability);
        aligned.aggregate = clamp_unit(blended);
        aligned.passed = self.passes(&aligned);

        let gap = (validator - capability).abs();
        if gap > self.config.divergence_threshold {
            aligned.low_confidence = true;
            let (axis, _) = weakest_axis(report);
            let direction = if capability > validator {
                "overstates"
            } else {
                "understates"
            };
            aligned.notes.push(ImprovementNote::new(
                axis,
                section_for(report, axis),
                format!(
                    "self-reported score {:.2} {} the measured {:.2}; address the weakest axis ({})",
                    capability, direction, validator, axis
                ),
            ));
        }
        aligned
    }

    /// A blend never lifts a report over a breached axis floor
    fn passes(&self, report: &QualityReport) -> bool {
        report.aggregate >= self.threshold && !report.below_axis_floor()
    }
}

fn weakest_axis(report: &QualityReport) -> (QualityAxis, f64) {
    [
        (QualityAxis::Structural, report.structural),
        (QualityAxis::Completeness, report.completeness),
        (QualityAxis::Consistency, report.consistency),
    ]
    .into_iter()
    .fold((QualityAxis::Structural, f64::INFINITY), |min, cur| {
        if cur.1 < min.1 { cur } else { min }
    })
}

/// Section of the first existing note on `axis`, else document scope
fn section_for(report: &QualityReport, axis: QualityAxis) -> String {
    report
        .notes
        .iter()
        .find(|n| n.axis == axis)
        .map(|n| n.section.clone())
        .unwrap_or_else(|| DOCUMENT_SCOPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn report(validator_score: f64) -> QualityReport {
        QualityReport {
            attempt: 1,
            structural: validator_score,
            completeness: validator_score,
            consistency: validator_score,
            validator_score,
            capability_score: None,
            aggregate: validator_score,
            passed: validator_score >= 0.7,
            low_confidence: false,
            notes: Vec::new(),
        }
    }

    fn aligner() -> QualityAligner {
        QualityAligner::new(AlignmentConfig::default(), 0.7)
    }

    #[test]
    fn test_without_capability_score_validator_is_authoritative() {
        let aligned = aligner().align(&report(0.8), None);
        assert_eq!(aligned.aggregate, 0.8);
        assert!(aligned.passed);
        assert!(!aligned.low_confidence);
    }

    #[test]
    fn test_blend_within_divergence() {
        let aligned = aligner().align(&report(0.8), Some(0.9));
        assert!((aligned.aggregate - 0.83).abs() < 1e-9);
        assert!(!aligned.low_confidence);
        assert!(aligned.acceptable());
    }

    #[test]
    fn test_percentage_scores_are_normalized() {
        let aligned = aligner().align(&report(0.8), Some(90.0));
        assert_eq!(aligned.capability_score, Some(0.9));
        assert_eq!(normalize_score(f64::NAN), None);
        assert_eq!(normalize_score(-3.0), Some(0.0));
    }

    #[test]
    fn test_slightly_over_one_clamps_instead_of_scaling() {
        assert_eq!(normalize_score(1.02), Some(1.0));
        assert_eq!(normalize_score(1.49), Some(1.0));
        assert_eq!(normalize_score(75.0), Some(0.75));

        let aligned = aligner().align(&report(0.95), Some(1.02));
        assert_eq!(aligned.capability_score, Some(1.0));
        assert!(!aligned.low_confidence);
        assert!(aligned.acceptable());
    }

    #[test]
    fn test_blend_cannot_lift_a_breached_axis_floor() {
        let mut thin = report(0.9);
        thin.completeness = 0.3;
        let aligned = aligner().align(&thin, Some(0.9));
        assert!(aligned.aggregate >= 0.7);
        assert!(!aligned.passed);

        let aligned = aligner().align(&thin, None);
        assert!(!aligned.passed);
    }

    #[test]
    fn test_divergence_flags_even_when_passing() {
        let aligned = aligner().align(&report(0.95), Some(0.6));
        assert!(aligned.passed);
        assert!(aligned.low_confidence);
        assert!(!aligned.acceptable());
        assert!(aligned.notes.iter().any(|n| n.message.contains("understates")));

        let overconfident = aligner().align(&report(0.5), Some(1.0));
        assert!(overconfident.low_confidence);
        assert!(!overconfident.passed);
    }

    #[test]
    fn test_input_report_untouched() {
        let original = report(0.5);
        let _ = aligner().align(&original, Some(1.0));
        assert_eq!(original, report(0.5));
    }

    proptest! {
        #[test]
        fn prop_blending_rule(v in 0.0f64..=1.0, c in 0.0f64..=1.0) {
            let config = AlignmentConfig::default();
            let aligned = aligner().align(&report(v), Some(c));
            let expected = (config.validator_weight * v + config.capability_weight * c)
                / (config.validator_weight + config.capability_weight);

            prop_assert!((aligned.aggregate - expected).abs() < 1e-9);
            prop_assert_eq!(aligned.passed, aligned.aggregate >= 0.7 && v >= 0.5);
            prop_assert_eq!(
                aligned.low_confidence,
                (v - c).abs() > config.divergence_threshold
            );
        }
    }
}
