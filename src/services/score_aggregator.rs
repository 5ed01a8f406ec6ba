//! Score Aggregator
//!
//! Turns a raw classifier probability distribution over primary and combined
//! dosha labels into three intensity percentages plus the dominant label.
//!
//! Each combined label (e.g. `vata+pitta`) contributes half of its mass to
//! each of its two primaries. Percentages are rounded independently and are
//! not normalized, so they need not sum to 100. The dominant label is the
//! classifier prediction itself, lower-cased; it is never re-derived from
//! the percentages.

use std::collections::HashMap;

use crate::error::Result;
use crate::models::dosha::{Dosha, DoshaScores, check_probabilities};
use crate::models::validation::{ValidationError, Violations};

/// Combined labels as emitted by the classifier, keyed by the primaries they mix
const COMBINED_LABELS: [(Dosha, Dosha, &str); 3] = [
    (Dosha::Vata, Dosha::Pitta, "vata+pitta"),
    (Dosha::Vata, Dosha::Kapha, "vata+kapha"),
    (Dosha::Pitta, Dosha::Kapha, "pitta+kapha"),
];

/// Case-insensitive view over the classifier's probability map.
///
/// Classifier output keys are loosely cased ("Vata", "vata+pitta"), so every
/// lookup goes through here. Missing labels read as 0. Callers reject maps
/// holding the same label in two cases, so at most one key matches.
struct LabelProbabilities<'a> {
    raw: &'a HashMap<String, f64>,
}

impl<'a> LabelProbabilities<'a> {
    fn new(raw: &'a HashMap<String, f64>) -> Self {
        Self { raw }
    }

    fn get(&self, label: &str) -> f64 {
        self.raw
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(label))
            .map(|(_, value)| *value)
            .unwrap_or(0.0)
    }

    /// Average of the two combined-label probabilities that include `dosha`
    fn combined_share(&self, dosha: Dosha) -> f64 {
        let total: f64 = COMBINED_LABELS
            .iter()
            .filter(|(a, b, _)| *a == dosha || *b == dosha)
            .map(|(_, _, label)| self.get(label))
            .sum();
        total / 2.0
    }

    fn percentage(&self, dosha: Dosha) -> u32 {
        let blended = self.get(dosha.as_str()) + self.combined_share(dosha);
        round_percent(blended)
    }
}

/// `x * 100` rounded with halves going up
fn round_percent(fraction: f64) -> u32 {
    (fraction * 100.0 + 0.5).floor().max(0.0) as u32
}

/// Aggregate classifier probabilities into dosha scores.
///
/// Fails with `InvalidInput` when the prediction is blank, any probability
/// is not a finite, non-negative number, or a label appears twice in
/// different cases.
pub fn aggregate(probabilities: &HashMap<String, f64>, prediction: &str) -> Result<DoshaScores> {
    let mut violations = Violations::new();
    if prediction.trim().is_empty() {
        violations.push(ValidationError::missing("prediction"));
    }
    for error in check_probabilities(probabilities) {
        violations.push(error);
    }
    violations.finish()?;

    let view = LabelProbabilities::new(probabilities);
    let scores = DoshaScores {
        vata: view.percentage(Dosha::Vata),
        pitta: view.percentage(Dosha::Pitta),
        kapha: view.percentage(Dosha::Kapha),
        dominant: prediction.to_lowercase(),
    };

    if !scores.agrees_with_prediction() {
        tracing::warn!(
            "Dominant label '{}' differs from highest score '{}' (vata={}, pitta={}, kapha={})",
            scores.dominant,
            scores.leading(),
            scores.vata,
            scores.pitta,
            scores.kapha
        );
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use rstest::rstest;

    fn probs(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_pitta_scenario() {
        let p = probs(&[
            ("Pitta", 0.6),
            ("Vata", 0.1),
            ("Kapha", 0.1),
            ("vata+pitta", 0.1),
            ("pitta+kapha", 0.1),
            ("vata+kapha", 0.0),
        ]);

        let scores = aggregate(&p, "Pitta").unwrap();
        assert_eq!(scores.pitta, 70);
        assert_eq!(scores.vata, 15);
        assert_eq!(scores.kapha, 15);
        assert_eq!(scores.dominant, "pitta");
    }

    #[test]
    fn test_labels_match_case_insensitively() {
        let lower = probs(&[("vata", 0.5), ("VATA+KAPHA", 0.4)]);
        let mixed = probs(&[("Vata", 0.5), ("Vata+Kapha", 0.4)]);

        let a = aggregate(&lower, "Vata").unwrap();
        let b = aggregate(&mixed, "Vata").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.vata, 70);
        assert_eq!(a.kapha, 20);
        assert_eq!(a.pitta, 0);
    }

    #[test]
    fn test_missing_and_unknown_labels_read_as_zero() {
        let p = probs(&[("Kapha", 0.9), ("earth", 0.7)]);
        let scores = aggregate(&p, "Kapha").unwrap();
        assert_eq!((scores.vata, scores.pitta, scores.kapha), (0, 0, 90));
    }

    #[test]
    fn test_dominant_is_prediction_not_highest_score() {
        let p = probs(&[("Vata", 0.2), ("Pitta", 0.7), ("Kapha", 0.1)]);
        let scores = aggregate(&p, "Vata+Pitta").unwrap();
        assert_eq!(scores.dominant, "vata+pitta");
        assert_eq!(scores.leading(), Dosha::Pitta);
    }

    #[test]
    fn test_scores_are_not_normalized() {
        let p = probs(&[("Vata", 0.5), ("Pitta", 0.5), ("vata+pitta", 0.5)]);
        let scores = aggregate(&p, "Vata").unwrap();
        assert_eq!((scores.vata, scores.pitta, scores.kapha), (75, 75, 0));
        assert_ne!(scores.vata + scores.pitta + scores.kapha, 100);
    }

    #[test]
    fn test_half_percent_rounds_up() {
        assert_eq!(round_percent(0.125), 13);
        assert_eq!(round_percent(0.0), 0);
        assert_eq!(round_percent(1.0), 100);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let p = probs(&[
            ("Vata", 0.33),
            ("Pitta", 0.27),
            ("Kapha", 0.1),
            ("vata+pitta", 0.15),
            ("pitta+kapha", 0.1),
            ("vata+kapha", 0.05),
        ]);
        let first = aggregate(&p, "Vata").unwrap();
        for _ in 0..10 {
            assert_eq!(aggregate(&p, "Vata").unwrap(), first);
        }
    }

    #[rstest]
    #[case::primaries_only(&[("Vata", 0.2), ("Pitta", 0.5), ("Kapha", 0.3)])]
    #[case::combined_only(&[("vata+pitta", 0.4), ("pitta+kapha", 0.35), ("vata+kapha", 0.25)])]
    #[case::single_primary(&[("Kapha", 1.0)])]
    #[case::single_combined(&[("pitta+kapha", 1.0)])]
    #[case::mixed(&[("Vata", 0.3), ("Pitta", 0.2), ("vata+kapha", 0.3), ("pitta+kapha", 0.2)])]
    fn test_realistic_distributions_stay_in_range(#[case] pairs: &[(&str, f64)]) {
        let scores = aggregate(&probs(pairs), "Pitta").unwrap();
        for value in [scores.vata, scores.pitta, scores.kapha] {
            assert!(value <= 100, "score {} out of range for {:?}", value, pairs);
        }
    }

    #[test]
    fn test_empty_prediction_rejected() {
        let err = aggregate(&probs(&[("Vata", 1.0)]), "  ").unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["prediction"]);
    }

    #[test]
    fn test_non_finite_probability_rejected() {
        let p = probs(&[("Vata", f64::NAN), ("Pitta", f64::INFINITY), ("Kapha", 0.2)]);
        match aggregate(&p, "Vata") {
            Err(AppError::InvalidInput(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field()).collect();
                assert_eq!(fields, vec!["probabilities.Pitta", "probabilities.Vata"]);
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_labels_differing_only_in_case_are_rejected() {
        for _ in 0..200 {
            let p = probs(&[("Vata", 0.1), ("vata", 0.9), ("Pitta", 0.2)]);
            match aggregate(&p, "Vata") {
                Err(AppError::InvalidInput(errors)) => {
                    let fields: Vec<&str> = errors.iter().map(|e| e.field()).collect();
                    assert_eq!(fields, vec!["probabilities.vata"]);
                }
                other => panic!("expected InvalidInput, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_negative_probability_rejected() {
        let p = probs(&[("Vata", -0.2)]);
        assert!(matches!(aggregate(&p, "Vata"), Err(AppError::InvalidInput(_))));
    }
}
