//! Evaluation metrics for a fitted classifier

use std::fmt;

use crate::genre::Genre;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub genre: Genre,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision, recall and F1 with macro and weighted averages
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub total: usize,
}

pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(a, b)| a == b).count();
    correct as f64 / truth.len() as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassificationReport {
    /// `classes[i]` names label `i`
    pub fn new(truth: &[usize], predicted: &[usize], classes: &[Genre]) -> Self {
        let metrics = classes
            .iter()
            .enumerate()
            .map(|(label, &genre)| {
                let pairs = truth.iter().zip(predicted);
                let tp = pairs.clone().filter(|&(&t, &p)| t == label && p == label).count();
                let predicted_pos = predicted.iter().filter(|&&p| p == label).count();
                let support = truth.iter().filter(|&&t| t == label).count();

                let precision = ratio(tp, predicted_pos);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    genre,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            classes: metrics,
            accuracy: accuracy(truth, predicted),
            total: truth.len(),
        }
    }

    /// Unweighted mean of (precision, recall, f1)
    pub fn macro_avg(&self) -> (f64, f64, f64) {
        let n = self.classes.len().max(1) as f64;
        let sum = |f: fn(&ClassMetrics) -> f64| self.classes.iter().map(f).sum::<f64>() / n;
        (sum(|m| m.precision), sum(|m| m.recall), sum(|m| m.f1))
    }

    /// Support-weighted mean of (precision, recall, f1)
    pub fn weighted_avg(&self) -> (f64, f64, f64) {
        let total = self.classes.iter().map(|m| m.support).sum::<usize>().max(1) as f64;
        let sum = |f: fn(&ClassMetrics) -> f64| {
            self.classes
                .iter()
                .map(|m| f(m) * m.support as f64)
                .sum::<f64>()
                / total
        };
        (sum(|m| m.precision), sum(|m| m.recall), sum(|m| m.f1))
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.genre.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        let (p, r, f1) = self.macro_avg();
        writeln!(
            f,
            "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "macro avg", p, r, f1, self.total
        )?;
        let (p, r, f1) = self.weighted_avg();
        write!(
            f,
            "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "weighted avg", p, r, f1, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 1, 2], &[0, 1, 2, 2]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_per_class_metrics() {
        let truth = [0, 0, 1, 1];
        let predicted = [0, 1, 1, 1];
        let report = ClassificationReport::new(&truth, &predicted, &[Genre::Blues, Genre::Jazz]);

        let blues = &report.classes[0];
        assert_eq!(blues.precision, 1.0);
        assert_eq!(blues.recall, 0.5);
        assert_eq!(blues.support, 2);

        let jazz = &report.classes[1];
        assert!((jazz.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(jazz.recall, 1.0);
        assert!((jazz.f1 - 0.8).abs() < 1e-12);
        assert_eq!(report.accuracy, 0.75);
    }

    #[test]
    fn test_unpredicted_class_has_zero_precision() {
        let report = ClassificationReport::new(&[0, 1], &[0, 0], &[Genre::Rock, Genre::Pop]);
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
    }

    #[test]
    fn test_display_lists_every_class() {
        let report = ClassificationReport::new(&[0, 1], &[0, 1], &[Genre::Metal, Genre::Pop]);
        let text = report.to_string();
        assert!(text.contains("metal"));
        assert!(text.contains("pop"));
        assert!(text.contains("weighted avg"));
    }
}
