//! Evaluation metrics for trained classifiers.

use serde::Serialize;

/// Binary confusion matrix at a fixed decision threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_positives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
    pub false_negatives: u64,
}

impl ConfusionMatrix {
    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Held-out performance of a classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub threshold: f64,
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Mean squared error of the probabilities
    pub brier_score: f64,
    /// Predicted probability histogram in buckets of 0.1
    pub score_distribution: [u64; 10],
}

impl EvaluationReport {
    /// Score predicted probabilities against binary labels.
    ///
    /// A sample is predicted positive when its probability is strictly above `threshold`.
    pub fn evaluate(probabilities: &[f64], labels: &[u8], threshold: f64) -> Self {
        let mut confusion = ConfusionMatrix::default();
        let mut score_distribution = [0u64; 10];
        let mut squared_error = 0.0;

        for (&p, &label) in probabilities.iter().zip(labels.iter()) {
            let actual = label == 1;
            match (p > threshold, actual) {
                (true, true) => confusion.true_positives += 1,
                (true, false) => confusion.false_positives += 1,
                (false, false) => confusion.true_negatives += 1,
                (false, true) => confusion.false_negatives += 1,
            }

            let target = if actual { 1.0 } else { 0.0 };
            squared_error += (p - target).powi(2);

            let bucket = ((p * 10.0).max(0.0) as usize).min(9);
            score_distribution[bucket] += 1;
        }

        let samples = confusion.total() as usize;
        let ratio = |num: u64, den: u64| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        let accuracy = ratio(
            confusion.true_positives + confusion.true_negatives,
            confusion.total(),
        );
        let precision = ratio(
            confusion.true_positives,
            confusion.true_positives + confusion.false_positives,
        );
        let recall = ratio(
            confusion.true_positives,
            confusion.true_positives + confusion.false_negatives,
        );
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let brier_score = if samples > 0 {
            squared_error / samples as f64
        } else {
            0.0
        };

        Self {
            samples,
            threshold,
            confusion,
            accuracy,
            precision,
            recall,
            f1,
            brier_score,
            score_distribution,
        }
    }

    /// Human-readable summary, one line per entry
    pub fn summary_lines(&self) -> Vec<String> {
        let c = &self.confusion;
        let mut lines = vec![
            "╔══════════════════════════════════════════════════════════════╗".to_string(),
            "║              HEART DISEASE MODEL - EVALUATION                ║".to_string(),
            "╠══════════════════════════════════════════════════════════════╣".to_string(),
            format!(
                "║ Samples: {:>6}   Threshold: {:>4.2}                            ║",
                self.samples, self.threshold
            ),
            format!(
                "║ Accuracy: {:>6.3}  Precision: {:>6.3}  Recall: {:>6.3}         ║",
                self.accuracy, self.precision, self.recall
            ),
            format!(
                "║ F1: {:>6.3}        Brier score: {:>6.4}                        ║",
                self.f1, self.brier_score
            ),
            "╠══════════════════════════════════════════════════════════════╣".to_string(),
            "║ Confusion Matrix:          predicted 0    predicted 1        ║".to_string(),
            format!(
                "║   actual 0              {:>10}     {:>10}        ║",
                c.true_negatives, c.false_positives
            ),
            format!(
                "║   actual 1              {:>10}     {:>10}        ║",
                c.false_negatives, c.true_positives
            ),
            "╠══════════════════════════════════════════════════════════════╣".to_string(),
            "║ Probability Distribution:                                    ║".to_string(),
        ];

        let total: u64 = self.score_distribution.iter().sum();
        for (i, &count) in self.score_distribution.iter().enumerate() {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let bar = "█".repeat(((pct / 2.0) as usize).min(20));
            lines.push(format!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            ));
        }
        lines.push(
            "╚══════════════════════════════════════════════════════════════╝".to_string(),
        );
        lines
    }

    /// Print the summary to stdout
    pub fn print_summary(&self) {
        for line in self.summary_lines() {
            println!("{line}");
        }
    }
}
