//! Metrics Module for Model Evaluation
//!
//! Provides the evaluation metrics reported for each split:
//! - Accuracy
//! - Weighted precision, recall, F1-score
//! - Confusion matrix
//! - Per-class classification report

use serde::{Deserialize, Serialize};

/// Comprehensive metrics for model evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Support-weighted precision
    pub weighted_precision: f64,

    /// Support-weighted recall
    pub weighted_recall: f64,

    /// Support-weighted F1-score
    pub weighted_f1: f64,

    /// Per-class metrics
    pub per_class: Vec<ClassMetrics>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Create new metrics from predictions and ground truth labels
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "Predictions and ground truth must have same length"
        );

        let total_samples = predictions.len();
        if total_samples == 0 {
            return Self::default();
        }

        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);

        let correct_predictions = predictions
            .iter()
            .zip(ground_truth.iter())
            .filter(|(p, g)| p == g)
            .count();

        let accuracy = correct_predictions as f64 / total_samples as f64;

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|class_idx| ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx))
            .collect();

        // Weighted averages: each class contributes proportionally to its support
        let total_support: usize = per_class.iter().map(|m| m.support).sum();
        let weighted = |value: fn(&ClassMetrics) -> f64| -> f64 {
            if total_support > 0 {
                per_class
                    .iter()
                    .map(|m| value(m) * m.support as f64)
                    .sum::<f64>()
                    / total_support as f64
            } else {
                0.0
            }
        };

        let weighted_precision = weighted(|m| m.precision);
        let weighted_recall = weighted(|m| m.recall);
        let weighted_f1 = weighted(|m| m.f1);

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            weighted_precision,
            weighted_recall,
            weighted_f1,
            per_class,
            confusion_matrix,
        }
    }

    /// Attach class names to the per-class metrics
    pub fn with_class_names(mut self, names: &[&str]) -> Self {
        for (metrics, name) in self.per_class.iter_mut().zip(names.iter()) {
            metrics.class_name = Some((*name).to_string());
        }
        self
    }

    /// Pretty print the headline metrics
    pub fn display(&self) -> String {
        let mut output = String::new();

        output.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str("║                    Evaluation Metrics                        ║\n");
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!("║ Accuracy:            {:6.2}%                                ║\n", self.accuracy * 100.0));
        output.push_str(&format!("║ Weighted Precision:  {:6.2}%                                ║\n", self.weighted_precision * 100.0));
        output.push_str(&format!("║ Weighted Recall:     {:6.2}%                                ║\n", self.weighted_recall * 100.0));
        output.push_str(&format!("║ Weighted F1:         {:6.2}%                                ║\n", self.weighted_f1 * 100.0));
        output.push_str(&format!("║ Total Samples:       {:6}                                  ║\n", self.total_samples));
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }

    /// Per-class classification report with precision/recall/F1/support rows
    pub fn classification_report(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{:>12} {:>10} {:>10} {:>10} {:>10}\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        output.push('\n');

        for class in &self.per_class {
            let name = class
                .class_name
                .clone()
                .unwrap_or_else(|| class.class_idx.to_string());
            output.push_str(&format!(
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
                name, class.precision, class.recall, class.f1, class.support
            ));
        }

        output.push('\n');
        output.push_str(&format!(
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}\n",
            "accuracy", "", "", self.accuracy, self.total_samples
        ));
        output.push_str(&format!(
            "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
            "weighted avg",
            self.weighted_precision,
            self.weighted_recall,
            self.weighted_f1,
            self.total_samples
        ));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            total_samples: 0,
            correct_predictions: 0,
            accuracy: 0.0,
            weighted_precision: 0.0,
            weighted_recall: 0.0,
            weighted_f1: 0.0,
            per_class: Vec::new(),
            confusion_matrix: ConfusionMatrix::default(),
        }
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    /// Class name (if available)
    pub class_name: Option<String>,

    /// True positives
    pub true_positives: usize,

    /// False positives
    pub false_positives: usize,

    /// False negatives
    pub false_negatives: usize,

    /// True negatives
    pub true_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Support = number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for a class from confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        // False positives: predicted as this class but actually other classes
        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        // False negatives: actually this class but predicted as other classes
        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let total: usize = cm.matrix.iter().sum();
        let true_negatives = total - true_positives - false_positives - false_negatives;

        let support = true_positives + false_negatives;

        let precision = if true_positives + false_positives > 0 {
            true_positives as f64 / (true_positives + false_positives) as f64
        } else {
            0.0
        };

        let recall = if true_positives + false_negatives > 0 {
            true_positives as f64 / (true_positives + false_negatives) as f64
        } else {
            0.0
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            class_name: None,
            true_positives,
            false_positives,
            false_negatives,
            true_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data (row = actual, column = predicted)
    /// Stored as a flat vector in row-major order
    pub matrix: Vec<usize>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);

        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }

        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            let idx = actual * self.num_classes + predicted;
            self.matrix[idx] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Get the total count
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Get the number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Get overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Pretty print the confusion matrix
    pub fn display(&self, class_names: Option<&[&str]>) -> String {
        let mut output = String::new();

        output.push_str("\nConfusion Matrix (rows=actual, cols=predicted):\n\n");

        // Column headers
        output.push_str("          ");
        for col in 0..self.num_classes {
            if let Some(names) = class_names {
                let name = names.get(col).unwrap_or(&"?");
                output.push_str(&format!("{:>9}", truncate_chars(name, 8)));
            } else {
                output.push_str(&format!("{:>9}", col));
            }
        }
        output.push('\n');

        // Rows
        for row in 0..self.num_classes {
            if let Some(names) = class_names {
                let name = names.get(row).unwrap_or(&"?");
                output.push_str(&format!("{:>8} ", truncate_chars(name, 8)));
            } else {
                output.push_str(&format!("{:>8} ", row));
            }

            for col in 0..self.num_classes {
                let count = self.get(row, col);
                if row == col {
                    output.push_str(&format!("  [{:>4}]", count));
                } else {
                    output.push_str(&format!("   {:>4} ", count));
                }
            }
            output.push('\n');
        }

        output.push_str(&format!("\nAccuracy: {:.2}%\n", self.accuracy() * 100.0));

        output
    }
}

/// Truncate a label to at most `max_chars` characters, respecting
/// character boundaries
fn truncate_chars(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(None))
    }
}

/// Running average for tracking loss during training
#[derive(Debug, Clone, Default)]
pub struct RunningAverage {
    sum: f64,
    count: usize,
}

impl RunningAverage {
    /// Create a new running average
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Get the current average
    pub fn average(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }

    /// Get the count
    pub fn count(&self) -> usize {
        self.count
    }

    /// Reset the running average
    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

/// Accuracy tracker for training
#[derive(Debug, Clone, Default)]
pub struct AccuracyTracker {
    correct: usize,
    total: usize,
}

impl AccuracyTracker {
    /// Create a new accuracy tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of predictions
    pub fn add_batch(&mut self, predictions: &[usize], ground_truth: &[usize]) {
        for (pred, gt) in predictions.iter().zip(ground_truth.iter()) {
            self.total += 1;
            if pred == gt {
                self.correct += 1;
            }
        }
    }

    /// Get the current accuracy
    pub fn accuracy(&self) -> f64 {
        if self.total > 0 {
            self.correct as f64 / self.total as f64
        } else {
            0.0
        }
    }

    /// Get the count
    pub fn count(&self) -> usize {
        self.total
    }

    /// Reset the tracker
    pub fn reset(&mut self) {
        self.correct = 0;
        self.total = 0;
    }
}
