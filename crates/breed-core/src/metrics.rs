//! Classification metrics for scoring predictions against a split table.
//!
//! - Accuracy
//! - Per-class precision, recall, F1 and support
//! - Macro and support-weighted averages
//! - Confusion matrix

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Evaluation metrics over a set of predictions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Unweighted mean of per-class precision over classes with support
    pub macro_precision: f64,

    pub macro_recall: f64,

    pub macro_f1: f64,

    /// Precision averaged with per-class support as weight
    pub weighted_precision: f64,

    pub weighted_recall: f64,

    pub weighted_f1: f64,

    /// Per-class metrics, indexed by label
    pub per_class: Vec<ClassMetrics>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Computes metrics from predicted and ground-truth label indices
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Result<Self> {
        if predictions.len() != ground_truth.len() {
            return Err(Error::InvalidArgument(format!(
                "Predictions ({}) and ground truth ({}) must have the same length",
                predictions.len(),
                ground_truth.len()
            )));
        }
        if let Some(bad) = predictions
            .iter()
            .chain(ground_truth.iter())
            .find(|&&label| label >= num_classes)
        {
            return Err(Error::InvalidArgument(format!(
                "Label {} is out of range for {} classes",
                bad, num_classes
            )));
        }

        let total_samples = predictions.len();
        if total_samples == 0 {
            return Ok(Self {
                confusion_matrix: ConfusionMatrix::new(num_classes),
                ..Self::default()
            });
        }

        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);
        let correct_predictions = confusion_matrix.correct();
        let accuracy = confusion_matrix.accuracy();

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|class_idx| ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx))
            .collect();

        let supported: Vec<&ClassMetrics> = per_class.iter().filter(|m| m.support > 0).collect();
        let num_supported = supported.len() as f64;
        let macro_avg = |f: fn(&ClassMetrics) -> f64| {
            if num_supported > 0.0 {
                supported.iter().map(|m| f(m)).sum::<f64>() / num_supported
            } else {
                0.0
            }
        };

        let total_support: usize = per_class.iter().map(|m| m.support).sum();
        let weighted_avg = |f: fn(&ClassMetrics) -> f64| {
            if total_support > 0 {
                per_class
                    .iter()
                    .map(|m| f(m) * m.support as f64)
                    .sum::<f64>()
                    / total_support as f64
            } else {
                0.0
            }
        };

        Ok(Self {
            total_samples,
            correct_predictions,
            accuracy,
            macro_precision: macro_avg(|m| m.precision),
            macro_recall: macro_avg(|m| m.recall),
            macro_f1: macro_avg(|m| m.f1),
            weighted_precision: weighted_avg(|m| m.precision),
            weighted_recall: weighted_avg(|m| m.recall),
            weighted_f1: weighted_avg(|m| m.f1),
            per_class,
            confusion_matrix,
        })
    }

    /// Attaches class names to the per-class entries
    pub fn with_class_names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for metrics in &mut self.per_class {
            if let Some(name) = names.get(metrics.class_idx) {
                metrics.class_name = Some(name.as_ref().to_string());
            }
        }
        self
    }

    /// Renders a per-class table with three decimal places.
    ///
    /// Layout follows the familiar `precision / recall / f1-score / support`
    /// report: one row per class, then accuracy, macro and weighted averages.
    pub fn classification_report(&self) -> String {
        let name_width = self
            .per_class
            .iter()
            .map(|m| m.display_name().len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        let mut out = String::new();
        out.push_str(&format!(
            "{:>width$} {:>9} {:>9} {:>9} {:>9}\n\n",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = name_width
        ));

        for m in &self.per_class {
            out.push_str(&format!(
                "{:>width$} {:>9.3} {:>9.3} {:>9.3} {:>9}\n",
                m.display_name(),
                m.precision,
                m.recall,
                m.f1,
                m.support,
                width = name_width
            ));
        }

        out.push('\n');
        out.push_str(&format!(
            "{:>width$} {:>9} {:>9} {:>9.3} {:>9}\n",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total_samples,
            width = name_width
        ));
        out.push_str(&format!(
            "{:>width$} {:>9.3} {:>9.3} {:>9.3} {:>9}\n",
            "macro avg",
            self.macro_precision,
            self.macro_recall,
            self.macro_f1,
            self.total_samples,
            width = name_width
        ));
        out.push_str(&format!(
            "{:>width$} {:>9.3} {:>9.3} {:>9.3} {:>9}\n",
            "weighted avg",
            self.weighted_precision,
            self.weighted_recall,
            self.weighted_f1,
            self.total_samples,
            width = name_width
        ));

        out
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Accuracy:             {:.4} ({:.2}%)", self.accuracy, self.accuracy * 100.0)?;
        writeln!(f, "Precision (weighted): {:.4}", self.weighted_precision)?;
        writeln!(f, "Recall (weighted):    {:.4}", self.weighted_recall)?;
        writeln!(f, "F1 Score (weighted):  {:.4}", self.weighted_f1)?;
        writeln!(f, "Macro F1:             {:.4}", self.macro_f1)?;
        write!(f, "Samples:              {}", self.total_samples)
    }
}

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    /// Class name (if available)
    pub class_name: Option<String>,

    pub true_positives: usize,

    pub false_positives: usize,

    pub false_negatives: usize,

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

        // Predicted as this class but actually another
        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        // Actually this class but predicted as another
        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let support = true_positives + false_negatives;

        let precision = if true_positives + false_positives > 0 {
            true_positives as f64 / (true_positives + false_positives) as f64
        } else {
            0.0
        };

        let recall = if support > 0 {
            true_positives as f64 / support as f64
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
            precision,
            recall,
            f1,
            support,
        }
    }

    /// Class name, or the index when no name is attached
    pub fn display_name(&self) -> String {
        self.class_name
            .clone()
            .unwrap_or_else(|| self.class_idx.to_string())
    }
}

/// Confusion matrix for multi-class classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Row = actual, column = predicted; flat, row-major
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

    /// Add a single prediction to the matrix; out-of-range labels are ignored
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

    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Diagonal sum
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Renders the matrix as CSV with class names as row and column headers
    pub fn to_csv<S: AsRef<str>>(&self, class_names: &[S]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        self.write_csv(&mut writer, class_names)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Csv(e.error().to_string()))?;
        String::from_utf8(bytes).map_err(|e| Error::Csv(e.to_string()))
    }

    /// Save confusion matrix to CSV
    pub fn save_csv<S: AsRef<str>>(&self, path: &std::path::Path, class_names: &[S]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        self.write_csv(&mut writer, class_names)?;
        writer.flush()?;
        Ok(())
    }

    fn write_csv<W: std::io::Write, S: AsRef<str>>(
        &self,
        writer: &mut csv::Writer<W>,
        class_names: &[S],
    ) -> Result<()> {
        let name = |idx: usize| {
            class_names
                .get(idx)
                .map(|s| s.as_ref().to_string())
                .unwrap_or_else(|| idx.to_string())
        };

        let mut header = vec!["actual\\predicted".to_string()];
        header.extend((0..self.num_classes).map(&name));
        writer.write_record(&header)?;

        for row in 0..self.num_classes {
            let mut record = vec![name(row)];
            record.extend((0..self.num_classes).map(|col| self.get(row, col).to_string()));
            writer.write_record(&record)?;
        }

        Ok(())
    }
}
