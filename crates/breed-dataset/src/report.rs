//! Human-readable and JSON reports written to the outputs directory.

use std::fs;
use std::path::{Path, PathBuf};

use breed_core::{Metrics, Result, SplitConfig};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;
use walkdir::WalkDir;

use crate::split::SplitSummary;
use crate::statistics::DatasetStatistics;

pub const SUMMARY_FILE: &str = "preprocessing_summary.txt";
pub const DISTRIBUTION_FILE: &str = "class_distribution.txt";
pub const SUMMARY_JSON_FILE: &str = "preprocessing_summary.json";
pub const CLASSIFICATION_REPORT_FILE: &str = "classification_report.txt";
pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.csv";
pub const ASSESSMENT_FILE: &str = "final_assessment.txt";

/// Machine-readable summary of a preprocessing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingSummary {
    pub generated_at: DateTime<Local>,
    pub seed: u64,
    pub test_size: f64,
    pub stratified: bool,
    /// Expected (train, validation, test) fractions of the whole dataset
    pub expected_fractions: (f64, f64, f64),
    pub statistics: DatasetStatistics,
    pub splits: SplitSummary,
}

impl PreprocessingSummary {
    pub fn new(
        seed: u64,
        split: &SplitConfig,
        statistics: DatasetStatistics,
        splits: SplitSummary,
    ) -> Self {
        Self {
            generated_at: Local::now(),
            seed,
            test_size: split.test_size,
            stratified: split.stratified,
            expected_fractions: split.expected_fractions(),
            statistics,
            splits,
        }
    }
}

/// Writes the dataset summary, the class distribution and the JSON summary
pub fn write_preprocessing_reports(
    outputs_dir: &Path,
    summary: &PreprocessingSummary,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(outputs_dir)?;

    let summary_path = outputs_dir.join(SUMMARY_FILE);
    fs::write(&summary_path, render_summary(summary))?;

    let distribution_path = outputs_dir.join(DISTRIBUTION_FILE);
    fs::write(&distribution_path, render_distribution(&summary.statistics))?;

    let json_path = outputs_dir.join(SUMMARY_JSON_FILE);
    fs::write(&json_path, serde_json::to_string_pretty(summary)?)?;

    info!("Reports written to {}", outputs_dir.display());
    Ok(vec![summary_path, distribution_path, json_path])
}

/// Plain-text dataset summary
pub fn render_summary(summary: &PreprocessingSummary) -> String {
    let stats = &summary.statistics;
    let mut out = String::new();

    out.push_str("DATASET SUMMARY\n");
    out.push_str("======================\n");
    out.push_str(&format!("Total images: {}\n", stats.total_images));
    out.push_str(&format!("Categories: {}\n", stats.num_classes));
    out.push_str(&format!("Duplicates removed: {}\n", stats.duplicates_removed));
    out.push_str(&format!("Rejected files: {}\n", stats.total_rejected()));
    out.push_str(&format!("Min samples/class: {}\n", stats.min_class_size));
    out.push_str(&format!("Max samples/class: {}\n", stats.max_class_size));
    out.push_str(&format!("Mean samples/class: {:.1}\n", stats.mean_class_size));
    out.push_str(&format!("Std samples/class: {:.1}\n", stats.std_class_size));
    out.push_str(&format!("Imbalance ratio: {:.1}\n", stats.imbalance_ratio));
    out.push('\n');
    out.push_str(&format!("{}\n", summary.splits));
    out.push_str(&format!("Seed: {}\n", summary.seed));
    out.push_str(&format!(
        "Generated: {}\n",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    out
}

/// Per-class counts with bars, largest class first
pub fn render_distribution(stats: &DatasetStatistics) -> String {
    let mut out = String::new();
    out.push_str("CLASS DISTRIBUTION\n");
    out.push_str("======================\n");
    for line in stats.distribution_lines() {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// File count and total size of a directory tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSize {
    pub file_count: usize,
    pub total_bytes: u64,
}

impl ModelSize {
    /// Walks `dir` and sums the sizes of all regular files
    pub fn measure(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(breed_core::Error::NotFound(dir.to_path_buf()));
        }

        let mut size = Self {
            file_count: 0,
            total_bytes: 0,
        };

        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| breed_core::Error::Io(e.into()))?;
            if entry.file_type().is_file() {
                size.file_count += 1;
                size.total_bytes += entry.metadata().map_err(|e| breed_core::Error::Io(e.into()))?.len();
            }
        }

        Ok(size)
    }

    pub fn megabytes(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn gigabytes(&self) -> f64 {
        self.megabytes() / 1024.0
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "MODEL SIZE ANALYSIS")?;
        writeln!(f, "{}", "=".repeat(25))?;
        writeln!(f, "Total files: {}", self.file_count)?;
        write!(
            f,
            "Model size: {:.2} MB ({:.2} GB)",
            self.megabytes(),
            self.gigabytes()
        )
    }
}

/// Writes the classification report, the confusion matrix and the final assessment
pub fn write_evaluation_reports(
    outputs_dir: &Path,
    metrics: &Metrics,
    class_names: &[String],
    model_size: Option<&ModelSize>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(outputs_dir)?;

    let report_path = outputs_dir.join(CLASSIFICATION_REPORT_FILE);
    let mut report = String::new();
    report.push_str("PET BREED CLASSIFICATION REPORT\n");
    report.push_str(&"=".repeat(50));
    report.push_str("\n\n");
    report.push_str(&metrics.classification_report());
    fs::write(&report_path, report)?;

    let matrix_path = outputs_dir.join(CONFUSION_MATRIX_FILE);
    metrics.confusion_matrix.save_csv(&matrix_path, class_names)?;

    let assessment_path = outputs_dir.join(ASSESSMENT_FILE);
    fs::write(&assessment_path, render_assessment(metrics, model_size))?;

    info!("Evaluation reports written to {}", outputs_dir.display());
    Ok(vec![report_path, matrix_path, assessment_path])
}

/// Headline metrics, optionally followed by the model size
pub fn render_assessment(metrics: &Metrics, model_size: Option<&ModelSize>) -> String {
    let mut out = String::new();
    out.push_str("FINAL MODEL ASSESSMENT\n");
    out.push_str(&"=".repeat(25));
    out.push_str("\n\n");
    out.push_str(&format!("{}\n", metrics));

    if let Some(size) = model_size {
        out.push('\n');
        out.push_str(&format!("{}\n", size));
    }

    out
}
