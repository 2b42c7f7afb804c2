//! Dataset statistics computation.

use std::collections::BTreeMap;

use breed_core::{ImageRecord, RejectedImage};
use serde::{Deserialize, Serialize};

/// Ratio of largest to smallest class above which the dataset counts as imbalanced
pub const IMBALANCE_THRESHOLD: f64 = 3.0;

/// Statistics over the deduplicated set of valid images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub total_images: usize,
    pub num_classes: usize,
    pub duplicates_removed: usize,
    /// Rejected files by reason kind (`unreadable`, `too_small`)
    pub rejected: BTreeMap<String, usize>,
    pub class_counts: BTreeMap<String, usize>,
    pub min_class_size: usize,
    pub max_class_size: usize,
    pub mean_class_size: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_class_size: f64,
    pub imbalance_ratio: f64,
}

impl DatasetStatistics {
    pub fn new(records: &[ImageRecord], duplicates_removed: usize, rejected: &[RejectedImage]) -> Self {
        let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in records {
            *class_counts.entry(record.class_name.clone()).or_default() += 1;
        }

        let mut rejected_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for rejection in rejected {
            *rejected_by_kind
                .entry(rejection.reason.kind().to_string())
                .or_default() += 1;
        }

        let counts: Vec<usize> = class_counts.values().copied().collect();
        let min_class_size = counts.iter().copied().min().unwrap_or(0);
        let max_class_size = counts.iter().copied().max().unwrap_or(0);

        let (mean_class_size, std_class_size) = mean_and_sample_std(&counts);

        let imbalance_ratio = if min_class_size > 0 {
            max_class_size as f64 / min_class_size as f64
        } else {
            0.0
        };

        Self {
            total_images: records.len(),
            num_classes: class_counts.len(),
            duplicates_removed,
            rejected: rejected_by_kind,
            class_counts,
            min_class_size,
            max_class_size,
            mean_class_size,
            std_class_size,
            imbalance_ratio,
        }
    }

    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn is_imbalanced(&self) -> bool {
        self.imbalance_ratio > IMBALANCE_THRESHOLD
    }

    /// One line per class with a proportional bar, largest classes first
    pub fn distribution_lines(&self) -> Vec<String> {
        let mut sorted: Vec<(&String, &usize)> = self.class_counts.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let total = self.total_images.max(1) as f64;
        sorted
            .into_iter()
            .map(|(name, &count)| {
                let bar_len = (count as f64 / total * 40.0) as usize;
                format!(
                    "{:40} {:6} ({:5.1}%) {}",
                    name,
                    count,
                    100.0 * count as f64 / total,
                    "█".repeat(bar_len)
                )
            })
            .collect()
    }
}

impl std::fmt::Display for DatasetStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total images: {}", self.total_images)?;
        writeln!(f, "Number of categories: {}", self.num_classes)?;
        writeln!(f, "Duplicates removed: {}", self.duplicates_removed)?;
        writeln!(f, "Rejected files: {}", self.total_rejected())?;
        for (kind, count) in &self.rejected {
            writeln!(f, "  {}: {}", kind, count)?;
        }
        writeln!(f)?;
        writeln!(f, "Class Distribution Statistics:")?;
        writeln!(f, "  Min samples per class: {}", self.min_class_size)?;
        writeln!(f, "  Max samples per class: {}", self.max_class_size)?;
        writeln!(f, "  Mean samples per class: {:.1}", self.mean_class_size)?;
        writeln!(f, "  Std samples per class: {:.1}", self.std_class_size)?;
        write!(f, "  Imbalance ratio: {:.2}", self.imbalance_ratio)
    }
}

fn mean_and_sample_std(values: &[usize]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<usize>() as f64 / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }

    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / (n - 1.0);

    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use breed_core::{ImageDimensions, RejectReason};
    use std::path::PathBuf;

    fn records(class_sizes: &[(&str, usize)]) -> Vec<ImageRecord> {
        class_sizes
            .iter()
            .flat_map(|(class, size)| {
                (0..*size).map(move |i| ImageRecord::new(format!("{}/{}.jpg", class, i), *class))
            })
            .collect()
    }

    #[test]
    fn test_class_statistics() {
        let stats = DatasetStatistics::new(&records(&[("a", 10), ("b", 20), ("c", 30)]), 4, &[]);

        assert_eq!(stats.total_images, 60);
        assert_eq!(stats.num_classes, 3);
        assert_eq!(stats.duplicates_removed, 4);
        assert_eq!(stats.min_class_size, 10);
        assert_eq!(stats.max_class_size, 30);
        assert!((stats.mean_class_size - 20.0).abs() < 1e-9);
        assert!((stats.std_class_size - 10.0).abs() < 1e-9);
        assert!((stats.imbalance_ratio - 3.0).abs() < 1e-9);
        assert!(!stats.is_imbalanced());
    }

    #[test]
    fn test_imbalance_warning_threshold() {
        let stats = DatasetStatistics::new(&records(&[("a", 5), ("b", 16)]), 0, &[]);
        assert!(stats.is_imbalanced());
    }

    #[test]
    fn test_rejections_by_kind() {
        let rejected = vec![
            RejectedImage {
                path: PathBuf::from("a/1.jpg"),
                class_name: "a".to_string(),
                reason: RejectReason::TooSmall(ImageDimensions::new(4, 4)),
            },
            RejectedImage {
                path: PathBuf::from("a/2.jpg"),
                class_name: "a".to_string(),
                reason: RejectReason::Unreadable("bad header".to_string()),
            },
            RejectedImage {
                path: PathBuf::from("a/3.jpg"),
                class_name: "a".to_string(),
                reason: RejectReason::TooSmall(ImageDimensions::new(40, 2)),
            },
        ];
        let stats = DatasetStatistics::new(&records(&[("a", 3)]), 0, &rejected);

        assert_eq!(stats.total_rejected(), 3);
        assert_eq!(stats.rejected["too_small"], 2);
        assert_eq!(stats.rejected["unreadable"], 1);
    }

    #[test]
    fn test_single_class_has_zero_std() {
        let stats = DatasetStatistics::new(&records(&[("a", 7)]), 0, &[]);
        assert_eq!(stats.std_class_size, 0.0);
        assert!((stats.imbalance_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_lines_sorted_by_count() {
        let stats = DatasetStatistics::new(&records(&[("a", 1), ("b", 3)]), 0, &[]);
        let lines = stats.distribution_lines();
        assert!(lines[0].starts_with('b'));
        assert!(lines[1].starts_with('a'));
    }
}
