//! Core type definitions for the pet breed dataset pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Width and height of a validated image, in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDimensions {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageDimensions {
    /// Creates new image dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when both sides are at least `min` pixels
    pub fn meets_minimum(&self, min: u32) -> bool {
        self.width >= min && self.height >= min
    }
}

impl std::fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A validated image file and the class directory it was found in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRecord {
    /// Path to the image file, as discovered under the dataset root
    pub path: PathBuf,
    /// Class name (the immediate subdirectory of the dataset root)
    pub class_name: String,
    /// Dimensions observed during validation
    pub dimensions: Option<ImageDimensions>,
}

impl ImageRecord {
    /// Creates a record without dimension information
    pub fn new(path: impl Into<PathBuf>, class_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            class_name: class_name.into(),
            dimensions: None,
        }
    }

    /// Creates a record with the dimensions observed during validation
    pub fn with_dimensions(
        path: impl Into<PathBuf>,
        class_name: impl Into<String>,
        dimensions: ImageDimensions,
    ) -> Self {
        Self {
            path: path.into(),
            class_name: class_name.into(),
            dimensions: Some(dimensions),
        }
    }
}

/// Why a candidate file was left out of the dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RejectReason {
    /// The file could not be opened or decoded
    Unreadable(String),
    /// One side is below the configured minimum
    TooSmall(ImageDimensions),
    /// The path cannot be written to a split table
    NonUtf8Path,
}

impl RejectReason {
    /// Short category name used when counting rejections
    pub fn kind(&self) -> &'static str {
        match self {
            RejectReason::Unreadable(_) => "unreadable",
            RejectReason::TooSmall(_) => "too_small",
            RejectReason::NonUtf8Path => "non_utf8_path",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Unreadable(msg) => write!(f, "unreadable: {}", msg),
            RejectReason::TooSmall(dims) => write!(f, "too small: {}", dims),
            RejectReason::NonUtf8Path => write!(f, "path is not valid UTF-8"),
        }
    }
}

/// A candidate image file that failed validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectedImage {
    pub path: PathBuf,
    pub class_name: String,
    pub reason: RejectReason,
}

/// Data split type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSplit {
    /// Training data
    Train,
    /// Validation data
    Validation,
    /// Test data
    Test,
}

impl DataSplit {
    /// All splits in output order
    pub const ALL: [DataSplit; 3] = [DataSplit::Train, DataSplit::Validation, DataSplit::Test];

    /// File name of the split table (e.g. `val_data.csv`)
    pub fn table_file_name(&self) -> &'static str {
        match self {
            DataSplit::Train => "train_data.csv",
            DataSplit::Validation => "val_data.csv",
            DataSplit::Test => "test_data.csv",
        }
    }
}

impl std::fmt::Display for DataSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSplit::Train => write!(f, "train"),
            DataSplit::Validation => write!(f, "validation"),
            DataSplit::Test => write!(f, "test"),
        }
    }
}

/// One row of a split table: image path, encoded label and class name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabeledRow {
    pub image: PathBuf,
    pub label: usize,
    pub class_name: String,
}

/// One row of a predictions table produced by an external classifier.
///
/// `predicted` holds either an integer label index or a class name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictionRow {
    pub image: PathBuf,
    pub predicted: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_record() {
        let record = ImageRecord::new("beagle/img_001.jpg", "beagle");
        assert_eq!(record.class_name, "beagle");
        assert!(record.dimensions.is_none());

        let record = ImageRecord::with_dimensions("pug/a.png", "pug", ImageDimensions::new(64, 48));
        assert_eq!(record.dimensions, Some(ImageDimensions::new(64, 48)));
    }

    #[test]
    fn test_meets_minimum() {
        let dims = ImageDimensions::new(11, 300);
        assert!(dims.meets_minimum(11));
        assert!(!dims.meets_minimum(12));
    }

    #[test]
    fn test_data_split_display() {
        assert_eq!(DataSplit::Train.to_string(), "train");
        assert_eq!(DataSplit::Validation.to_string(), "validation");
        assert_eq!(DataSplit::Test.to_string(), "test");
    }

    #[test]
    fn test_table_file_names() {
        assert_eq!(DataSplit::Train.table_file_name(), "train_data.csv");
        assert_eq!(DataSplit::Validation.table_file_name(), "val_data.csv");
        assert_eq!(DataSplit::Test.table_file_name(), "test_data.csv");
    }

    #[test]
    fn test_reject_reason_display() {
        let reason = RejectReason::TooSmall(ImageDimensions::new(8, 8));
        assert_eq!(reason.to_string(), "too small: 8x8");
        assert_eq!(reason.kind(), "too_small");
    }
}
