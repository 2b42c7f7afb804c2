//! Pet breed dataset preparation library.
//!
//! This crate turns a folder-per-class image collection into train, validation
//! and test tables: it discovers and validates images, removes duplicates,
//! builds the label map, splits the records reproducibly and writes reports.
//! It can also score an external classifier's predictions on the test table.

pub mod dedup;
pub mod evaluate;
pub mod label_map;
pub mod loader;
pub mod preprocess;
pub mod report;
pub mod split;
pub mod statistics;
pub mod table;

pub use dedup::deduplicate;
pub use evaluate::{score_predictions, Evaluation};
pub use label_map::LabelMap;
pub use loader::{probe_image, ClassScanSummary, ImageScanner, ScanOutcome};
pub use preprocess::{run_preprocess, PreprocessOutput};
pub use report::{ModelSize, PreprocessingSummary};
pub use split::{DatasetSplitter, SplitSummary, SplitTables};
pub use statistics::DatasetStatistics;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::evaluate::*;
    pub use crate::label_map::*;
    pub use crate::loader::*;
    pub use crate::preprocess::*;
    pub use crate::report::*;
    pub use crate::split::*;
    pub use crate::statistics::*;
    pub use crate::table::*;
}
