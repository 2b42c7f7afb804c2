//! End-to-end data preparation.
//!
//! Scans the dataset roots, drops unreadable and undersized images, removes
//! duplicate paths, builds the label map, splits the records and persists the
//! tables, the label map and the reports.

use std::collections::BTreeMap;
use std::path::PathBuf;

use breed_core::{DataSplit, Error, PipelineConfig, RejectedImage, Result};
use tracing::{debug, info, warn};

use crate::dedup::deduplicate;
use crate::label_map::LabelMap;
use crate::loader::ImageScanner;
use crate::report::{write_preprocessing_reports, PreprocessingSummary};
use crate::split::{DatasetSplitter, SplitTables};
use crate::statistics::DatasetStatistics;
use crate::table::{table_path, write_table};

/// Everything a preprocessing run produced
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub statistics: DatasetStatistics,
    pub label_map: LabelMap,
    pub tables: SplitTables,
    pub rejected: Vec<RejectedImage>,
    /// Split tables by split
    pub table_paths: BTreeMap<DataSplit, PathBuf>,
    pub label_map_path: PathBuf,
    pub report_paths: Vec<PathBuf>,
}

/// Runs the whole preparation flow described by `config`
pub fn run_preprocess(config: &PipelineConfig, show_progress: bool) -> Result<PreprocessOutput> {
    config.validate()?;

    info!("Step 1/5: Scanning {} dataset root(s)", config.paths.data_dirs.len());
    let scanner = ImageScanner::new(config.scan.clone())?.with_progress(show_progress);
    let outcome = scanner.scan(&config.paths.data_dirs)?;

    if outcome.records.is_empty() {
        let roots: Vec<String> = config
            .paths
            .data_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        return Err(Error::Dataset(format!(
            "No valid images found in {}",
            roots.join(", ")
        )));
    }
    info!(
        "  {} valid images, {} rejected ({:.1}% success)",
        outcome.records.len(),
        outcome.rejected.len(),
        outcome.success_rate() * 100.0
    );

    info!("Step 2/5: Removing duplicates");
    let (records, duplicates_removed) = deduplicate(outcome.records);
    info!("  Duplicates removed: {}", duplicates_removed);

    let statistics = DatasetStatistics::new(&records, duplicates_removed, &outcome.rejected);
    for (class_name, count) in &statistics.class_counts {
        debug!("  {}: {}", class_name, count);
    }
    if statistics.is_imbalanced() {
        warn!(
            "Class imbalance detected (ratio: {:.1})",
            statistics.imbalance_ratio
        );
    } else {
        info!("  Class distribution is relatively balanced");
    }

    info!("Step 3/5: Building label map");
    let label_map = LabelMap::from_records(&records);
    info!("  {} classes", label_map.len());

    info!("Step 4/5: Splitting (test_size={}, seed={})", config.split.test_size, config.seed);
    let splitter = DatasetSplitter::new(config.split, config.seed)?;
    let tables = splitter.split(&records)?;
    let split_summary = tables.summary();
    info!(
        "  train={}, validation={}, test={}",
        split_summary.train_size, split_summary.validation_size, split_summary.test_size
    );

    // Nothing is written until every table has been encoded.
    let encoded = tables.encode(&label_map)?;

    let label_map_path = config.label_map_path();
    label_map.save(&label_map_path)?;

    let mut table_paths = BTreeMap::new();
    for (split, rows) in encoded {
        let path = table_path(&config.paths.splits_dir, split);
        write_table(&path, &rows)?;
        table_paths.insert(split, path);
    }

    info!("Step 5/5: Writing reports");
    let summary = PreprocessingSummary::new(
        config.seed,
        &config.split,
        statistics.clone(),
        split_summary,
    );
    let report_paths = write_preprocessing_reports(&config.paths.outputs_dir, &summary)?;

    Ok(PreprocessOutput {
        statistics,
        label_map,
        tables,
        rejected: outcome.rejected,
        table_paths,
        label_map_path,
        report_paths,
    })
}
