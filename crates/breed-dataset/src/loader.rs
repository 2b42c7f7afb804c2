//! Dataset discovery and image validation.
//!
//! The dataset root is expected to hold one subdirectory per class:
//!
//! ```text
//! data/pet_breeds/
//! ├── beagle/
//! │   ├── 0001.jpg
//! │   └── 0002.png
//! ├── persian_cat/
//! │   └── ...
//! └── ...
//! ```
//!
//! Files are collected from anywhere below a class directory. Each candidate
//! is opened and checked against the minimum size; failures are recorded as
//! rejections instead of aborting the scan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use breed_core::{
    Error, ImageDimensions, ImageRecord, RejectReason, RejectedImage, Result, ScanConfig,
};
use image::{GenericImageView, ImageReader};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A file that passed the extension filter and still needs validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub class_name: String,
}

/// Result of scanning one or more dataset roots
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Valid images in scan order (roots in order, classes sorted, paths sorted)
    pub records: Vec<ImageRecord>,
    /// Candidates that failed validation
    pub rejected: Vec<RejectedImage>,
    /// Every class directory seen, sorted and unique
    pub classes_seen: Vec<String>,
}

/// Valid/rejected counts for one class directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassScanSummary {
    pub class_name: String,
    pub valid: usize,
    pub rejected: usize,
}

impl ClassScanSummary {
    pub fn total(&self) -> usize {
        self.valid + self.rejected
    }
}

impl ScanOutcome {
    /// Number of candidates that were examined
    pub fn candidates(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    /// Share of candidates that passed validation
    pub fn success_rate(&self) -> f64 {
        let total = self.candidates();
        if total == 0 {
            0.0
        } else {
            self.records.len() as f64 / total as f64
        }
    }

    /// Per-class valid/rejected counts, including classes with no candidates
    pub fn class_summaries(&self) -> Vec<ClassScanSummary> {
        let mut counts: BTreeMap<&str, (usize, usize)> = self
            .classes_seen
            .iter()
            .map(|name| (name.as_str(), (0, 0)))
            .collect();

        for record in &self.records {
            counts.entry(record.class_name.as_str()).or_default().0 += 1;
        }
        for rejected in &self.rejected {
            counts.entry(rejected.class_name.as_str()).or_default().1 += 1;
        }

        counts
            .into_iter()
            .map(|(name, (valid, rejected))| ClassScanSummary {
                class_name: name.to_string(),
                valid,
                rejected,
            })
            .collect()
    }
}

/// Scans folder-per-class datasets and validates every image it finds
pub struct ImageScanner {
    config: ScanConfig,
    show_progress: bool,
}

impl ImageScanner {
    /// Creates a scanner; the configuration is validated up front
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            show_progress: false,
        })
    }

    /// Show a progress bar while validating
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Lists the class directories directly below `root`, sorted by name
    pub fn discover_classes(&self, root: &Path) -> Result<Vec<(String, PathBuf)>> {
        if !root.exists() {
            return Err(Error::NotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "Dataset root is not a directory: {}",
                root.display()
            )));
        }

        let mut classes = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping class directory with non UTF-8 name: {:?}", entry.path());
                continue;
            };

            if self.config.skip_hidden && name.starts_with('.') {
                debug!("Skipping hidden directory: {}", name);
                continue;
            }

            classes.push((name, entry.path()));
        }

        classes.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(classes)
    }

    /// Collects every file with an accepted extension below each class directory
    pub fn collect_candidates(&self, root: &Path) -> Result<(Vec<Candidate>, Vec<String>)> {
        let classes = self.discover_classes(root)?;
        let mut candidates = Vec::new();

        for (class_name, class_dir) in &classes {
            let before = candidates.len();

            for entry in WalkDir::new(class_dir)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !(self.config.skip_hidden && is_hidden(e.path())))
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Failed to read entry under {}: {}", class_dir.display(), e);
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                let accepted = entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| self.config.accepts_extension(ext))
                    .unwrap_or(false);

                if accepted {
                    candidates.push(Candidate {
                        path: entry.into_path(),
                        class_name: class_name.clone(),
                    });
                }
            }

            debug!(
                "Class '{}': {} candidate files",
                class_name,
                candidates.len() - before
            );
        }

        let names = classes.into_iter().map(|(name, _)| name).collect();
        Ok((candidates, names))
    }

    /// Scans all roots and validates every candidate.
    ///
    /// Validation runs in parallel; the output keeps the candidate order.
    pub fn scan(&self, roots: &[PathBuf]) -> Result<ScanOutcome> {
        let mut candidates = Vec::new();
        let mut classes_seen = Vec::new();

        for root in roots {
            info!("Scanning dataset root: {}", root.display());
            let (found, classes) = self.collect_candidates(root)?;
            info!("  {} classes, {} candidate files", classes.len(), found.len());
            candidates.extend(found);
            classes_seen.extend(classes);
        }

        classes_seen.sort();
        classes_seen.dedup();

        let progress = self.progress_bar(candidates.len());
        let verdicts: Vec<std::result::Result<ImageDimensions, RejectReason>> = candidates
            .par_iter()
            .map(|candidate| {
                let verdict = self.validate(&candidate.path);
                progress.inc(1);
                verdict
            })
            .collect();
        progress.finish_and_clear();

        let mut outcome = ScanOutcome {
            classes_seen,
            ..ScanOutcome::default()
        };

        for (candidate, verdict) in candidates.into_iter().zip(verdicts) {
            match verdict {
                Ok(dims) => outcome.records.push(ImageRecord::with_dimensions(
                    candidate.path,
                    candidate.class_name,
                    dims,
                )),
                Err(reason) => {
                    warn!("Skipping {} ({})", candidate.path.display(), reason);
                    outcome.rejected.push(RejectedImage {
                        path: candidate.path,
                        class_name: candidate.class_name,
                        reason,
                    });
                }
            }
        }

        for summary in outcome.class_summaries() {
            info!("{}: {} valid images", summary.class_name, summary.valid);
        }

        Ok(outcome)
    }

    /// Opens one image and checks it against the minimum size.
    ///
    /// Paths that are not valid UTF-8 are rejected without being opened.
    pub fn validate(&self, path: &Path) -> std::result::Result<ImageDimensions, RejectReason> {
        if path.to_str().is_none() {
            return Err(RejectReason::NonUtf8Path);
        }

        let dims = probe_image(path, self.config.verify_decode)
            .map_err(|e| RejectReason::Unreadable(e.to_string()))?;

        if dims.meets_minimum(self.config.min_dimension) {
            Ok(dims)
        } else {
            Err(RejectReason::TooSmall(dims))
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_message("validating");
        pb
    }
}

/// Reads the dimensions of an image, optionally decoding the pixel data
pub fn probe_image(path: &Path, verify_decode: bool) -> Result<ImageDimensions> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;

    let (width, height) = if verify_decode {
        reader.decode()?.dimensions()
    } else {
        reader.into_dimensions()?
    };

    Ok(ImageDimensions::new(width, height))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
