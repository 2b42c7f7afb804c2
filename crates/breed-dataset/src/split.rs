//! Deterministic train/validation/test splitting.
//!
//! ## Split Strategy
//!
//! Two sequential hold-out stages with the same fraction:
//! 1. **Test set**: `ceil(test_size * n)` records are held out of the whole set
//! 2. **Validation set**: the same fraction is held out of what remains
//! 3. **Training set**: everything else
//!
//! In stratified mode each stage distributes its hold-out total across classes
//! by largest remainder, so every class keeps its proportion. Classes are
//! visited in sorted order and records are sorted by path before shuffling,
//! which makes the result a pure function of (records, fraction, seed).

use std::collections::BTreeMap;

use breed_core::{DataSplit, Error, ImageRecord, LabeledRow, Result, SplitConfig};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::label_map::LabelMap;

/// The three disjoint splits of a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitTables {
    pub train: Vec<ImageRecord>,
    pub validation: Vec<ImageRecord>,
    pub test: Vec<ImageRecord>,
}

impl SplitTables {
    /// Records of one split
    pub fn get(&self, split: DataSplit) -> &[ImageRecord] {
        match split {
            DataSplit::Train => &self.train,
            DataSplit::Validation => &self.validation,
            DataSplit::Test => &self.test,
        }
    }

    /// Total number of records across all splits
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    /// Iterates over `(split, record)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (DataSplit, &ImageRecord)> {
        DataSplit::ALL
            .into_iter()
            .flat_map(move |split| self.get(split).iter().map(move |r| (split, r)))
    }

    /// Encodes every split with the label map
    pub fn encode(&self, label_map: &LabelMap) -> Result<BTreeMap<DataSplit, Vec<LabeledRow>>> {
        DataSplit::ALL
            .into_iter()
            .map(|split| Ok((split, label_map.encode_rows(self.get(split))?)))
            .collect()
    }

    /// Split sizes and per-class counts
    pub fn summary(&self) -> SplitSummary {
        let mut summary = SplitSummary {
            train_size: self.train.len(),
            validation_size: self.validation.len(),
            test_size: self.test.len(),
            per_class: BTreeMap::new(),
        };

        for (split, record) in self.iter() {
            let counts = summary.per_class.entry(record.class_name.clone()).or_default();
            match split {
                DataSplit::Train => counts.train += 1,
                DataSplit::Validation => counts.validation += 1,
                DataSplit::Test => counts.test += 1,
            }
        }

        summary
    }
}

/// Per-class split counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSplitCounts {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// Statistics about dataset splits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub train_size: usize,
    pub validation_size: usize,
    pub test_size: usize,
    pub per_class: BTreeMap<String, ClassSplitCounts>,
}

impl SplitSummary {
    pub fn total(&self) -> usize {
        self.train_size + self.validation_size + self.test_size
    }
}

impl std::fmt::Display for SplitSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.total().max(1) as f64;
        writeln!(f, "Final Split Summary:")?;
        writeln!(
            f,
            "  Training set:   {:6} images ({:.1}%)",
            self.train_size,
            100.0 * self.train_size as f64 / total
        )?;
        writeln!(
            f,
            "  Validation set: {:6} images ({:.1}%)",
            self.validation_size,
            100.0 * self.validation_size as f64 / total
        )?;
        write!(
            f,
            "  Test set:       {:6} images ({:.1}%)",
            self.test_size,
            100.0 * self.test_size as f64 / total
        )
    }
}

/// Two-stage splitter with a fixed seed
#[derive(Debug, Clone)]
pub struct DatasetSplitter {
    config: SplitConfig,
    seed: u64,
}

impl DatasetSplitter {
    /// Creates a splitter; the fraction is validated up front
    pub fn new(config: SplitConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, seed })
    }

    /// Splits the records into train/validation/test
    pub fn split(&self, records: &[ImageRecord]) -> Result<SplitTables> {
        if records.is_empty() {
            return Err(Error::Dataset("No images provided for splitting".to_string()));
        }

        let (train_val, test) = self.hold_out(records.to_vec(), self.seed);
        let (train, validation) = self.hold_out(train_val, self.seed.wrapping_add(1));

        Ok(SplitTables {
            train,
            validation,
            test,
        })
    }

    /// One hold-out stage: returns (kept, held_out)
    fn hold_out(&self, records: Vec<ImageRecord>, seed: u64) -> (Vec<ImageRecord>, Vec<ImageRecord>) {
        let total = holdout_count(records.len(), self.config.test_size);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        if !self.config.stratified {
            let mut records = sorted_by_path(records);
            records.shuffle(&mut rng);
            let kept = records.split_off(total);
            return (kept, records);
        }

        let mut by_class: BTreeMap<String, Vec<ImageRecord>> = BTreeMap::new();
        for record in records {
            by_class.entry(record.class_name.clone()).or_default().push(record);
        }

        let sizes: Vec<usize> = by_class.values().map(Vec::len).collect();
        let quotas = allocate_largest_remainder(total, &sizes);

        let mut kept = Vec::new();
        let mut held_out = Vec::with_capacity(total);

        for ((_, class_records), quota) in by_class.into_iter().zip(quotas) {
            let mut class_records = sorted_by_path(class_records);
            class_records.shuffle(&mut rng);
            let rest = class_records.split_off(quota);
            held_out.extend(class_records);
            kept.extend(rest);
        }

        (kept, held_out)
    }
}

/// Number of items held out of `n`: `ceil(fraction * n)`, leaving at least one
pub fn holdout_count(n: usize, fraction: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let count = (fraction * n as f64).ceil() as usize;
    count.min(n - 1)
}

/// Distributes `total` across groups proportionally to `sizes`.
///
/// Each group gets the floor of its share; leftover units go to the largest
/// fractional parts, ties resolved by group order.
pub fn allocate_largest_remainder(total: usize, sizes: &[usize]) -> Vec<usize> {
    let n: usize = sizes.iter().sum();
    if n == 0 || total == 0 {
        return vec![0; sizes.len()];
    }

    let shares: Vec<f64> = sizes
        .iter()
        .map(|&size| total as f64 * size as f64 / n as f64)
        .collect();
    let mut quotas: Vec<usize> = shares
        .iter()
        .zip(sizes)
        .map(|(share, &size)| (share.floor() as usize).min(size))
        .collect();

    let assigned: usize = quotas.iter().sum();
    let mut leftover = total.saturating_sub(assigned);

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = shares[a] - shares[a].floor();
        let frac_b = shares[b] - shares[b].floor();
        frac_b.total_cmp(&frac_a)
    });

    // A second pass is only needed when float floors undershoot by more than
    // one unit per group.
    while leftover > 0 {
        let before = leftover;
        for &idx in &order {
            if leftover == 0 {
                break;
            }
            if quotas[idx] < sizes[idx] {
                quotas[idx] += 1;
                leftover -= 1;
            }
        }
        if leftover == before {
            break;
        }
    }

    quotas
}

fn sorted_by_path(mut records: Vec<ImageRecord>) -> Vec<ImageRecord> {
    records.sort_by(|a, b| a.path.cmp(&b.path));
    records
}
