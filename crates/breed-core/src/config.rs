//! Configuration structures for the dataset pipeline.
//!
//! Every section is defaulted, so a TOML file only has to name the values it
//! changes. The tool layers command-line flags on top of whatever is loaded.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Main configuration for a preprocessing run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Random seed for reproducible splits
    pub seed: u64,
    /// Input and output locations
    pub paths: PathsConfig,
    /// Image discovery and validation
    pub scan: ScanConfig,
    /// Train/validation/test split
    pub split: SplitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            paths: PathsConfig::default(),
            scan: ScanConfig::default(),
            split: SplitConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Checks every invariant the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.paths.data_dirs.is_empty() {
            return Err(Error::Config("At least one data directory is required".to_string()));
        }
        self.scan.validate()?;
        self.split.validate()?;
        Ok(())
    }

    /// Path of the persisted label map
    pub fn label_map_path(&self) -> PathBuf {
        self.paths.metadata_dir.join("label_map.json")
    }
}

/// Filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Dataset roots, each holding one subdirectory per class
    pub data_dirs: Vec<PathBuf>,
    /// Where the split tables are written
    pub splits_dir: PathBuf,
    /// Where the label map is written
    pub metadata_dir: PathBuf,
    /// Where the human-readable reports are written
    pub outputs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dirs: vec![PathBuf::from("data/pet_breeds")],
            splits_dir: PathBuf::from("data/splits"),
            metadata_dir: PathBuf::from("data/metadata"),
            outputs_dir: PathBuf::from("outputs"),
        }
    }
}

/// Image discovery and validation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Accepted file extensions, compared case-insensitively
    pub extensions: Vec<String>,
    /// Both sides of an image must be at least this many pixels
    pub min_dimension: u32,
    /// Decode the whole image instead of only probing the header
    pub verify_decode: bool,
    /// Ignore directories whose name starts with '.'
    pub skip_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
            min_dimension: 11,
            verify_decode: true,
            skip_hidden: true,
        }
    }
}

impl ScanConfig {
    /// Validates the scan settings
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(Error::Config("Extension list must not be empty".to_string()));
        }
        if self.min_dimension == 0 {
            return Err(Error::Config("min_dimension must be at least 1".to_string()));
        }
        Ok(())
    }

    /// True when `ext` is one of the accepted extensions
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Two-stage split settings.
///
/// `test_size` is held out first; the same fraction of the remainder then
/// becomes the validation set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction held out at each stage
    pub test_size: f64,
    /// Preserve class proportions in every split
    pub stratified: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            stratified: true,
        }
    }
}

impl SplitConfig {
    /// Validates that the fraction is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(Error::Config(format!(
                "test_size must be between 0.0 and 1.0 (exclusive), got {}",
                self.test_size
            )));
        }
        Ok(())
    }

    /// Expected share of the whole dataset that ends up in each split
    pub fn expected_fractions(&self) -> (f64, f64, f64) {
        let test = self.test_size;
        let val = (1.0 - test) * test;
        (1.0 - test - val, val, test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.split.test_size, 0.2);
        assert_eq!(config.scan.min_dimension, 11);
        assert!(config.validate().is_ok());
        assert_eq!(config.label_map_path(), PathBuf::from("data/metadata/label_map.json"));
    }

    #[test]
    fn test_split_config_validation() {
        assert!(SplitConfig { test_size: 0.0, stratified: true }.validate().is_err());
        assert!(SplitConfig { test_size: 1.0, stratified: true }.validate().is_err());
        assert!(SplitConfig { test_size: 0.3, stratified: false }.validate().is_ok());
    }

    #[test]
    fn test_expected_fractions() {
        let (train, val, test) = SplitConfig::default().expected_fractions();
        assert!((test - 0.2).abs() < 1e-9);
        assert!((val - 0.16).abs() < 1e-9);
        assert!((train - 0.64).abs() < 1e-9);
    }

    #[test]
    fn test_scan_config_validation() {
        let mut scan = ScanConfig::default();
        assert!(scan.accepts_extension("JPG"));
        assert!(!scan.accepts_extension("gif"));

        scan.min_dimension = 0;
        assert!(scan.validate().is_err());

        let scan = ScanConfig {
            extensions: Vec::new(),
            ..ScanConfig::default()
        };
        assert!(scan.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            seed = 7

            [split]
            test_size = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.split.test_size, 0.25);
        assert!(config.split.stratified);
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config: PipelineConfig =
            toml::from_str(include_str!("../../../configs/pipeline.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
