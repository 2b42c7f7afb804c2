//! Integer-to-class-name lookup shared by training and inference.
//!
//! Indices are contiguous from 0 and follow sorted class-name order. The same
//! map that encodes the split tables is the one written to disk, and loading
//! a map re-checks both properties.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use breed_core::{Error, ImageRecord, LabeledRow, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Sorted class names; the position of a name is its label index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<usize, String>", into = "BTreeMap<usize, String>")]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    /// Builds a map from any collection of class names (duplicates allowed)
    pub fn from_class_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    /// Builds a map from the class names that occur in `records`
    pub fn from_records(records: &[ImageRecord]) -> Self {
        Self::from_class_names(records.iter().map(|r| r.class_name.as_str()))
    }

    /// Builds a map from the folder names directly below `root`
    pub fn from_folders(root: &Path, skip_hidden: bool) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::NotFound(root.to_path_buf()));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping class directory with non UTF-8 name: {:?}", entry.path());
                continue;
            };
            if skip_hidden && name.starts_with('.') {
                continue;
            }
            names.push(name);
        }

        if names.is_empty() {
            return Err(Error::Dataset(format!(
                "No class folders found in {}",
                root.display()
            )));
        }

        Ok(Self::from_class_names(names))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class names in index order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Class name for a label index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Label index for a class name
    pub fn index(&self, name: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).ok()
    }

    /// Human-readable form of a class name (`golden_retriever` -> `Golden Retriever`)
    pub fn display_name(&self, index: usize) -> Option<String> {
        self.name(index).map(to_display_name)
    }

    /// Label index for a record's class, failing on unknown classes
    pub fn encode(&self, record: &ImageRecord) -> Result<usize> {
        self.index(&record.class_name).ok_or_else(|| {
            Error::LabelMap(format!(
                "Class '{}' of {} is not in the label map",
                record.class_name,
                record.path.display()
            ))
        })
    }

    /// Turns records into split-table rows; every path must be valid UTF-8
    pub fn encode_rows(&self, records: &[ImageRecord]) -> Result<Vec<LabeledRow>> {
        records
            .iter()
            .map(|record| {
                if record.path.to_str().is_none() {
                    return Err(Error::InvalidArgument(format!(
                        "Path is not valid UTF-8: {}",
                        record.path.display()
                    )));
                }
                Ok(LabeledRow {
                    image: record.path.clone(),
                    label: self.encode(record)?,
                    class_name: record.class_name.clone(),
                })
            })
            .collect()
    }

    /// Resolves a predicted value given either as an index or as a class name
    pub fn resolve(&self, value: &str) -> Result<usize> {
        let value = value.trim();
        if let Ok(index) = value.parse::<usize>() {
            if index < self.len() {
                return Ok(index);
            }
            return Err(Error::LabelMap(format!(
                "Label index {} is out of range for {} classes",
                index,
                self.len()
            )));
        }

        self.index(value)
            .ok_or_else(|| Error::LabelMap(format!("Unknown class '{}'", value)))
    }

    /// Checks that every row's label resolves to its class name
    pub fn check_rows(&self, rows: &[LabeledRow]) -> Result<()> {
        for row in rows {
            match self.name(row.label) {
                Some(name) if name == row.class_name => {}
                Some(name) => {
                    return Err(Error::LabelMap(format!(
                        "{}: label {} maps to '{}' but the row says '{}'",
                        row.image.display(),
                        row.label,
                        name,
                        row.class_name
                    )))
                }
                None => {
                    return Err(Error::LabelMap(format!(
                        "{}: label {} is out of range for {} classes",
                        row.image.display(),
                        row.label,
                        self.len()
                    )))
                }
            }
        }
        Ok(())
    }

    /// Writes the map as pretty JSON (`{"0": "abyssinian", ...}`)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Label map saved to: {}", path.display());
        Ok(())
    }

    /// Loads and validates a map written by [`LabelMap::save`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        let map = serde_json::from_str(&json)?;
        Ok(map)
    }
}

impl TryFrom<BTreeMap<usize, String>> for LabelMap {
    type Error = Error;

    fn try_from(map: BTreeMap<usize, String>) -> Result<Self> {
        let mut names = Vec::with_capacity(map.len());

        for (expected, (index, name)) in map.into_iter().enumerate() {
            if index != expected {
                return Err(Error::LabelMap(format!(
                    "Indices must be contiguous from 0; expected {} but found {}",
                    expected, index
                )));
            }
            if let Some(prev) = names.last() {
                if *prev >= name {
                    return Err(Error::LabelMap(format!(
                        "Class names must be unique and sorted; '{}' follows '{}'",
                        name, prev
                    )));
                }
            }
            names.push(name);
        }

        Ok(Self { names })
    }
}

impl From<LabelMap> for BTreeMap<usize, String> {
    fn from(map: LabelMap) -> Self {
        map.names.into_iter().enumerate().collect()
    }
}

impl std::fmt::Display for LabelMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, name) in self.names.iter().enumerate() {
            writeln!(f, "{:3}: {}", idx, name)?;
        }
        Ok(())
    }
}

fn to_display_name(name: &str) -> String {
    name.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
