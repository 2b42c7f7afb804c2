//! CSV split tables and prediction files.
//!
//! Split tables have the header `image,label,class_name`; prediction files
//! have `image,predicted` where `predicted` is a label index or a class name.

use std::fs;
use std::path::{Path, PathBuf};

use breed_core::{DataSplit, LabeledRow, PredictionRow, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

/// Location of a split table inside the splits directory
pub fn table_path(splits_dir: &Path, split: DataSplit) -> PathBuf {
    splits_dir.join(split.table_file_name())
}

/// Writes one split table, creating the parent directory if needed
pub fn write_table(path: &Path, rows: &[LabeledRow]) -> Result<()> {
    write_rows(path, rows)?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Reads a split table written by [`write_table`]
pub fn read_table(path: &Path) -> Result<Vec<LabeledRow>> {
    read_rows(path)
}

/// Reads a predictions file
pub fn read_predictions(path: &Path) -> Result<Vec<PredictionRow>> {
    read_rows(path)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(breed_core::Error::NotFound(path.to_path_buf()));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .from_path(path)?;

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()?;

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use breed_core::Error;
    use tempfile::TempDir;

    #[test]
    fn test_table_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let path = table_path(&temp_dir.path().join("splits"), DataSplit::Validation);
        let rows = vec![
            LabeledRow {
                image: PathBuf::from("data/pet_breeds/pug/1.jpg"),
                label: 1,
                class_name: "pug".to_string(),
            },
            LabeledRow {
                image: PathBuf::from("data/pet_breeds/beagle/a, b.jpg"),
                label: 0,
                class_name: "beagle".to_string(),
            },
        ];

        write_table(&path, &rows).unwrap();
        assert!(path.ends_with("splits/val_data.csv"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("image,label,class_name\n"));
        assert!(content.contains("data/pet_breeds/pug/1.jpg,1,pug"));

        assert_eq!(read_table(&path).unwrap(), rows);
    }

    #[test]
    fn test_read_predictions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("predictions.csv");
        fs::write(&path, "image,predicted\na.jpg, 2\nb.jpg,pug\n").unwrap();

        let predictions = read_predictions(&path).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].predicted, " 2");
        assert_eq!(predictions[1].image, PathBuf::from("b.jpg"));
    }

    #[test]
    fn test_paths_keep_surrounding_spaces() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test_data.csv");
        let rows = vec![LabeledRow {
            image: PathBuf::from("data/pug/ odd name .jpg"),
            label: 0,
            class_name: "pug".to_string(),
        }];

        write_table(&path, &rows).unwrap();
        assert_eq!(read_table(&path).unwrap(), rows);
    }

    #[test]
    fn test_read_missing_table() {
        let result = read_table(Path::new("/nonexistent/test_data.csv"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_read_malformed_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("train_data.csv");
        fs::write(&path, "image,label,class_name\na.jpg,not_a_number,pug\n").unwrap();

        assert!(matches!(read_table(&path), Err(Error::Csv(_))));
    }
}
