//! Scoring externally produced predictions against the test split table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use breed_core::{LabeledRow, Metrics, PredictionRow, Result};
use tracing::{info, warn};

use crate::label_map::LabelMap;

/// Metrics plus the rows that could not be joined
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: Metrics,
    /// Test images that have no prediction
    pub missing_predictions: Vec<PathBuf>,
    /// Predicted images that are not in the test table
    pub unknown_images: Vec<PathBuf>,
}

impl Evaluation {
    /// Share of test rows that received a prediction
    pub fn coverage(&self) -> f64 {
        let expected = self.metrics.total_samples + self.missing_predictions.len();
        if expected == 0 {
            0.0
        } else {
            self.metrics.total_samples as f64 / expected as f64
        }
    }
}

/// Joins predictions with the test table on the image path and computes metrics.
///
/// Test rows are first checked against the label map. A prediction that names
/// neither a known index nor a known class is an error; unmatched rows on
/// either side are logged and skipped. When an image is predicted twice the
/// first prediction counts.
pub fn score_predictions(
    test_rows: &[LabeledRow],
    predictions: &[PredictionRow],
    label_map: &LabelMap,
) -> Result<Evaluation> {
    label_map.check_rows(test_rows)?;

    let mut predicted: HashMap<&Path, usize> = HashMap::with_capacity(predictions.len());
    for prediction in predictions {
        let label = label_map.resolve(&prediction.predicted)?;
        if predicted.contains_key(prediction.image.as_path()) {
            warn!("Duplicate prediction for {}; keeping the first", prediction.image.display());
            continue;
        }
        predicted.insert(prediction.image.as_path(), label);
    }

    let mut y_pred = Vec::with_capacity(test_rows.len());
    let mut y_true = Vec::with_capacity(test_rows.len());
    let mut missing_predictions = Vec::new();

    for row in test_rows {
        match predicted.remove(row.image.as_path()) {
            Some(label) => {
                y_pred.push(label);
                y_true.push(row.label);
            }
            None => missing_predictions.push(row.image.clone()),
        }
    }

    let mut unknown_images: Vec<PathBuf> = predicted.into_keys().map(Path::to_path_buf).collect();
    unknown_images.sort();

    if !missing_predictions.is_empty() {
        warn!("{} test images have no prediction", missing_predictions.len());
    }
    for image in &unknown_images {
        warn!("Prediction for {} does not match any test image", image.display());
    }

    let metrics = Metrics::from_predictions(&y_pred, &y_true, label_map.len())?
        .with_class_names(label_map.names());

    info!(
        "Scored {} predictions: accuracy {:.2}%",
        metrics.total_samples,
        metrics.accuracy * 100.0
    );

    Ok(Evaluation {
        metrics,
        missing_predictions,
        unknown_images,
    })
}
