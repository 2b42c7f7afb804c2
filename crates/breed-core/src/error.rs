//! Error types for the pet breed dataset pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the dataset pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or probing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Dataset error (empty dataset, missing classes, ...)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(String),

    /// Label map is inconsistent or does not cover a value
    #[error("Label map error: {0}")]
    LabelMap(String),

    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Path not found
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err.to_string())
    }
}

/// Specialized Result type for dataset pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Dataset("no valid images".to_string());
        assert_eq!(err.to_string(), "Dataset error: no valid images");
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::NotFound(PathBuf::from("data/pet_breeds"));
        assert_eq!(err.to_string(), "Not found: data/pet_breeds");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
