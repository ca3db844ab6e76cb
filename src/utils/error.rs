//! Error Handling Module
//!
//! Defines custom error types for the cataract classification library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for cataract pipeline operations
#[derive(Error, Debug)]
pub enum CataractError {
    /// Error loading or processing an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error during hyperparameter search
    #[error("Search error: {0}")]
    Search(String),

    /// Error with training or evaluation
    #[error("Training error: {0}")]
    Training(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Convenience Result type for cataract pipeline operations
pub type Result<T> = std::result::Result<T, CataractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CataractError::Dataset("test error".to_string());
        assert_eq!(format!("{}", err), "Dataset error: test error");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/image.jpg");
        let err = CataractError::ImageLoad(path, "file not found".to_string());
        assert!(format!("{}", err).contains("image.jpg"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CataractError = io.into();
        assert!(matches!(err, CataractError::Io(_)));
    }
}
