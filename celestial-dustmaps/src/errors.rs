//! Error types for dust map queries and rendering.
//!
//! Every fallible operation in the crate returns [`DustMapResult<T>`]. Use the
//! constructor helpers ([`invalid_coordinate`](DustMapError::invalid_coordinate),
//! [`map_format`](DustMapError::map_format), etc.) for consistent messages.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type DustMapResult<T> = Result<T, DustMapError>;

#[derive(Debug, Error)]
pub enum DustMapError {
    #[error("Invalid coordinate: {message}")]
    InvalidCoordinate { message: String },

    #[error("Invalid distance: {message}")]
    InvalidDistance { message: String },

    #[error("Invalid grid: {message}")]
    InvalidGrid { message: String },

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Operation not supported: {message}")]
    UnsupportedOperation { message: String },

    #[error("Invalid map file: {message}")]
    MapFormat { message: String },

    #[error("Shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rendering was requested from a build without the `png` feature.
    #[error(
        "Image output requires PNG support. Rebuild celestial-dustmaps with the `png` feature \
         enabled (it is on by default; check for `default-features = false`)."
    )]
    ImageSupportMissing,

    #[error("Image encoding failed: {message}")]
    ImageEncoding { message: String },
}

impl DustMapError {
    pub fn invalid_coordinate(message: impl Into<String>) -> Self {
        Self::InvalidCoordinate {
            message: message.into(),
        }
    }

    pub fn invalid_distance(message: impl Into<String>) -> Self {
        Self::InvalidDistance {
            message: message.into(),
        }
    }

    pub fn invalid_grid(message: impl Into<String>) -> Self {
        Self::InvalidGrid {
            message: message.into(),
        }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub fn unsupported_operation(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }

    pub fn map_format(message: impl Into<String>) -> Self {
        Self::MapFormat {
            message: message.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(feature = "png")]
impl From<image::ImageError> for DustMapError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageEncoding {
            message: error.to_string(),
        }
    }
}
