//! Error types for the plane cache

use std::sync::Arc;

use thiserror::Error;

use crate::coord::PlaneCoord;

/// Invalid cache construction arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Invalid max entries: {value} (must be at least 1)")]
    InvalidMaxEntries { value: usize },

    #[error("Invalid image size: {value} (must be greater than 0)")]
    InvalidImageSize { value: usize },

    #[error("Memory budget of {budget} bytes cannot hold one image of {image_size} bytes")]
    BudgetTooSmall { budget: usize, image_size: usize },
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    pub fn invalid_max_entries(value: usize) -> Self {
        CacheError::InvalidMaxEntries { value }
    }

    pub fn invalid_image_size(value: usize) -> Self {
        CacheError::InvalidImageSize { value }
    }

    /// Every variant reports an invalid argument
    pub fn is_invalid_argument(&self) -> bool {
        true
    }
}

/// Failure of the pixel service while fetching a plane.
///
/// Cloneable so that every observer of a failed fetch sees the same error.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Pixel service unavailable: {0}")]
    Unavailable(String),

    #[error("Plane {coord} is outside the pixel stack")]
    OutOfRange { coord: PlaneCoord },

    #[error("Transport failure: {0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        TransportError::Unavailable(message.into())
    }

    /// Wrap an arbitrary error raised by a transport implementation
    pub fn other<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        TransportError::Other(Arc::new(error))
    }
}
