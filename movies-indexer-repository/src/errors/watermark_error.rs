//! Watermark store error types.

use thiserror::Error;

/// Errors from reading or writing persisted watermarks.
///
/// None of these are retried: the sync cannot proceed safely without a
/// trustworthy cursor.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Reading or writing the backing storage failed.
    #[error("Watermark storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The persisted state is not valid JSON.
    #[error("Watermark serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A persisted value exists but cannot be interpreted.
    #[error("Invalid watermark value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl WatermarkError {
    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
