//! Error types for moov-core

use crate::model::ItemId;

/// Result type for moov-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in moov-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No record with this id exists in the store
    #[error("Item not found: {id}")]
    ItemNotFound { id: ItemId },

    /// The record has no file that could be moved, copied or deleted
    #[error("Item {id} is not a file attachment")]
    NotAFileAttachment { id: ItemId },

    /// The record store rejected an operation
    #[error("Record store error: {message}")]
    Store { message: String },

    /// A preference holds a value the engine cannot interpret
    #[error("Invalid preference {key}: {message}")]
    InvalidPreference { key: String, message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from moov-fs
    #[error(transparent)]
    Fs(#[from] moov_fs::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}
