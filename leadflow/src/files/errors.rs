//! File storage error types.

use thiserror::Error;

/// File store errors
#[derive(Debug, Error)]
pub enum FileError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// Multipart request carried no file part
    #[error("No file uploaded")]
    NoFileProvided,

    /// Topic missing or empty after trimming
    #[error("Topic is required")]
    MissingTopic,

    /// File exceeds the upload cap
    #[error("File too large. Maximum size is 10MB.")]
    FileTooLarge,

    /// Extension or content type outside the allowlist
    #[error("Only images (JPEG, PNG), PDFs, Word documents, and text files are allowed")]
    UnsupportedType,

    /// Record absent from the store, or bytes missing from disk
    #[error("File not found")]
    NotFound,
}

impl FileError {
    /// Get a client-safe error message that doesn't leak storage internals.
    pub fn client_message(&self) -> String {
        match self {
            FileError::Database(_) | FileError::Io(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for file store operations
pub type FileResult<T> = Result<T, FileError>;
