//! Errors for attachment construction and lifecycle
//!
//! Reads and writes never fail with these: their outcomes are status values
//! (see `crate::types`).

/// Error type for attachment lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Invalid attachment config: {0}")]
    InvalidConfig(String),

    #[error("Too many readers: limit is {0}")]
    TooManyReaders(usize),

    #[error("A writer was already created for attachment {0}")]
    WriterAlreadyCreated(String),

    #[error("Failed to parse attachment config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Failed to read attachment config: {0}")]
    ConfigIo(String),
}
