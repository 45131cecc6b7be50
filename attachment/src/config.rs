//! Attachment configuration
//!
//! Loaded from JSON, with every field optional:
//!
//! ```
//! use attachment::AttachmentConfig;
//!
//! let config = AttachmentConfig::from_json_str(r#"{"capacity_bytes": 3200, "word_size": 2}"#).unwrap();
//! assert_eq!(config.capacity_bytes, 3200);
//! assert_eq!(config.max_readers, 8);
//! ```

use serde::Deserialize;

use crate::error::AttachmentError;

pub const DEFAULT_CAPACITY_BYTES: usize = 0x10_0000;
pub const DEFAULT_WORD_SIZE: usize = 1;
pub const DEFAULT_MAX_READERS: usize = 8;

/// Sizing of the shared stream behind an attachment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Ring capacity in bytes; must be a non-zero multiple of `word_size`
    pub capacity_bytes: usize,
    /// Smallest unit a read or write may request
    pub word_size: usize,
    /// Maximum number of live readers
    pub max_readers: usize,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            word_size: DEFAULT_WORD_SIZE,
            max_readers: DEFAULT_MAX_READERS,
        }
    }
}

impl AttachmentConfig {
    #[must_use]
    pub fn new(capacity_bytes: usize, word_size: usize, max_readers: usize) -> Self {
        Self {
            capacity_bytes,
            word_size,
            max_readers,
        }
    }

    /// Parse a config from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are inconsistent.
    pub fn from_json_str(json: &str) -> Result<Self, AttachmentError> {
        let config: AttachmentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config from an `embedded_io` reader until EOF
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - There are I/O errors reading from the provided reader
    /// - The JSON input is invalid or malformed
    /// - The values are inconsistent (see [`AttachmentConfig::validate`])
    pub fn from_reader(mut reader: impl embedded_io::Read) -> Result<Self, AttachmentError> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match embedded_io::Read::read(&mut reader, &mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(e) => return Err(AttachmentError::ConfigIo(format!("{e:?}"))),
            }
        }

        let config: AttachmentConfig = serde_json::from_slice(&buffer)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the shared stream relies on
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the word size or the reader limit is zero,
    /// or if the capacity is not a non-zero multiple of the word size.
    pub fn validate(&self) -> Result<(), AttachmentError> {
        if self.word_size == 0 {
            return Err(AttachmentError::InvalidConfig(
                "word_size must be non-zero".to_string(),
            ));
        }
        if self.capacity_bytes == 0 || self.capacity_bytes % self.word_size != 0 {
            return Err(AttachmentError::InvalidConfig(format!(
                "capacity_bytes ({}) must be a non-zero multiple of word_size ({})",
                self.capacity_bytes, self.word_size
            )));
        }
        if self.max_readers == 0 {
            return Err(AttachmentError::InvalidConfig(
                "max_readers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a newly created reader starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderStart {
    /// The oldest byte still retained in the ring
    #[default]
    Oldest,
    /// The current write position; only bytes written afterwards are seen
    NewData,
}
