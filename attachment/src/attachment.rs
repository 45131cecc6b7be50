//! In-process attachment: owns the shared stream and hands out handles
//!
//! Readers and the writer each hold an `Arc` to the stream, so the storage
//! lives as long as the last handle. A reader may outlive the writer and keep
//! draining what was written.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{AttachmentConfig, ReaderStart};
use crate::error::AttachmentError;
use crate::idgen::IdGen;
use crate::reader::InProcessReader;
use crate::stream::SharedStream;
use crate::types::{ReaderPolicy, WriterPolicy};
use crate::writer::InProcessWriter;

pub struct InProcessAttachment {
    id: String,
    config: AttachmentConfig,
    stream: Arc<SharedStream>,
    reader_ids: IdGen,
    writer_created: AtomicBool,
}

impl InProcessAttachment {
    /// Create an attachment backed by a ring sized by `config`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config does not validate.
    pub fn new(id: &str, config: AttachmentConfig) -> Result<Self, AttachmentError> {
        let stream = SharedStream::new(&config, id)?;
        log::debug!(
            "attachment {id}: created, capacity={}, word_size={}",
            config.capacity_bytes,
            config.word_size
        );
        Ok(Self {
            id: id.to_string(),
            config,
            stream: Arc::new(stream),
            reader_ids: IdGen::new(),
            writer_created: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn config(&self) -> &AttachmentConfig {
        &self.config
    }

    /// Whether the writer has closed the attachment
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stream.is_closed()
    }

    /// Number of live readers
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.stream.reader_count()
    }

    /// Create a reader starting at the oldest retained byte
    ///
    /// # Errors
    ///
    /// Returns `TooManyReaders` once the configured limit of live readers is reached.
    pub fn create_reader(&self, policy: ReaderPolicy) -> Result<InProcessReader, AttachmentError> {
        self.create_reader_at(policy, ReaderStart::default())
    }

    /// Create a reader starting at `start`
    ///
    /// # Errors
    ///
    /// Returns `TooManyReaders` once the configured limit of live readers is reached.
    pub fn create_reader_at(
        &self,
        policy: ReaderPolicy,
        start: ReaderStart,
    ) -> Result<InProcessReader, AttachmentError> {
        let reader_id = self.reader_ids.next_reader();
        self.stream.add_reader(reader_id, start)?;
        Ok(InProcessReader::new(
            reader_id,
            policy,
            Arc::clone(&self.stream),
        ))
    }

    /// Create the one writer of this attachment
    ///
    /// # Errors
    ///
    /// Returns `WriterAlreadyCreated` on any call after the first.
    pub fn create_writer(&self, policy: WriterPolicy) -> Result<InProcessWriter, AttachmentError> {
        if self.writer_created.swap(true, Ordering::AcqRel) {
            return Err(AttachmentError::WriterAlreadyCreated(self.id.clone()));
        }
        log::debug!("attachment {}: writer created, policy={policy:?}", self.id);
        Ok(InProcessWriter::new(policy, Arc::clone(&self.stream)))
    }
}

impl fmt::Debug for InProcessAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InProcessAttachment(id={}, writer_created={}, stream={:?})",
            self.id,
            self.writer_created.load(Ordering::Acquire),
            self.stream
        )
    }
}
