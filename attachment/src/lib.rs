//! Streamed attachments: one writer, many readers, bounded shared ring.
//!
//! A writer appends bytes (typically audio) while readers pull them at their
//! own pace. Readers choose blocking or non-blocking reads and can close
//! immediately or after draining what was buffered at close time.
//!
//! ```
//! use std::time::Duration;
//! use attachment::{
//!     AttachmentConfig, AttachmentReader, AttachmentWriter, InProcessAttachment, ReadStatus,
//!     ReaderPolicy, WriterPolicy,
//! };
//!
//! let attachment = InProcessAttachment::new("doc", AttachmentConfig::new(64, 1, 2)).unwrap();
//! let reader = attachment.create_reader(ReaderPolicy::NonBlocking).unwrap();
//! let writer = attachment.create_writer(WriterPolicy::Nonblockable).unwrap();
//!
//! writer.write(b"hello", Duration::ZERO);
//! let mut buf = [0u8; 8];
//! let outcome = reader.read(&mut buf, Duration::ZERO);
//! assert_eq!(outcome.bytes, 5);
//! assert_eq!(outcome.status, ReadStatus::OkWouldBlock);
//! ```

pub mod attachment;
pub mod config;
pub mod error;
pub mod idgen;
pub mod io_adapter;
pub mod reader;
pub mod stream;
pub mod types;
pub mod writer;

pub use attachment::InProcessAttachment;
pub use config::{AttachmentConfig, ReaderStart};
pub use error::AttachmentError;
pub use idgen::{IdGen, ReaderId};
pub use io_adapter::{IoError, ReaderIo, WriterIo};
pub use reader::{AttachmentReader, InProcessReader};
pub use stream::SharedStream;
pub use types::{
    ClosePoint, ReadOutcome, ReadStatus, ReaderPolicy, StatusClass, WriteOutcome, WriteStatus,
    WriterPolicy, DEFAULT_READ_TIMEOUT,
};
pub use writer::{AttachmentWriter, InProcessWriter};
