//! `embedded_io` adapters over attachment readers and writers
//!
//! Lets code written against `embedded_io::Read`/`Write` consume or produce an
//! attachment. End of stream maps to `Ok(0)`; fatal statuses map to errors.

use std::fmt;
use std::time::Duration;

use embedded_io::ErrorType;

use crate::reader::AttachmentReader;
use crate::types::{ReadStatus, WriteStatus};
use crate::writer::AttachmentWriter;

/// Error type compatible with `embedded_io`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// Non-blocking reader had nothing to return
    WouldBlock,
    TimedOut,
    Overrun,
    /// Request smaller than one word
    InvalidInput,
    /// Writer side is closed
    BrokenPipe,
    BufferFull,
    Other,
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            IoError::WouldBlock => embedded_io::ErrorKind::Interrupted,
            IoError::TimedOut => embedded_io::ErrorKind::TimedOut,
            IoError::Overrun => embedded_io::ErrorKind::InvalidData,
            IoError::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            IoError::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            IoError::BufferFull => embedded_io::ErrorKind::OutOfMemory,
            IoError::Other => embedded_io::ErrorKind::Other,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::WouldBlock => write!(f, "would block"),
            IoError::TimedOut => write!(f, "timed out"),
            IoError::Overrun => write!(f, "reader overrun"),
            IoError::InvalidInput => write!(f, "request smaller than word size"),
            IoError::BrokenPipe => write!(f, "broken pipe"),
            IoError::BufferFull => write!(f, "buffer full"),
            IoError::Other => write!(f, "other error"),
        }
    }
}

impl std::error::Error for IoError {}

/// `embedded_io::Read` over any [`AttachmentReader`]
///
/// Each call performs one attachment read with the configured timeout and
/// returns as soon as some bytes were copied.
pub struct ReaderIo<R: AttachmentReader> {
    reader: R,
    timeout: Duration,
}

impl<R: AttachmentReader> ReaderIo<R> {
    #[must_use]
    pub fn new(reader: R, timeout: Duration) -> Self {
        Self { reader, timeout }
    }

    #[must_use]
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: AttachmentReader> ErrorType for ReaderIo<R> {
    type Error = IoError;
}

impl<R: AttachmentReader> embedded_io::Read for ReaderIo<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let outcome = self.reader.read(buf, self.timeout);
        match outcome.status {
            ReadStatus::Ok | ReadStatus::OkWouldBlock | ReadStatus::OkTimedOut
                if outcome.bytes > 0 =>
            {
                Ok(outcome.bytes)
            }
            ReadStatus::Ok => Ok(0),
            ReadStatus::OkWouldBlock => Err(IoError::WouldBlock),
            ReadStatus::OkTimedOut => Err(IoError::TimedOut),
            ReadStatus::Closed => Ok(0),
            ReadStatus::ErrorOverrun => Err(IoError::Overrun),
            ReadStatus::ErrorBytesLessThanWordSize => Err(IoError::InvalidInput),
            ReadStatus::ErrorInternal => Err(IoError::Other),
        }
    }
}

/// `embedded_io::Write` over any [`AttachmentWriter`]
pub struct WriterIo<W: AttachmentWriter> {
    writer: W,
    timeout: Duration,
}

impl<W: AttachmentWriter> WriterIo<W> {
    #[must_use]
    pub fn new(writer: W, timeout: Duration) -> Self {
        Self { writer, timeout }
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: AttachmentWriter> ErrorType for WriterIo<W> {
    type Error = IoError;
}

impl<W: AttachmentWriter> embedded_io::Write for WriterIo<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let outcome = self.writer.write(buf, self.timeout);
        match outcome.status {
            WriteStatus::Ok | WriteStatus::OkTimedOut if outcome.bytes > 0 => Ok(outcome.bytes),
            WriteStatus::Ok => Ok(0),
            WriteStatus::OkTimedOut => Err(IoError::TimedOut),
            WriteStatus::OkBufferFull => Err(IoError::BufferFull),
            WriteStatus::Closed => Err(IoError::BrokenPipe),
            WriteStatus::ErrorBytesLessThanWordSize => Err(IoError::InvalidInput),
            WriteStatus::ErrorInternal => Err(IoError::Other),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
