//! Policies and outcome types shared by readers and writers

use std::fmt;
use std::time::Duration;

/// Default timeout for blocking calls. Zero means "wait without deadline".
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::ZERO;

/// How a reader behaves when fewer bytes are available than requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderPolicy {
    /// A read of n bytes does not return until n bytes are available, or a timeout occurs
    Blocking,
    /// A read of n bytes returns immediately, whether n bytes were available or not
    NonBlocking,
}

/// Result state of a `read()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadStatus {
    /// The request was satisfied
    Ok,
    /// Fewer bytes than requested were available on a non-blocking read
    OkWouldBlock,
    /// Fewer bytes than requested were available when a blocking read timed out
    OkTimedOut,
    /// No more data will ever be returned by this reader
    Closed,
    /// The writer overwrote data this reader had not consumed yet
    ErrorOverrun,
    /// The request is smaller than one word of the underlying stream
    ErrorBytesLessThanWordSize,
    /// Unclassified failure; the reader is unusable
    ErrorInternal,
}

/// Coarse partition of read statuses, for callers deciding what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Bytes were delivered as requested
    Progress,
    /// Try again later
    RetryableEmpty,
    /// Stop reading; this is not an error
    TerminalBenign,
    /// Abandon the reader
    TerminalFatal,
}

impl ReadStatus {
    #[must_use]
    pub fn class(self) -> StatusClass {
        match self {
            ReadStatus::Ok => StatusClass::Progress,
            ReadStatus::OkWouldBlock | ReadStatus::OkTimedOut => StatusClass::RetryableEmpty,
            ReadStatus::Closed => StatusClass::TerminalBenign,
            ReadStatus::ErrorOverrun
            | ReadStatus::ErrorBytesLessThanWordSize
            | ReadStatus::ErrorInternal => StatusClass::TerminalFatal,
        }
    }

    /// True for the three `Ok*` statuses
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(
            self,
            ReadStatus::Ok | ReadStatus::OkWouldBlock | ReadStatus::OkTimedOut
        )
    }
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadStatus::Ok => "OK",
            ReadStatus::OkWouldBlock => "OK_WOULDBLOCK",
            ReadStatus::OkTimedOut => "OK_TIMEDOUT",
            ReadStatus::Closed => "CLOSED",
            ReadStatus::ErrorOverrun => "ERROR_OVERRUN",
            ReadStatus::ErrorBytesLessThanWordSize => "ERROR_BYTES_LESS_THAN_WORD_SIZE",
            ReadStatus::ErrorInternal => "ERROR_INTERNAL",
        };
        f.write_str(s)
    }
}

/// When `read()` stops returning data after `close()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClosePoint {
    /// Stop returning data right after the `close()` call
    Immediately,
    /// Stop once everything buffered at the time of `close()` has been read
    #[default]
    AfterDrainingCurrentBuffer,
}

/// Bytes copied by a read, together with the resulting status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    pub bytes: usize,
    pub status: ReadStatus,
}

impl ReadOutcome {
    #[must_use]
    pub fn new(bytes: usize, status: ReadStatus) -> Self {
        Self { bytes, status }
    }

    /// Outcome of a call that copied nothing
    #[must_use]
    pub fn empty(status: ReadStatus) -> Self {
        Self { bytes: 0, status }
    }
}

/// How a writer behaves when the buffer has no room for unread data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriterPolicy {
    /// Always write, overwriting the oldest data; lagging readers overrun
    #[default]
    Nonblockable,
    /// Write the whole payload, or nothing if it does not fit
    AllOrNothing,
    /// Wait for readers to free space, or a timeout
    Blocking,
}

/// Result state of a `write()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStatus {
    Ok,
    /// Not enough free space without overwriting unread data
    OkBufferFull,
    /// A blocking write ran out of time before writing everything
    OkTimedOut,
    Closed,
    ErrorBytesLessThanWordSize,
    ErrorInternal,
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteStatus::Ok => "OK",
            WriteStatus::OkBufferFull => "OK_BUFFER_FULL",
            WriteStatus::OkTimedOut => "OK_TIMEDOUT",
            WriteStatus::Closed => "CLOSED",
            WriteStatus::ErrorBytesLessThanWordSize => "ERROR_BYTES_LESS_THAN_WORD_SIZE",
            WriteStatus::ErrorInternal => "ERROR_INTERNAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub bytes: usize,
    pub status: WriteStatus,
}

impl WriteOutcome {
    #[must_use]
    pub fn new(bytes: usize, status: WriteStatus) -> Self {
        Self { bytes, status }
    }

    #[must_use]
    pub fn empty(status: WriteStatus) -> Self {
        Self { bytes: 0, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert_eq!(ReadStatus::Ok.class(), StatusClass::Progress);
        assert_eq!(ReadStatus::OkWouldBlock.class(), StatusClass::RetryableEmpty);
        assert_eq!(ReadStatus::OkTimedOut.class(), StatusClass::RetryableEmpty);
        assert_eq!(ReadStatus::Closed.class(), StatusClass::TerminalBenign);
        assert_eq!(ReadStatus::ErrorOverrun.class(), StatusClass::TerminalFatal);
        assert_eq!(
            ReadStatus::ErrorBytesLessThanWordSize.class(),
            StatusClass::TerminalFatal
        );
        assert_eq!(ReadStatus::ErrorInternal.class(), StatusClass::TerminalFatal);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ClosePoint::default(), ClosePoint::AfterDrainingCurrentBuffer);
        assert_eq!(WriterPolicy::default(), WriterPolicy::Nonblockable);
        assert_eq!(DEFAULT_READ_TIMEOUT, Duration::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(ReadStatus::OkWouldBlock.to_string(), "OK_WOULDBLOCK");
        assert_eq!(WriteStatus::OkBufferFull.to_string(), "OK_BUFFER_FULL");
    }
}
