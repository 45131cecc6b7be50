//! Reading side of an attachment
//!
//! [`AttachmentReader`] is the caller-facing contract: `read` and `close`.
//! [`InProcessReader`] implements it over a [`SharedStream`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::idgen::ReaderId;
use crate::stream::SharedStream;
use crate::types::{ClosePoint, ReadOutcome, ReaderPolicy};

/// Pull interface over a streamed attachment
///
/// Outcomes are always returned as status values; implementations never
/// panic on closed, overrun or undersized requests.
pub trait AttachmentReader: Send + Sync {
    /// Copy up to `buf.len()` bytes into `buf`
    ///
    /// `timeout` applies to blocking readers only. `Duration::ZERO` waits
    /// without a deadline.
    ///
    /// Callers should look at `bytes` as well as `status`: `OkWouldBlock` and
    /// `OkTimedOut` may come with a partial copy. `Ok` means the whole request
    /// (rounded down to whole words) was copied. A blocking request larger than
    /// the attachment capacity cannot be satisfied at once; it returns as soon
    /// as a full ring is available, with `OkTimedOut`.
    fn read(&self, buf: &mut [u8], timeout: Duration) -> ReadOutcome;

    /// Stop reading at `close_point`
    ///
    /// Idempotent. Wakes a concurrent blocked `read` on the same reader.
    fn close(&self, close_point: ClosePoint);
}

/// Reader bound to one in-process shared stream
///
/// # Thread Safety
///
/// - All methods take `&self`. `close()` may be called from another thread
///   while a blocking `read()` is in progress; the read wakes up and reports
///   according to the close point.
/// - Concurrent `read()` calls on the same reader are serialized by the stream
///   mutex and consume from the same cursor.
/// - Separate readers never touch each other's cursor.
pub struct InProcessReader {
    id: ReaderId,
    policy: ReaderPolicy,
    stream: Arc<SharedStream>,
}

impl InProcessReader {
    pub(crate) fn new(id: ReaderId, policy: ReaderPolicy, stream: Arc<SharedStream>) -> Self {
        Self { id, policy, stream }
    }

    #[must_use]
    pub fn id(&self) -> ReaderId {
        self.id
    }

    #[must_use]
    pub fn policy(&self) -> ReaderPolicy {
        self.policy
    }

    /// Absolute position of the next byte this reader will return
    #[must_use]
    pub fn tell(&self) -> usize {
        self.stream.tell(self.id).unwrap_or_default()
    }

    /// Bytes that a read could return right now without waiting
    #[must_use]
    pub fn num_unread_bytes(&self) -> usize {
        self.stream.num_unread_bytes(self.id)
    }

    /// Reposition to absolute byte `offset`
    ///
    /// Returns false if the reader is closed or overrun, or if the offset is
    /// not word-aligned, not yet written, or already overwritten.
    pub fn seek(&self, offset: usize) -> bool {
        self.stream.seek(self.id, offset)
    }
}

impl AttachmentReader for InProcessReader {
    fn read(&self, buf: &mut [u8], timeout: Duration) -> ReadOutcome {
        self.stream.read(self.id, self.policy, buf, timeout)
    }

    fn close(&self, close_point: ClosePoint) {
        self.stream.close_reader(self.id, close_point);
    }
}

impl fmt::Debug for InProcessReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InProcessReader(id={}, policy={:?}, pos={:?}, stream={:?})",
            self.id,
            self.policy,
            self.stream.tell(self.id),
            self.stream
        )
    }
}

impl Drop for InProcessReader {
    fn drop(&mut self) {
        self.stream.remove_reader(self.id);
    }
}
