//! Writing side of an attachment

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::stream::SharedStream;
use crate::types::{WriteOutcome, WriterPolicy};

/// Push interface feeding an attachment
pub trait AttachmentWriter: Send + Sync {
    /// Append `data`; `timeout` is used by blocking writers only
    fn write(&self, data: &[u8], timeout: Duration) -> WriteOutcome;

    /// Close the attachment from the producer side
    ///
    /// Readers still drain what was written before reporting closed.
    fn close(&self);
}

/// Writer bound to one in-process shared stream
///
/// # Thread Safety
///
/// `InProcessWriter` is `Send + Sync`. Writes are serialized by the stream
/// mutex and readers are woken after the lock is released.
pub struct InProcessWriter {
    policy: WriterPolicy,
    stream: Arc<SharedStream>,
}

impl InProcessWriter {
    pub(crate) fn new(policy: WriterPolicy, stream: Arc<SharedStream>) -> Self {
        Self { policy, stream }
    }

    #[must_use]
    pub fn policy(&self) -> WriterPolicy {
        self.policy
    }

    /// Current position (bytes written)
    #[must_use]
    pub fn tell(&self) -> usize {
        self.stream.write_pos()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stream.is_closed()
    }
}

impl AttachmentWriter for InProcessWriter {
    fn write(&self, data: &[u8], timeout: Duration) -> WriteOutcome {
        self.stream.write(data, self.policy, timeout)
    }

    fn close(&self) {
        if !self.stream.close() {
            log::warn!("InProcessWriter::close() called on already closed writer: {self:?}");
        }
    }
}

impl fmt::Debug for InProcessWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InProcessWriter(policy={:?}, stream={:?})",
            self.policy, self.stream
        )
    }
}

impl Drop for InProcessWriter {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.close();
        }
    }
}
