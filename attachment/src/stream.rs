//! Shared bounded stream behind an attachment
//!
//! Implements a broadcast-style ring where:
//! - One writer appends at a monotonic write cursor
//! - Multiple readers consume at their own cursors
//! - Coordination via condition variables (wait when no data or no space available)
//!
//! # Cursors
//!
//! All cursors are absolute byte offsets since the stream was created. The byte
//! at offset `p` lives at `p % capacity` in the ring. A reader whose cursor falls
//! more than `capacity` bytes behind the write cursor has lost data: it is
//! overrun, permanently.
//!
//! # Locking
//!
//! One mutex guards the write cursor, the closed flag and the reader table.
//! Bytes are copied in and out while holding it, so a reader never observes a
//! half-overwritten region. Waiting follows the "check - wait - check again"
//! loop: every wakeup re-inspects the whole state before deciding.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::{AttachmentConfig, ReaderStart};
use crate::error::AttachmentError;
use crate::idgen::ReaderId;
use crate::types::{
    ClosePoint, ReadOutcome, ReadStatus, ReaderPolicy, WriteOutcome, WriteStatus, WriterPolicy,
};

/// Close state of a single reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderClose {
    Open,
    /// Deliver data up to this absolute offset, then report closed
    Draining(usize),
    Closed,
}

/// Per-reader cursor slot
#[derive(Debug)]
struct ReaderCursor {
    pos: usize,
    close: ReaderClose,
    overrun: bool,
}

impl ReaderCursor {
    /// Whether this reader still pins unread data in the ring
    fn holds_data(&self) -> bool {
        if self.overrun {
            return false;
        }
        match self.close {
            ReaderClose::Open => true,
            ReaderClose::Draining(boundary) => self.pos < boundary,
            ReaderClose::Closed => false,
        }
    }
}

/// State guarded by the stream mutex
struct StreamState {
    ring: Vec<u8>,
    write_pos: usize,
    closed: bool,
    readers: HashMap<ReaderId, ReaderCursor>,
}

impl StreamState {
    /// Bytes the writer may add without overwriting data a live reader still needs
    fn free_space(&self, capacity: usize) -> usize {
        let oldest = self
            .readers
            .values()
            .filter(|cursor| cursor.holds_data())
            .map(|cursor| cursor.pos)
            .min();
        match oldest {
            Some(pos) => capacity.saturating_sub(self.write_pos.saturating_sub(pos)),
            None => capacity,
        }
    }

    /// Copy `len` bytes starting at absolute offset `pos` out of the ring
    fn copy_out(&self, pos: usize, dst: &mut [u8], len: usize) {
        let capacity = self.ring.len();
        let start = pos % capacity;
        let first = len.min(capacity - start);
        dst[..first].copy_from_slice(&self.ring[start..start + first]);
        if first < len {
            dst[first..len].copy_from_slice(&self.ring[..len - first]);
        }
    }

    /// Copy `src` into the ring at the write cursor and advance it
    fn copy_in(&mut self, src: &[u8]) {
        let capacity = self.ring.len();
        let start = self.write_pos % capacity;
        let first = src.len().min(capacity - start);
        self.ring[start..start + first].copy_from_slice(&src[..first]);
        if first < src.len() {
            self.ring[..src.len() - first].copy_from_slice(&src[first..]);
        }
        self.write_pos += src.len();
    }

    /// Flag every reader the writer has lapped
    fn flag_overruns(&mut self, capacity: usize) {
        let write_pos = self.write_pos;
        for (id, cursor) in &mut self.readers {
            if cursor.holds_data() && write_pos - cursor.pos > capacity {
                cursor.overrun = true;
                log::debug!(
                    "stream: {id} overrun (pos={}, write_pos={write_pos}, capacity={capacity})",
                    cursor.pos
                );
            }
        }
    }
}

/// What a read should do after inspecting the shared state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadAction {
    /// Return without copying
    Finish(ReadStatus),
    /// Data is available; `ended` means no more will ever arrive for this reader
    Copy { available: usize, ended: bool },
}

/// Shared ring state between the writer and the readers
///
/// # Thread Safety
///
/// All methods take `&self` and serialize on the internal `parking_lot::Mutex`.
/// Blocking reads and writes release the mutex while waiting on a `Condvar`.
/// The mutex is not reentrant; no callbacks are invoked while it is held.
pub struct SharedStream {
    state: Mutex<StreamState>,
    /// Signalled on writer progress, attachment close, reader close and overrun
    data_available: Condvar,
    /// Signalled on reader progress, reader removal and close
    space_available: Condvar,
    capacity: usize,
    word_size: usize,
    max_readers: usize,
    debug_hint: String,
}

impl SharedStream {
    /// Create a stream sized by `config`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config does not validate.
    pub fn new(config: &AttachmentConfig, debug_hint: &str) -> Result<Self, AttachmentError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(StreamState {
                ring: vec![0; config.capacity_bytes],
                write_pos: 0,
                closed: false,
                readers: HashMap::new(),
            }),
            data_available: Condvar::new(),
            space_available: Condvar::new(),
            capacity: config.capacity_bytes,
            word_size: config.word_size,
            max_readers: config.max_readers,
            debug_hint: debug_hint.to_string(),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn word_size(&self) -> usize {
        self.word_size
    }

    /// Absolute write cursor (bytes written so far)
    #[must_use]
    pub fn write_pos(&self) -> usize {
        self.state.lock().write_pos
    }

    /// Whether the writer side has closed the stream
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of registered reader slots
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers.len()
    }

    /// Oldest absolute offset still present in the ring
    #[must_use]
    pub fn oldest_retained(&self) -> usize {
        self.state.lock().write_pos.saturating_sub(self.capacity)
    }

    /// `None` for a zero timeout, or one too far out to represent
    fn deadline(timeout: Duration) -> Option<Instant> {
        if timeout.is_zero() {
            None
        } else {
            Instant::now().checked_add(timeout)
        }
    }

    /// Wait on `condvar`; returns true if the deadline passed
    fn wait(
        condvar: &Condvar,
        state: &mut MutexGuard<'_, StreamState>,
        deadline: Option<Instant>,
    ) -> bool {
        match deadline {
            None => {
                condvar.wait(state);
                false
            }
            Some(deadline) => condvar.wait_until(state, deadline).timed_out(),
        }
    }

    // ------------------------------------------------------------------
    // Reader side
    // ------------------------------------------------------------------

    /// Register a reader cursor
    ///
    /// # Errors
    ///
    /// Returns `TooManyReaders` if the reader limit has been reached.
    pub fn add_reader(&self, id: ReaderId, start: ReaderStart) -> Result<usize, AttachmentError> {
        let mut state = self.state.lock();
        if state.readers.len() >= self.max_readers {
            return Err(AttachmentError::TooManyReaders(self.max_readers));
        }
        let pos = match start {
            ReaderStart::Oldest => state.write_pos.saturating_sub(self.capacity),
            ReaderStart::NewData => state.write_pos,
        };
        state.readers.insert(
            id,
            ReaderCursor {
                pos,
                close: ReaderClose::Open,
                overrun: false,
            },
        );
        log::debug!(
            "stream {}: added {id} at pos={pos}, readers={}",
            self.debug_hint,
            state.readers.len()
        );
        Ok(pos)
    }

    /// Drop a reader cursor, freeing any space it pinned
    pub fn remove_reader(&self, id: ReaderId) {
        let removed = self.state.lock().readers.remove(&id);
        if removed.is_none() {
            log::warn!("stream {}: remove_reader: {id} not registered", self.debug_hint);
        }
        self.space_available.notify_all();
    }

    /// Inspect the reader's state and decide what `read` does next
    ///
    /// Priority order:
    /// 1. Overrun already flagged
    /// 2. Closed immediately
    /// 3. Drain boundary reached
    /// 4. Writer lapped the cursor (flags overrun)
    /// 5. Data available, or the stream ended
    fn check_reader(&self, state: &mut StreamState, id: ReaderId) -> ReadAction {
        let write_pos = state.write_pos;
        let writer_closed = state.closed;
        let Some(cursor) = state.readers.get_mut(&id) else {
            log::warn!("stream {}: read from unregistered {id}", self.debug_hint);
            return ReadAction::Finish(ReadStatus::ErrorInternal);
        };
        if cursor.pos > write_pos || cursor.pos % self.word_size != 0 {
            log::warn!(
                "stream {}: {id} cursor {} inconsistent with write_pos {write_pos}",
                self.debug_hint,
                cursor.pos
            );
            return ReadAction::Finish(ReadStatus::ErrorInternal);
        }

        if cursor.overrun {
            return ReadAction::Finish(ReadStatus::ErrorOverrun);
        }

        let (limit, ended) = match cursor.close {
            ReaderClose::Closed => return ReadAction::Finish(ReadStatus::Closed),
            ReaderClose::Draining(boundary) => {
                if cursor.pos >= boundary {
                    return ReadAction::Finish(ReadStatus::Closed);
                }
                (boundary, true)
            }
            ReaderClose::Open => (write_pos, writer_closed),
        };

        if write_pos - cursor.pos > self.capacity {
            cursor.overrun = true;
            log::debug!(
                "stream {}: {id} overrun detected on read (pos={}, write_pos={write_pos})",
                self.debug_hint,
                cursor.pos
            );
            return ReadAction::Finish(ReadStatus::ErrorOverrun);
        }

        let available = limit - cursor.pos;
        if available == 0 && ended {
            return ReadAction::Finish(ReadStatus::Closed);
        }
        ReadAction::Copy { available, ended }
    }

    /// Read into `buf` on behalf of reader `id`
    ///
    /// Only whole words are copied. `timeout` is ignored for non-blocking
    /// readers; for blocking readers zero means no deadline.
    pub fn read(
        &self,
        id: ReaderId,
        policy: ReaderPolicy,
        buf: &mut [u8],
        timeout: Duration,
    ) -> ReadOutcome {
        if buf.len() < self.word_size {
            return ReadOutcome::empty(ReadStatus::ErrorBytesLessThanWordSize);
        }
        let wanted = buf.len() - buf.len() % self.word_size;
        // A request larger than the ring can never be fully buffered at once;
        // a blocking read returns with a full ring and `OkTimedOut`
        let target = wanted.min(self.capacity);
        let deadline = Self::deadline(timeout);
        let mut timed_out = false;

        let mut state = self.state.lock();
        loop {
            let (available, ended) = match self.check_reader(&mut state, id) {
                ReadAction::Finish(status) => return ReadOutcome::empty(status),
                ReadAction::Copy { available, ended } => (available, ended),
            };

            let ready = available >= target;
            let give_up = match policy {
                ReaderPolicy::NonBlocking => true,
                ReaderPolicy::Blocking => timed_out,
            };
            if !(ready || ended || give_up) {
                timed_out = Self::wait(&self.data_available, &mut state, deadline);
                continue;
            }

            // Only a satisfied request is `Ok`; any short copy, including the
            // last bytes before `Closed`, keeps the policy's partial status
            let n = available.min(wanted);
            let status = if n == wanted {
                ReadStatus::Ok
            } else {
                match policy {
                    ReaderPolicy::NonBlocking => ReadStatus::OkWouldBlock,
                    ReaderPolicy::Blocking => ReadStatus::OkTimedOut,
                }
            };

            if n > 0 {
                let Some(pos) = state.readers.get(&id).map(|cursor| cursor.pos) else {
                    return ReadOutcome::empty(ReadStatus::ErrorInternal);
                };
                state.copy_out(pos, buf, n);
                if let Some(cursor) = state.readers.get_mut(&id) {
                    cursor.pos = pos + n;
                }
                drop(state);
                self.space_available.notify_all();
            }
            return ReadOutcome::new(n, status);
        }
    }

    /// Close reader `id` at the given point and wake anyone blocked on it
    pub fn close_reader(&self, id: ReaderId, close_point: ClosePoint) {
        {
            let mut state = self.state.lock();
            let write_pos = state.write_pos;
            let Some(cursor) = state.readers.get_mut(&id) else {
                log::warn!("stream {}: close of unregistered {id}", self.debug_hint);
                return;
            };
            cursor.close = match (cursor.close, close_point) {
                (ReaderClose::Open, ClosePoint::Immediately)
                | (ReaderClose::Draining(_), ClosePoint::Immediately) => ReaderClose::Closed,
                (ReaderClose::Open, ClosePoint::AfterDrainingCurrentBuffer) => {
                    ReaderClose::Draining(write_pos)
                }
                (current, _) => {
                    log::warn!(
                        "stream {}: {id} already closed ({current:?}), close({close_point:?}) ignored",
                        self.debug_hint
                    );
                    return;
                }
            };
            log::debug!(
                "stream {}: {id} close({close_point:?}) at pos={}, write_pos={write_pos}",
                self.debug_hint,
                cursor.pos
            );
        }
        self.data_available.notify_all();
        self.space_available.notify_all();
    }

    /// Absolute cursor of reader `id`
    #[must_use]
    pub fn tell(&self, id: ReaderId) -> Option<usize> {
        self.state.lock().readers.get(&id).map(|cursor| cursor.pos)
    }

    /// Bytes reader `id` could still read right now
    #[must_use]
    pub fn num_unread_bytes(&self, id: ReaderId) -> usize {
        let state = self.state.lock();
        let Some(cursor) = state.readers.get(&id) else {
            return 0;
        };
        if cursor.overrun || state.write_pos - cursor.pos > self.capacity {
            return 0;
        }
        match cursor.close {
            ReaderClose::Open => state.write_pos - cursor.pos,
            ReaderClose::Draining(boundary) => boundary.saturating_sub(cursor.pos),
            ReaderClose::Closed => 0,
        }
    }

    /// Move reader `id` to absolute offset `offset`
    ///
    /// Fails if the reader is not open, the offset is not word-aligned, lies
    /// beyond the write cursor, or was already overwritten.
    pub fn seek(&self, id: ReaderId, offset: usize) -> bool {
        let mut state = self.state.lock();
        let write_pos = state.write_pos;
        let Some(cursor) = state.readers.get_mut(&id) else {
            return false;
        };
        if cursor.overrun || cursor.close != ReaderClose::Open {
            log::warn!("stream {}: seek on closed or overrun {id}", self.debug_hint);
            return false;
        }
        if offset % self.word_size != 0
            || offset > write_pos
            || write_pos - offset > self.capacity
        {
            log::warn!(
                "stream {}: {id} seek to {offset} rejected (write_pos={write_pos}, capacity={})",
                self.debug_hint,
                self.capacity
            );
            return false;
        }
        cursor.pos = offset;
        drop(state);
        self.space_available.notify_all();
        true
    }

    // ------------------------------------------------------------------
    // Writer side
    // ------------------------------------------------------------------

    /// Append `data` according to `policy`
    ///
    /// Only whole words are written. `timeout` is used by the blocking policy
    /// only; zero means no deadline.
    pub fn write(&self, data: &[u8], policy: WriterPolicy, timeout: Duration) -> WriteOutcome {
        let mut state = self.state.lock();
        if state.closed {
            return WriteOutcome::empty(WriteStatus::Closed);
        }
        if data.is_empty() {
            // Empty writes do not wake readers
            return WriteOutcome::empty(WriteStatus::Ok);
        }
        if data.len() < self.word_size {
            return WriteOutcome::empty(WriteStatus::ErrorBytesLessThanWordSize);
        }
        let wanted = data.len() - data.len() % self.word_size;
        let data = &data[..wanted];

        let outcome = match policy {
            WriterPolicy::Nonblockable => {
                // Bytes that would be overwritten within this same call are skipped
                let skip = wanted.saturating_sub(self.capacity);
                state.write_pos += skip;
                state.copy_in(&data[skip..]);
                state.flag_overruns(self.capacity);
                WriteOutcome::new(wanted, WriteStatus::Ok)
            }
            WriterPolicy::AllOrNothing => {
                if wanted > state.free_space(self.capacity) {
                    return WriteOutcome::empty(WriteStatus::OkBufferFull);
                }
                state.copy_in(data);
                WriteOutcome::new(wanted, WriteStatus::Ok)
            }
            WriterPolicy::Blocking => self.write_blocking(&mut state, data, timeout),
        };
        drop(state);

        if outcome.bytes > 0 {
            self.data_available.notify_all();
        }
        outcome
    }

    fn write_blocking(
        &self,
        state: &mut MutexGuard<'_, StreamState>,
        data: &[u8],
        timeout: Duration,
    ) -> WriteOutcome {
        let deadline = Self::deadline(timeout);
        let mut written = 0;
        loop {
            let free = state.free_space(self.capacity);
            let chunk = free.min(data.len() - written);
            if chunk > 0 {
                state.copy_in(&data[written..written + chunk]);
                written += chunk;
                // Let readers start on what is already there
                self.data_available.notify_all();
            }
            if written == data.len() {
                return WriteOutcome::new(written, WriteStatus::Ok);
            }
            if state.closed {
                return WriteOutcome::new(written, WriteStatus::Closed);
            }
            if Self::wait(&self.space_available, state, deadline) {
                let free = state.free_space(self.capacity);
                let chunk = free.min(data.len() - written);
                if chunk > 0 {
                    state.copy_in(&data[written..written + chunk]);
                    written += chunk;
                }
                let status = if written == data.len() {
                    WriteStatus::Ok
                } else {
                    WriteStatus::OkTimedOut
                };
                return WriteOutcome::new(written, status);
            }
        }
    }

    /// Close the stream from the writer side and wake every waiter
    ///
    /// Returns false if it was already closed.
    pub fn close(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            log::debug!(
                "stream {}: closed at write_pos={}, readers={}",
                self.debug_hint,
                state.write_pos,
                state.readers.len()
            );
        }
        self.data_available.notify_all();
        self.space_available.notify_all();
        true
    }
}

impl fmt::Debug for SharedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "SharedStream(hint={}, capacity={}, word_size={}, write_pos={}, closed={}, readers={})",
            self.debug_hint,
            self.capacity,
            self.word_size,
            state.write_pos,
            state.closed,
            state.readers.len()
        )
    }
}
