//! Backpressure-aware byte stream for file parts.
//!
//! Each file part gets a [`FileStream`] handed to the caller and a
//! crate-private [`FileSink`] kept by the decoder. Both sides share one
//! buffer behind a `parking_lot::Mutex`. The sink reports
//! [`PushStatus::Full`] once the unread bytes reach the high-water mark; the
//! decoder then stops and waits for the consumer to read.
//!
//! The decoder also holds an [`Outstanding`] counter of streams the consumer
//! has not finished with. A stream counts as finished once its terminal
//! state has been read or its handle dropped. The decoder's completion waits
//! for the counter to reach zero.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, Waker};

use futures_core::Stream;
use parking_lot::Mutex;

use crate::error::FormError;

/// Result of a non-blocking read from a [`FileStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRead {
    /// The next chunk of file content.
    Chunk(Vec<u8>),
    /// No data buffered yet; the part is still arriving.
    Pending,
    /// The `file_size` limit cut the content off here. Only the end
    /// follows.
    Limit,
    /// All content has been read.
    End,
    /// The stream was destroyed; the content is incomplete.
    Failed(FormError),
}

/// Whether a pushed chunk left room in the stream buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushStatus {
    Accepted,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StreamState {
    Open,
    Ended,
    Errored(FormError),
}

#[derive(Debug)]
struct Shared {
    chunks: VecDeque<Vec<u8>>,
    buffered: usize,
    received: usize,
    high_water_mark: usize,
    state: StreamState,
    truncated: bool,
    limit_pending: bool,
    failure_reported: bool,
    reader_dropped: bool,
    released: bool,
    reader_waker: Option<Waker>,
    writer_waker: Option<Waker>,
}

impl Shared {
    fn wake_reader(&mut self) {
        if let Some(waker) = self.reader_waker.take() {
            waker.wake();
        }
    }

    fn wake_writer(&mut self) {
        if let Some(waker) = self.writer_waker.take() {
            waker.wake();
        }
    }

    /// Marks the stream finished for the outstanding counter. Returns true
    /// the first time only.
    fn release(&mut self) -> bool {
        !std::mem::replace(&mut self.released, true)
    }
}

/// Count of file streams the consumer has not finished with.
#[derive(Debug, Default)]
pub(crate) struct Outstanding {
    count: AtomicUsize,
    waker: Mutex<Option<Waker>>,
}

impl Outstanding {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn register(&self, waker: &Waker) {
        *self.waker.lock() = Some(waker.clone());
    }

    fn acquire(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn release(&self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
        if let Some(waker) = self.waker.lock().take() {
            waker.wake();
        }
    }
}

/// Creates a connected sink/stream pair and counts it as outstanding.
pub(crate) fn channel(
    high_water_mark: usize,
    outstanding: &Arc<Outstanding>,
) -> (FileSink, FileStream) {
    let shared = Arc::new(Mutex::new(Shared {
        chunks: VecDeque::new(),
        buffered: 0,
        received: 0,
        high_water_mark: high_water_mark.max(1),
        state: StreamState::Open,
        truncated: false,
        limit_pending: false,
        failure_reported: false,
        reader_dropped: false,
        released: false,
        reader_waker: None,
        writer_waker: None,
    }));
    outstanding.acquire();
    (
        FileSink {
            shared: Arc::clone(&shared),
        },
        FileStream {
            shared,
            outstanding: Arc::clone(outstanding),
        },
    )
}

/// Producer half of a file stream, owned by the decoder.
#[derive(Debug)]
pub(crate) struct FileSink {
    shared: Arc<Mutex<Shared>>,
}

impl FileSink {
    /// Appends content. Discarded once the consumer is gone or the stream
    /// has ended.
    pub(crate) fn push(&self, chunk: &[u8]) -> PushStatus {
        let mut shared = self.shared.lock();
        if shared.reader_dropped || shared.state != StreamState::Open {
            return PushStatus::Accepted;
        }
        if !chunk.is_empty() {
            shared.chunks.push_back(chunk.to_vec());
            shared.buffered += chunk.len();
            shared.received += chunk.len();
            shared.wake_reader();
        }
        if shared.buffered >= shared.high_water_mark {
            PushStatus::Full
        } else {
            PushStatus::Accepted
        }
    }

    /// True when the consumer can take more bytes.
    pub(crate) fn is_ready(&self) -> bool {
        let shared = self.shared.lock();
        shared.reader_dropped
            || shared.state != StreamState::Open
            || shared.buffered < shared.high_water_mark
    }

    /// Registers the waker to notify once the buffer drains.
    pub(crate) fn register_writer(&self, waker: &Waker) {
        self.shared.lock().writer_waker = Some(waker.clone());
    }

    /// Flags the content as cut off and queues a [`FileRead::Limit`]
    /// behind the chunks already pushed.
    pub(crate) fn mark_truncated(&self) {
        let mut shared = self.shared.lock();
        if shared.state == StreamState::Open && !shared.truncated {
            shared.truncated = true;
            shared.limit_pending = true;
            shared.wake_reader();
        }
    }

    /// Ends the stream normally.
    pub(crate) fn finish(&self) {
        let mut shared = self.shared.lock();
        if shared.state == StreamState::Open {
            shared.state = StreamState::Ended;
            shared.wake_reader();
        }
    }

    /// Ends the stream with an error, dropping unread content.
    pub(crate) fn destroy(&self, err: FormError) {
        let mut shared = self.shared.lock();
        if shared.state == StreamState::Open {
            shared.chunks.clear();
            shared.buffered = 0;
            shared.limit_pending = false;
            shared.state = StreamState::Errored(err);
            shared.wake_reader();
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.destroy(FormError::Aborted);
    }
}

/// The content of one uploaded file, delivered as it arrives.
///
/// Read it with [`try_read`](Self::try_read) or as a
/// [`futures_core::Stream`]. The decoder pauses while too many bytes sit
/// unread; dropping the handle discards the rest of the file and lets the
/// decoder continue.
///
/// A file cut off by the `file_size` limit yields [`FileRead::Limit`] after
/// its last chunk. The `Stream` impl has no item for that marker and skips
/// it, so async readers check [`truncated`](Self::truncated) once the
/// stream ends.
#[derive(Debug)]
pub struct FileStream {
    shared: Arc<Mutex<Shared>>,
    outstanding: Arc<Outstanding>,
}

impl FileStream {
    /// Reads the next buffered chunk without waiting.
    pub fn try_read(&mut self) -> FileRead {
        let mut shared = self.shared.lock();
        if let Some(chunk) = shared.chunks.pop_front() {
            shared.buffered -= chunk.len();
            if shared.buffered < shared.high_water_mark {
                shared.wake_writer();
            }
            return FileRead::Chunk(chunk);
        }
        if std::mem::take(&mut shared.limit_pending) {
            return FileRead::Limit;
        }
        let read = match &shared.state {
            StreamState::Open => return FileRead::Pending,
            StreamState::Ended => FileRead::End,
            StreamState::Errored(err) => FileRead::Failed(err.clone()),
        };
        let release = shared.release();
        drop(shared);
        if release {
            self.outstanding.release();
        }
        read
    }

    /// Takes every buffered byte at once.
    pub fn read_available(&mut self) -> Vec<u8> {
        let mut shared = self.shared.lock();
        let mut out = Vec::with_capacity(shared.buffered);
        for chunk in shared.chunks.drain(..) {
            out.extend_from_slice(&chunk);
        }
        shared.buffered = 0;
        shared.wake_writer();
        out
    }

    /// True if content past the `file_size` limit was cut off.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.shared.lock().truncated
    }

    /// Total content bytes delivered to this stream so far.
    #[must_use]
    pub fn bytes_received(&self) -> usize {
        self.shared.lock().received
    }

    /// True once the stream has ended or failed and no data is left.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let shared = self.shared.lock();
        shared.state != StreamState::Open && shared.chunks.is_empty()
    }
}

impl Stream for FileStream {
    type Item = Result<Vec<u8>, FormError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            {
                let mut shared = this.shared.lock();
                if shared.chunks.is_empty()
                    && !shared.limit_pending
                    && shared.state == StreamState::Open
                {
                    shared.reader_waker = Some(cx.waker().clone());
                    return Poll::Pending;
                }
                if matches!(shared.state, StreamState::Errored(_)) && shared.failure_reported {
                    return Poll::Ready(None);
                }
            }
            return match this.try_read() {
                FileRead::Chunk(chunk) => Poll::Ready(Some(Ok(chunk))),
                FileRead::Limit => continue,
                FileRead::End => Poll::Ready(None),
                FileRead::Failed(err) => {
                    this.shared.lock().failure_reported = true;
                    Poll::Ready(Some(Err(err)))
                }
                FileRead::Pending => {
                    this.shared.lock().reader_waker = Some(cx.waker().clone());
                    Poll::Pending
                }
            };
        }
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        let mut shared = self.shared.lock();
        shared.reader_dropped = true;
        shared.chunks.clear();
        shared.buffered = 0;
        shared.wake_writer();
        let release = shared.release();
        drop(shared);
        if release {
            self.outstanding.release();
        }
    }
}
