//! Progress reporting seam between the engine and the terminal
//!
//! The engine only ever calls [`ProgressSink`]. What a sink counts depends on
//! the caller: batch transfers report one unit per finished job, single-object
//! transfers report bytes as they move.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Receiver of progress updates
///
/// Implementations must tolerate calls from several workers at once.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink: Send + Sync {
    /// Declare the expected total, `None` when unknown
    fn set_total(&self, total: Option<u64>);

    /// Advance by `delta` units
    fn inc(&self, delta: u64);

    /// Mark the operation finished
    fn finish(&self);
}

/// Sink used when progress display is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn set_total(&self, _total: Option<u64>) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self) {}
}

/// Shared no-op sink
pub fn noop() -> Arc<dyn ProgressSink> {
    Arc::new(NoopProgress)
}

/// Reader that reports every byte it yields
pub struct ProgressReader<R> {
    inner: R,
    progress: Arc<dyn ProgressSink>,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, progress: Arc<dyn ProgressSink>) -> Self {
        Self { inner, progress }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len() - before;
            if read > 0 {
                self.progress.inc(read as u64);
            }
        }
        poll
    }
}
