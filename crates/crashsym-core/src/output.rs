//! Output sink that rides out a temporarily unavailable writer.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use tracing::trace;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(1);

/// Retries writes that fail with `WouldBlock`.
///
/// A non-blocking stdout (for example a pipe shared with a process that set
/// `O_NONBLOCK`) can report `EAGAIN` when full. The same buffer is offered
/// again after a short pause until the sink accepts it, so no output is
/// dropped and the stream is not aborted. `write_all` already retries
/// `Interrupted`.
#[derive(Debug)]
pub struct RetryWriter<W>
{
    inner: W,
    backoff: Duration,
}

impl<W: Write> RetryWriter<W>
{
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self
    {
        Self {
            inner,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Pause between attempts.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self
    {
        self.backoff = backoff;
        self
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W
    {
        self.inner
    }

    fn wait(&self)
    {
        trace!("output would block, retrying");
        if !self.backoff.is_zero() {
            thread::sleep(self.backoff);
        }
    }
}

impl<W: Write> Write for RetryWriter<W>
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        loop {
            match self.inner.write(buf) {
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => self.wait(),
                other => return other,
            }
        }
    }

    fn flush(&mut self) -> io::Result<()>
    {
        loop {
            match self.inner.flush() {
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => self.wait(),
                other => return other,
            }
        }
    }
}
