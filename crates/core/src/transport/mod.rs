//! Byte sources feeding the de-framer.
//!
//! The core never blocks on the network. A [`ByteSource`] reports how many
//! bytes are ready and hands over at most that many; zero is a normal
//! answer. [`tcp`] provides the TCP implementation used by the
//! [`Receiver`](crate::Receiver).
//!
//! [`read_exact_timeout`] is the one bounded wait in the crate: it keeps
//! polling until a fixed number of bytes has arrived, and gives up when
//! no progress is made for the guard duration. It serves fixed-size
//! protocol reads; the raw MJPEG wire format has none, so the session
//! never calls it.

pub mod tcp;

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, StreamError};

pub use tcp::TcpByteSource;

/// Guard used by [`read_exact_timeout`] when callers have no better value.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Provider of a connected stream's available bytes.
///
/// Implementations must never block past a small bounded duration.
pub trait ByteSource {
    /// Whether the peer is still attached.
    fn is_connected(&self) -> bool;

    /// Number of bytes that can be read right now without blocking.
    fn available(&mut self) -> usize;

    /// Read up to `dst.len()` bytes. `Ok(0)` means nothing was ready.
    fn read_up_to(&mut self, dst: &mut [u8]) -> io::Result<usize>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read_up_to(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        (**self).read_up_to(dst)
    }
}

/// Fill `dst` completely from `source`, polling until done.
///
/// The timer restarts every time bytes arrive, so `timeout` bounds a
/// stall rather than the whole transfer. A stall is reported as
/// [`StreamError::Timeout`], a dropped peer as
/// [`StreamError::Disconnected`]; both are soft failures for the caller.
pub fn read_exact_timeout<S: ByteSource + ?Sized>(
    source: &mut S,
    dst: &mut [u8],
    timeout: Duration,
) -> Result<()> {
    let expected = dst.len();
    let mut got = 0usize;
    let mut last_progress = Instant::now();

    while got < expected {
        if !source.is_connected() {
            tracing::debug!(got, expected, "source disconnected during read");
            return Err(StreamError::Disconnected);
        }

        if last_progress.elapsed() > timeout {
            tracing::warn!(got, expected, "read timeout");
            return Err(StreamError::Timeout { got, expected });
        }

        let available = source.available();
        if available == 0 {
            thread::sleep(IDLE_BACKOFF);
            continue;
        }

        let want = available.min(expected - got);
        let n = source.read_up_to(&mut dst[got..got + want])?;
        if n > 0 {
            got += n;
            last_progress = Instant::now();
        }
    }

    Ok(())
}
