//! Stream session: the fill -> scan -> decode -> compact cycle.
//!
//! A [`StreamSession`] owns the frame buffer, the statistics window and
//! the current connection. Nothing in it is shared; a single driving loop
//! calls [`StreamSession::drive`] over and over, and every call does a
//! bounded amount of work:
//!
//! 1. Check the source is still connected (the only cancellation point).
//! 2. Pull whatever bytes are ready into the buffer.
//! 3. Scan for a complete frame; decode, render and compact past it.
//! 4. With no frame and the buffer inside its safety margin, reset.
//! 5. Emit throughput statistics once per interval.
//!
//! ## State machine
//!
//! ```text
//! Idle       --accept-->             Connected
//! Connected  --first decoded frame--> Streaming
//! Streaming  --overflow reset-->     Connected
//! any        --disconnect-->         Idle
//! ```

pub mod stats;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::frame::{FrameAccumulator, FrameRange, ScanOutcome};
use crate::media::{Decoder, Renderer, WaitingScreen};
use crate::transport::ByteSource;
pub use stats::{StatsReport, StatsWindow};

/// Largest frame the buffer holds by default.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100 * 1024;

/// Headroom below capacity that triggers an overflow reset.
pub const DEFAULT_SAFETY_MARGIN: usize = 1024;

/// Default statistics reporting interval.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(2);

/// What to do with bytes that cannot start a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoisePolicy {
    /// Leave them in place until a frame is extracted past them or the
    /// buffer overflows. A marker split across reads is never lost.
    #[default]
    Retain,
    /// Drop bytes before a pending SOI, and everything but a trailing
    /// `0xFF` when no SOI is buffered at all.
    Discard,
}

/// Tunables for one [`StreamSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed size of the frame buffer in bytes.
    pub buffer_capacity: usize,
    /// Reset the buffer once fewer than this many bytes are free and no
    /// frame has been found. Must be non-zero and below `buffer_capacity`.
    pub safety_margin: usize,
    /// Do not scan until at least this many bytes are buffered.
    pub min_scan_len: usize,
    /// How often throughput statistics are emitted.
    pub stats_interval: Duration,
    pub noise_policy: NoisePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            min_scan_len: 4,
            stats_interval: DEFAULT_STATS_INTERVAL,
            noise_policy: NoisePolicy::Retain,
        }
    }
}

/// Connection lifecycle of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No active connection.
    #[default]
    Idle,
    /// Accepted, buffer and counters reset, nothing decoded yet.
    Connected,
    /// At least one frame decoded since the connection was accepted.
    Streaming,
}

/// What a single [`StreamSession::drive`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// No connection to service.
    Idle,
    /// Bytes were read (possibly zero) but no frame completed.
    Waiting { read: usize },
    /// A frame was extracted; `decoded` is false when the decoder rejected it.
    Frame {
        read: usize,
        len: usize,
        decoded: bool,
    },
    /// The buffer filled up without a frame and `dropped` bytes were discarded.
    Overflow { dropped: usize },
    /// The source went away; the session is idle again.
    Disconnected,
}

impl Cycle {
    /// Whether the cycle moved any data. Idle cycles let the driver back off.
    pub fn made_progress(&self) -> bool {
        match self {
            Self::Idle | Self::Disconnected => false,
            Self::Waiting { read } => *read > 0,
            Self::Frame { .. } | Self::Overflow { .. } => true,
        }
    }
}

/// One receiver's buffer, counters and connection.
pub struct StreamSession<S, D, R> {
    config: SessionConfig,
    accumulator: FrameAccumulator,
    source: Option<S>,
    state: SessionState,
    decoder: D,
    renderer: R,
    stats: StatsWindow,
    last_report: Option<StatsReport>,
    total_frames: u64,
    waiting: WaitingScreen,
}

impl<S, D, R> StreamSession<S, D, R>
where
    S: ByteSource,
    D: Decoder,
    R: Renderer<D::Output>,
{
    /// Allocate the frame buffer and start idle.
    ///
    /// Allocation failure is the one fatal error of a session and is
    /// returned here, before any stream is accepted.
    pub fn new(config: SessionConfig, decoder: D, renderer: R) -> Result<Self> {
        let accumulator =
            FrameAccumulator::with_capacity(config.buffer_capacity, config.safety_margin)?;
        Ok(Self {
            config,
            accumulator,
            source: None,
            state: SessionState::Idle,
            decoder,
            renderer,
            stats: StatsWindow::new(Instant::now()),
            last_report: None,
            total_frames: 0,
            waiting: WaitingScreen::default(),
        })
    }

    /// Address shown on the waiting screen.
    pub fn set_listen_addr(&mut self, addr: SocketAddr) {
        self.waiting.listen_addr = Some(addr);
    }

    /// Ask the renderer to show the idle screen.
    pub fn show_waiting(&mut self) {
        self.renderer.show_waiting(&self.waiting);
    }

    /// Take over a newly accepted connection.
    ///
    /// Any previous connection is dropped. The buffer and the statistics
    /// window start from zero.
    pub fn accept(&mut self, source: S) {
        self.accept_at(source, Instant::now());
    }

    /// [`accept`](Self::accept), starting the statistics window at `now`.
    pub fn accept_at(&mut self, source: S, now: Instant) {
        if self.source.is_some() {
            tracing::info!("replacing active connection");
        }
        self.source = Some(source);
        self.state = SessionState::Connected;
        self.accumulator.reset();
        self.stats.reset(now);
        tracing::debug!(
            capacity = self.accumulator.capacity(),
            "session connected"
        );
    }

    /// Drop the connection, clear the buffer and show the waiting screen.
    pub fn disconnect(&mut self) {
        let had_source = self.source.take().is_some();
        self.state = SessionState::Idle;
        self.accumulator.reset();
        if had_source {
            tracing::info!(total_frames = self.total_frames, "client disconnected");
        }
        self.renderer.show_waiting(&self.waiting);
    }

    /// Run one cycle against the wall clock.
    pub fn drive(&mut self) -> Cycle {
        self.drive_at(Instant::now())
    }

    /// Run one cycle, using `now` for statistics bookkeeping.
    pub fn drive_at(&mut self, now: Instant) -> Cycle {
        match self.source.as_ref().map(ByteSource::is_connected) {
            None => return Cycle::Idle,
            Some(false) => {
                self.disconnect();
                return Cycle::Disconnected;
            }
            Some(true) => {}
        }

        let read = match self.source.as_mut() {
            Some(source) => match self.accumulator.fill_from(source) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "read failed, retrying next cycle");
                    0
                }
            },
            None => 0,
        };
        self.stats.record_bytes(read);

        let cycle = self.process_buffer(read);

        if let Some(report) =
            self.stats
                .maybe_report(now, self.config.stats_interval, self.total_frames)
        {
            tracing::info!(
                fps = report.fps,
                kbps = report.kbps,
                avg_decode_ms = report.avg_decode_ms,
                decode_failures = report.decode_failures,
                total_frames = report.total_frames,
                "{report}"
            );
            self.last_report = Some(report);
        }

        cycle
    }

    fn process_buffer(&mut self, read: usize) -> Cycle {
        if self.accumulator.len() >= self.config.min_scan_len {
            let outcome = self.accumulator.scan();
            if let ScanOutcome::Complete(range) = outcome {
                let decoded = self.decode_frame(range);
                self.accumulator.compact(range.end);
                return Cycle::Frame {
                    read,
                    len: range.len(),
                    decoded,
                };
            }

            if self.config.noise_policy == NoisePolicy::Discard {
                let dropped = self.accumulator.discard_noise(outcome);
                if dropped > 0 {
                    tracing::trace!(dropped, "discarded bytes outside any frame");
                }
            }
        }

        if self.accumulator.is_near_capacity() {
            let dropped = self.accumulator.len();
            tracing::warn!(
                dropped,
                capacity = self.accumulator.capacity(),
                "buffer overflow, resetting"
            );
            self.accumulator.reset();
            if self.state == SessionState::Streaming {
                self.state = SessionState::Connected;
            }
            return Cycle::Overflow { dropped };
        }

        Cycle::Waiting { read }
    }

    fn decode_frame(&mut self, range: FrameRange) -> bool {
        let frame = self.accumulator.frame(range);
        let started = Instant::now();
        let result = self.decoder.decode(frame);
        let elapsed = started.elapsed();

        self.stats.record_decode(elapsed, result.is_ok());

        match result {
            Ok(image) => {
                self.renderer.render(&image);
                self.total_frames += 1;
                if self.state == SessionState::Connected {
                    self.state = SessionState::Streaming;
                    tracing::debug!("first frame decoded, streaming");
                }
                tracing::trace!(
                    frame_size = range.len(),
                    decode_us = elapsed.as_micros() as u64,
                    "frame decoded"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, frame_size = range.len(), "JPEG decode error");
                false
            }
        }
    }
}

impl<S, D, R> StreamSession<S, D, R> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn accumulator(&self) -> &FrameAccumulator {
        &self.accumulator
    }

    /// The active connection, if any.
    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Frames decoded since the session was created, across connections.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// The most recent statistics report.
    pub fn last_report(&self) -> Option<&StatsReport> {
        self.last_report.as_ref()
    }
}
