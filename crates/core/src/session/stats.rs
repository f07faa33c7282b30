use std::fmt;
use std::time::{Duration, Instant};

/// Per-interval throughput counters.
///
/// Owned by one [`StreamSession`](super::StreamSession) and zeroed every
/// time a report is taken or a new connection is accepted.
#[derive(Debug, Clone)]
pub struct StatsWindow {
    started: Instant,
    frames: u32,
    decode_attempts: u32,
    decode_failures: u32,
    bytes: u64,
    decode_time: Duration,
}

impl StatsWindow {
    pub fn new(now: Instant) -> Self {
        Self {
            started: now,
            frames: 0,
            decode_attempts: 0,
            decode_failures: 0,
            bytes: 0,
            decode_time: Duration::ZERO,
        }
    }

    /// Zero every counter and restart the window at `now`.
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(now);
    }

    pub fn record_bytes(&mut self, n: usize) {
        self.bytes += n as u64;
    }

    /// Account for one decode attempt that took `elapsed`.
    pub fn record_decode(&mut self, elapsed: Duration, ok: bool) {
        self.decode_attempts += 1;
        self.decode_time += elapsed;
        if ok {
            self.frames += 1;
        } else {
            self.decode_failures += 1;
        }
    }

    /// Summarize the window as of `now` without resetting it.
    pub fn report(&self, now: Instant, total_frames: u64) -> StatsReport {
        let elapsed = now.saturating_duration_since(self.started);
        let secs = elapsed.as_secs_f64();
        let (fps, kbps) = if secs > 0.0 {
            (
                f64::from(self.frames) / secs,
                (self.bytes as f64 * 8.0) / (secs * 1000.0),
            )
        } else {
            (0.0, 0.0)
        };
        let avg_decode_ms = if self.decode_attempts > 0 {
            self.decode_time.as_secs_f64() * 1000.0 / f64::from(self.decode_attempts)
        } else {
            0.0
        };

        StatsReport {
            elapsed,
            frames: self.frames,
            decode_failures: self.decode_failures,
            bytes: self.bytes,
            fps,
            kbps,
            avg_decode_ms,
            total_frames,
        }
    }

    /// Take a report and restart the window once `interval` has passed.
    pub fn maybe_report(
        &mut self,
        now: Instant,
        interval: Duration,
        total_frames: u64,
    ) -> Option<StatsReport> {
        if now.saturating_duration_since(self.started) < interval {
            return None;
        }
        let report = self.report(now, total_frames);
        self.reset(now);
        Some(report)
    }
}

/// Throughput figures for one reporting interval.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub elapsed: Duration,
    /// Frames decoded successfully in this window.
    pub frames: u32,
    pub decode_failures: u32,
    /// Bytes received in this window.
    pub bytes: u64,
    pub fps: f64,
    /// Received bandwidth in kilobits per second.
    pub kbps: f64,
    /// Mean decode latency over all attempts, in milliseconds.
    pub avg_decode_ms: f64,
    /// Frames decoded since the session was created.
    pub total_frames: u64,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FPS: {:.1} | Bandwidth: {:.1} kbps | Avg decode: {:.1}ms | Frames: {}",
            self.fps, self.kbps, self.avg_decode_ms, self.total_frames
        )
    }
}
