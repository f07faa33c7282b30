//! Error types for the MJPEG receiver library.

/// Errors that can occur in the MJPEG receiver library.
///
/// Only construction-time failures and the bounded read-exact helper
/// surface these to callers. Everything that happens inside the driving
/// loop (decode failures, overflow resets, transient reads) is handled
/// locally and logged.
///
/// - **Transport**: [`Io`](Self::Io), [`Timeout`](Self::Timeout),
///   [`Disconnected`](Self::Disconnected).
/// - **Startup**: [`BufferAllocation`](Self::BufferAllocation),
///   [`InvalidConfig`](Self::InvalidConfig).
/// - **Receiver**: [`AlreadyRunning`](Self::AlreadyRunning),
///   [`NotStarted`](Self::NotStarted).
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// [`read_exact_timeout`](crate::transport::read_exact_timeout) made no
    /// progress within its guard duration.
    #[error("read timeout: got {got}/{expected} bytes")]
    Timeout { got: usize, expected: usize },

    /// The byte source dropped while a fixed-size read was in flight.
    #[error("byte source disconnected")]
    Disconnected,

    /// The frame buffer could not be allocated at startup.
    #[error("failed to allocate {capacity} byte frame buffer")]
    BufferAllocation { capacity: usize },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// [`Receiver::start`](crate::Receiver::start) was called while already running.
    #[error("receiver already running")]
    AlreadyRunning,

    /// [`Receiver::stop`](crate::Receiver::stop) was called before `start`.
    #[error("receiver not started")]
    NotStarted,
}

/// Convenience alias for `Result<T, StreamError>`.
pub type Result<T> = std::result::Result<T, StreamError>;
