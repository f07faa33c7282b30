//! Streaming MJPEG receiver.
//!
//! Accepts a raw MJPEG stream (JPEG images back to back, delimited only by
//! their SOI/EOI markers) over TCP and reconstructs the individual frames
//! inside a fixed-size buffer.
//!
//! ```text
//! ByteSource -> FrameAccumulator::fill_from -> find_frame -> Decoder -> Renderer
//!                       ^                                     |
//!                       +------------- compact ---------------+
//! ```

pub mod error;
pub mod frame;
pub mod media;
pub mod server;
pub mod session;
pub mod transport;

pub use error::{Result, StreamError};
pub use frame::{FrameAccumulator, FrameRange, ScanOutcome};
pub use media::{Decoder, Renderer};
pub use server::{Receiver, ReceiverConfig, ReceiverStatus};
pub use session::{SessionConfig, SessionState, StreamSession};
pub use transport::ByteSource;
