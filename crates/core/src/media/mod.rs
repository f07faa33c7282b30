//! Decode and render collaborators.
//!
//! Extracting a frame is the core's job; turning it into pixels and
//! putting them on a screen is not. These traits are the seams:
//!
//! - A [`Decoder`] takes the raw bytes of one frame and returns a handle
//!   to the decoded result, or an error for malformed data. It must fail
//!   gracefully on garbage: the scanner only checks marker bytes.
//! - A [`Renderer`] presents a decoded handle and shows a waiting screen
//!   while no stream is connected.
//!
//! Keeping the two apart lets decoding be tested without a display.
//!
//! | Type | Module | Role |
//! |------|--------|------|
//! | [`JpegProbe`](jpeg::JpegProbe) | [`jpeg`] | Header-level decoder yielding dimensions |
//! | [`LogRenderer`](display::LogRenderer) | [`display`] | Renderer reporting frames through `tracing` |

pub mod display;
pub mod jpeg;

use std::fmt;
use std::net::SocketAddr;

/// Turns one frame's bytes into a decoded handle.
pub trait Decoder {
    /// Handle to the decoded image, passed to the [`Renderer`].
    type Output;
    /// Why a frame could not be decoded.
    type Error: fmt::Display;

    /// Decode a single `SOI .. EOI` frame.
    fn decode(&mut self, frame: &[u8]) -> Result<Self::Output, Self::Error>;
}

/// Presents decoded images of type `I`.
pub trait Renderer<I: ?Sized> {
    /// Show one decoded image.
    fn render(&mut self, image: &I);

    /// Show the idle state while waiting for a stream.
    fn show_waiting(&mut self, screen: &WaitingScreen);
}

/// Contents of the idle screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingScreen {
    /// Address the receiver is listening on, once bound.
    pub listen_addr: Option<SocketAddr>,
}

impl WaitingScreen {
    pub fn new(listen_addr: Option<SocketAddr>) -> Self {
        Self { listen_addr }
    }

    /// Text lines in display order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["MJPEG Receiver".to_string()];
        if let Some(addr) = self.listen_addr {
            lines.push("IP Address:".to_string());
            lines.push(addr.ip().to_string());
            lines.push(format!("Port: {}", addr.port()));
        }
        lines.push("Waiting for stream...".to_string());
        lines
    }
}

impl fmt::Display for WaitingScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join(" | "))
    }
}
