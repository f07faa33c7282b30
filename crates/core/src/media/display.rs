//! Viewport clipping and a log-backed renderer.

use super::jpeg::JpegInfo;
use super::{Renderer, WaitingScreen};

/// Default panel width in pixels.
pub const DEFAULT_WIDTH: u16 = 280;
/// Default panel height in pixels.
pub const DEFAULT_HEIGHT: u16 = 240;

/// Fixed-size drawing surface that clips blocks to its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Visible size of a `w` x `h` block drawn at `(x, y)`.
    ///
    /// `None` when the block starts outside the viewport.
    pub fn clip(&self, x: u16, y: u16, w: u16, h: u16) -> Option<(u16, u16)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((w.min(self.width - x), h.min(self.height - y)))
    }
}

/// [`Renderer`] that reports frames and idle screens through `tracing`.
///
/// Stands in for a physical panel: every frame is clipped to the viewport
/// at the origin, as a display driver would draw it.
#[derive(Debug, Default)]
pub struct LogRenderer {
    viewport: Viewport,
    rendered: u64,
}

impl LogRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            rendered: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Frames rendered since construction.
    pub fn rendered(&self) -> u64 {
        self.rendered
    }
}

impl Renderer<JpegInfo> for LogRenderer {
    fn render(&mut self, image: &JpegInfo) {
        self.rendered += 1;
        match self.viewport.clip(0, 0, image.width, image.height) {
            Some((w, h)) if (w, h) != (image.width, image.height) => {
                tracing::debug!(
                    width = image.width,
                    height = image.height,
                    drawn_width = w,
                    drawn_height = h,
                    "frame clipped to viewport"
                );
            }
            Some(_) => {
                tracing::trace!(
                    width = image.width,
                    height = image.height,
                    bytes = image.len,
                    "frame rendered"
                );
            }
            None => tracing::debug!("empty viewport, frame not drawn"),
        }
    }

    fn show_waiting(&mut self, screen: &WaitingScreen) {
        tracing::info!(screen = %screen, "showing waiting screen");
    }
}
