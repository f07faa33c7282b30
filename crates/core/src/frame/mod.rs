//! MJPEG stream de-framing.
//!
//! A raw MJPEG stream is nothing more than JPEG images written back to
//! back. There are no length prefixes and no headers; each image is
//! delimited only by its marker pairs:
//!
//! ```text
//! ... noise ... FF D8 <entropy-coded image> FF D9 FF D8 <next image> FF D9 ...
//!               ^SOI                         ^EOI  ^SOI
//! ```
//!
//! - [`scanner`] locates the first complete `SOI .. EOI` range in a byte
//!   slice without mutating it.
//! - [`accumulator`] owns the fixed-capacity buffer the network fills,
//!   hands out frame ranges and compacts consumed bytes away.

pub mod accumulator;
pub mod scanner;

pub use accumulator::FrameAccumulator;
pub use scanner::{EOI, FrameRange, SOI, ScanOutcome, find_frame};
