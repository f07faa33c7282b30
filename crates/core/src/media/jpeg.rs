//! Header-level JPEG decoder.
//!
//! [`JpegProbe`] walks the marker segments of a frame up to its frame
//! header (SOFn) and reports the image geometry. It does not touch the
//! entropy-coded data, which keeps it cheap enough to run on every frame
//! and makes it a useful stand-in when no pixel decoder is attached.
//!
//! ```text
//! FF D8                      SOI
//! FF E0 <len> <APP0 ...>     optional segments, each length-prefixed
//! FF DB <len> <DQT ...>
//! FF C0 <len> P Y(2) X(2) Nf ...   SOF0: precision, height, width, components
//! ...
//! FF DA <len> ...            SOS, scan data follows
//! ```

use super::Decoder;
use crate::frame::SOI;

/// Geometry read from a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    pub width: u16,
    pub height: u16,
    pub components: u8,
    pub precision: u8,
    /// Size of the whole frame in bytes, markers included.
    pub len: usize,
}

/// Why a frame's header could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame does not start with SOI")]
    MissingSoi,

    #[error("frame truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("expected marker at byte {offset}, found {found:#04x}")]
    ExpectedMarker { offset: usize, found: u8 },

    #[error("invalid segment length {length} at byte {offset}")]
    BadSegmentLength { offset: usize, length: u16 },

    #[error("no frame header before scan data")]
    MissingFrameHeader,

    #[error("image has zero width or height")]
    EmptyImage,
}

/// Reads frame dimensions without decoding pixels.
#[derive(Debug, Default)]
pub struct JpegProbe;

impl JpegProbe {
    pub fn new() -> Self {
        Self
    }

    /// Parse the header of one `SOI .. EOI` frame.
    pub fn probe(frame: &[u8]) -> Result<JpegInfo, DecodeError> {
        if !frame.starts_with(&SOI) {
            return Err(DecodeError::MissingSoi);
        }

        let mut pos = 2usize;
        loop {
            let lead = byte_at(frame, pos)?;
            if lead != 0xFF {
                return Err(DecodeError::ExpectedMarker {
                    offset: pos,
                    found: lead,
                });
            }
            // Any number of 0xFF fill bytes may precede a marker.
            while frame.get(pos) == Some(&0xFF) {
                pos += 1;
            }
            let marker = byte_at(frame, pos)?;
            pos += 1;

            match marker {
                // Standalone markers carry no length.
                0x01 | 0xD0..=0xD8 => continue,
                0xD9 | 0xDA => return Err(DecodeError::MissingFrameHeader),
                _ => {}
            }

            let length = u16_at(frame, pos)?;
            if length < 2 {
                return Err(DecodeError::BadSegmentLength {
                    offset: pos,
                    length,
                });
            }
            let segment_end = pos + length as usize;
            if segment_end > frame.len() {
                return Err(DecodeError::Truncated {
                    offset: frame.len(),
                });
            }

            if is_frame_header(marker) {
                if length < 8 {
                    return Err(DecodeError::BadSegmentLength {
                        offset: pos,
                        length,
                    });
                }
                let info = JpegInfo {
                    precision: frame[pos + 2],
                    height: u16::from_be_bytes([frame[pos + 3], frame[pos + 4]]),
                    width: u16::from_be_bytes([frame[pos + 5], frame[pos + 6]]),
                    components: frame[pos + 7],
                    len: frame.len(),
                };
                if info.width == 0 || info.height == 0 {
                    return Err(DecodeError::EmptyImage);
                }
                return Ok(info);
            }

            pos = segment_end;
        }
    }
}

impl Decoder for JpegProbe {
    type Output = JpegInfo;
    type Error = DecodeError;

    fn decode(&mut self, frame: &[u8]) -> Result<JpegInfo, DecodeError> {
        Self::probe(frame)
    }
}

/// SOF0..SOF15, minus DHT (C4), JPG (C8) and DAC (CC).
fn is_frame_header(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn byte_at(frame: &[u8], offset: usize) -> Result<u8, DecodeError> {
    frame
        .get(offset)
        .copied()
        .ok_or(DecodeError::Truncated { offset })
}

fn u16_at(frame: &[u8], offset: usize) -> Result<u16, DecodeError> {
    Ok(u16::from_be_bytes([
        byte_at(frame, offset)?,
        byte_at(frame, offset + 1)?,
    ]))
}
