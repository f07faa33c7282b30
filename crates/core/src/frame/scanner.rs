use std::ops::Range;

/// JPEG Start-Of-Image marker.
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// JPEG End-Of-Image marker.
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Byte range `[start, end)` of one complete frame inside a buffer.
///
/// `buf[start..start + 2]` is [`SOI`] and `buf[end - 2..end]` is [`EOI`],
/// so a frame is always at least four bytes long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: usize,
    pub end: usize,
}

impl FrameRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Result of scanning a buffer for the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A full `SOI .. EOI` frame was found.
    Complete(FrameRange),
    /// An SOI was found at `start` but its EOI has not arrived yet.
    Incomplete { start: usize },
    /// No SOI anywhere in the buffer.
    NotFound,
}

impl ScanOutcome {
    /// The complete frame, if any.
    pub fn frame(self) -> Option<FrameRange> {
        match self {
            Self::Complete(range) => Some(range),
            _ => None,
        }
    }
}

/// Locate the first complete frame in `buf`.
///
/// Only the first SOI is honored. The EOI search starts two bytes past it,
/// so `FF D8 FF D9` is the shortest frame and an SOI never doubles as the
/// first half of its own EOI. Bytes before the SOI are left alone: the
/// caller drops them when it compacts past the frame end.
///
/// Runs in O(`buf.len()`) and never allocates.
pub fn find_frame(buf: &[u8]) -> ScanOutcome {
    let Some(start) = find_marker(buf, &SOI) else {
        return ScanOutcome::NotFound;
    };

    match find_marker(&buf[start + 2..], &EOI) {
        Some(offset) => ScanOutcome::Complete(FrameRange {
            start,
            end: start + 2 + offset + 2,
        }),
        None => ScanOutcome::Incomplete { start },
    }
}

fn find_marker(buf: &[u8], marker: &[u8; 2]) -> Option<usize> {
    buf.windows(2).position(|w| w == marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_after_leading_garbage() {
        let buf = [0xAB, 0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9, 0xCD];
        let range = find_frame(&buf).frame().expect("complete frame");
        assert_eq!(range, FrameRange { start: 1, end: 7 });
        assert_eq!(&buf[range.as_range()], &[0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9]);
    }

    #[test]
    fn minimal_frame_is_four_bytes() {
        let buf = [0xFF, 0xD8, 0xFF, 0xD9];
        let range = find_frame(&buf).frame().unwrap();
        assert_eq!(range.as_range(), 0..4);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn marker_split_at_buffer_end_is_not_found() {
        // The D8 half of the SOI has not arrived yet.
        assert_eq!(find_frame(&[0x12, 0x34, 0xFF]), ScanOutcome::NotFound);
    }

    #[test]
    fn soi_without_eoi_is_incomplete() {
        let buf = [0x00, 0x11, 0xFF, 0xD8, 0x01, 0x02, 0x03];
        assert_eq!(find_frame(&buf), ScanOutcome::Incomplete { start: 2 });
    }

    #[test]
    fn no_soi_is_not_found() {
        assert_eq!(find_frame(&[0x00, 0xFF, 0xD9, 0x12]), ScanOutcome::NotFound);
        assert_eq!(find_frame(&[]), ScanOutcome::NotFound);
        assert_eq!(find_frame(&[0xFF]), ScanOutcome::NotFound);
    }

    #[test]
    fn eoi_before_soi_is_ignored() {
        let buf = [0xFF, 0xD9, 0xFF, 0xD8, 0x05, 0xFF, 0xD9];
        let range = find_frame(&buf).frame().unwrap();
        assert_eq!(range.as_range(), 2..7);
    }

    #[test]
    fn only_first_frame_is_returned() {
        let buf = [0xFF, 0xD8, 0x01, 0xFF, 0xD9, 0xFF, 0xD8, 0x02, 0xFF, 0xD9];
        let range = find_frame(&buf).frame().unwrap();
        assert_eq!(range.as_range(), 0..5);
    }

    #[test]
    fn second_soi_inside_frame_does_not_restart() {
        let buf = [0xFF, 0xD8, 0xFF, 0xD8, 0x00, 0xFF, 0xD9];
        let range = find_frame(&buf).frame().unwrap();
        assert_eq!(range.as_range(), 0..7);
    }
}
