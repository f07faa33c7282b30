use std::io;

use super::scanner::{FrameRange, ScanOutcome, find_frame};
use crate::error::{Result, StreamError};
use crate::transport::ByteSource;

/// Fixed-capacity buffer that collects stream bytes until a frame completes.
///
/// Unconsumed bytes always sit contiguously at `buf[0..len]`. Memory is
/// allocated once; nothing here ever grows the buffer. When the fill level
/// passes `capacity - safety_margin` without a frame in sight, the owner
/// is expected to [`reset`](Self::reset) and resynchronize on the next SOI.
#[derive(Debug)]
pub struct FrameAccumulator {
    buf: Box<[u8]>,
    len: usize,
    safety_margin: usize,
}

impl FrameAccumulator {
    /// Allocate a buffer of `capacity` bytes.
    ///
    /// Allocation failure is reported as [`StreamError::BufferAllocation`]
    /// instead of aborting, so startup can surface it to the operator.
    pub fn with_capacity(capacity: usize, safety_margin: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StreamError::InvalidConfig("buffer capacity must be non-zero"));
        }
        if safety_margin == 0 {
            // A full buffer would never count as near capacity and never reset.
            return Err(StreamError::InvalidConfig("safety margin must be non-zero"));
        }
        if safety_margin >= capacity {
            return Err(StreamError::InvalidConfig(
                "safety margin must be smaller than buffer capacity",
            ));
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| StreamError::BufferAllocation { capacity })?;
        storage.resize(capacity, 0);

        tracing::debug!(capacity, safety_margin, "frame buffer allocated");

        Ok(Self {
            buf: storage.into_boxed_slice(),
            len: 0,
            safety_margin,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free space left before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// The unconsumed bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Copy as much of `bytes` as fits and return how many were taken.
    ///
    /// Anything beyond the remaining capacity is left to the caller; it is
    /// never written over unconsumed data.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
        n
    }

    /// Read whatever `source` has ready straight into the free region.
    ///
    /// Pulls at most `min(source.available(), remaining())` bytes, so the
    /// call never waits on the network.
    pub fn fill_from<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> io::Result<usize> {
        let want = source.available().min(self.remaining());
        if want == 0 {
            return Ok(0);
        }
        let n = source
            .read_up_to(&mut self.buf[self.len..self.len + want])?
            .min(want);
        self.len += n;
        Ok(n)
    }

    /// Scan the unconsumed bytes without changing them.
    pub fn scan(&self) -> ScanOutcome {
        find_frame(self.as_slice())
    }

    /// Range of the next complete frame, if one is buffered.
    ///
    /// The caller must [`compact`](Self::compact) past `range.end` once it
    /// is done with the frame bytes.
    pub fn scan_and_extract(&self) -> Option<FrameRange> {
        self.scan().frame()
    }

    /// Bytes of a range returned by [`scan_and_extract`](Self::scan_and_extract).
    ///
    /// # Panics
    ///
    /// Panics if `range` reaches past the unconsumed bytes.
    pub fn frame(&self, range: FrameRange) -> &[u8] {
        &self.as_slice()[range.as_range()]
    }

    /// Drop the first `consumed_up_to` bytes and move the rest to offset 0.
    ///
    /// Consuming everything (or more) just empties the buffer without a copy,
    /// so repeating a compaction that already emptied the buffer is a no-op.
    pub fn compact(&mut self, consumed_up_to: usize) {
        if consumed_up_to >= self.len {
            self.len = 0;
            return;
        }
        self.buf.copy_within(consumed_up_to..self.len, 0);
        self.len -= consumed_up_to;
    }

    /// Forget all buffered bytes. The allocation is kept.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Whether the fill level has crossed into the safety margin.
    pub fn is_near_capacity(&self) -> bool {
        self.len > self.capacity() - self.safety_margin
    }

    /// Drop bytes that can never belong to a frame, given a fresh scan.
    ///
    /// With an SOI pending at `start`, everything before it goes. With no
    /// SOI at all, everything goes except a trailing `0xFF` that may be the
    /// first half of a marker split across reads. Returns the number of
    /// bytes dropped.
    pub fn discard_noise(&mut self, outcome: ScanOutcome) -> usize {
        let drop = match outcome {
            ScanOutcome::Complete(_) => 0,
            ScanOutcome::Incomplete { start } => start,
            ScanOutcome::NotFound => match self.as_slice().last() {
                Some(0xFF) => self.len - 1,
                _ => self.len,
            },
        };
        if drop > 0 {
            self.compact(drop);
        }
        drop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acc(capacity: usize) -> FrameAccumulator {
        FrameAccumulator::with_capacity(capacity, 4).unwrap()
    }

    #[test]
    fn rejects_margin_not_below_capacity() {
        assert!(matches!(
            FrameAccumulator::with_capacity(16, 16),
            Err(StreamError::InvalidConfig(_))
        ));
        assert!(matches!(
            FrameAccumulator::with_capacity(0, 0),
            Err(StreamError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_margin() {
        assert!(matches!(
            FrameAccumulator::with_capacity(16, 0),
            Err(StreamError::InvalidConfig(_))
        ));
        assert!(FrameAccumulator::with_capacity(16, 1).is_ok());
    }

    #[test]
    fn smallest_margin_still_resets_when_full() {
        let mut a = FrameAccumulator::with_capacity(16, 1).unwrap();
        a.append(&[0xFF, 0xD8]);
        a.append(&[0x42; 13]);
        assert!(!a.is_near_capacity());
        a.append(&[0x42; 30]);
        assert_eq!(a.len(), 16);
        assert!(a.is_near_capacity());
    }

    #[test]
    fn append_copies_only_what_fits() {
        let mut a = acc(8);
        assert_eq!(a.append(&[1, 2, 3, 4, 5]), 5);
        assert_eq!(a.append(&[6, 7, 8, 9, 10]), 3);
        assert_eq!(a.len(), 8);
        assert_eq!(a.remaining(), 0);
        assert_eq!(a.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(a.append(&[11]), 0);
    }

    #[test]
    fn extract_and_compact_leaves_trailing_byte() {
        let mut a = acc(32);
        a.append(&[0xAB, 0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9, 0xCD]);

        let range = a.scan_and_extract().expect("frame");
        assert_eq!(range.as_range(), 1..7);
        assert_eq!(a.frame(range), &[0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9]);

        a.compact(range.end);
        assert_eq!(a.len(), 1);
        assert_eq!(a.as_slice(), &[0xCD]);
    }

    #[test]
    fn incomplete_frame_does_not_mutate() {
        let mut a = acc(32);
        a.append(&[0x00, 0xFF, 0xD8, 0x10, 0x20]);
        assert!(a.scan_and_extract().is_none());
        assert_eq!(a.as_slice(), &[0x00, 0xFF, 0xD8, 0x10, 0x20]);
    }

    #[test]
    fn back_to_back_frames_extract_in_order() {
        let mut a = acc(32);
        a.append(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9, 0xFF, 0xD8, 0x02, 0xFF, 0xD9]);

        let first = a.scan_and_extract().unwrap();
        assert_eq!(a.frame(first), &[0xFF, 0xD8, 0x01, 0xFF, 0xD9]);
        a.compact(first.end);

        let second = a.scan_and_extract().unwrap();
        assert_eq!(a.frame(second), &[0xFF, 0xD8, 0x02, 0xFF, 0xD9]);
        a.compact(second.end);

        assert!(a.is_empty());
        assert!(a.scan_and_extract().is_none());
    }

    #[test]
    fn compact_past_end_is_idempotent() {
        let mut a = acc(16);
        a.append(&[0xFF, 0xD8, 0xFF, 0xD9]);
        a.compact(4);
        assert_eq!(a.len(), 0);
        a.compact(4);
        assert_eq!(a.len(), 0);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut a = acc(16);
        a.append(&[1; 10]);
        a.reset();
        assert!(a.is_empty());
        assert_eq!(a.capacity(), 16);
        assert_eq!(a.append(&[2; 16]), 16);
    }

    #[test]
    fn near_capacity_respects_margin() {
        let mut a = acc(16);
        a.append(&[0; 12]);
        assert!(!a.is_near_capacity());
        a.append(&[0]);
        assert!(a.is_near_capacity());
    }

    #[test]
    fn discard_noise_before_pending_soi() {
        let mut a = acc(16);
        a.append(&[0x01, 0x02, 0xFF, 0xD8, 0x33]);
        let outcome = a.scan();
        assert_eq!(a.discard_noise(outcome), 2);
        assert_eq!(a.as_slice(), &[0xFF, 0xD8, 0x33]);
    }

    #[test]
    fn discard_noise_keeps_split_marker_byte() {
        let mut a = acc(16);
        a.append(&[0x01, 0x02, 0xFF]);
        let outcome = a.scan();
        assert_eq!(a.discard_noise(outcome), 2);
        assert_eq!(a.as_slice(), &[0xFF]);

        a.append(&[0xD8, 0x00, 0xFF, 0xD9]);
        assert_eq!(a.scan_and_extract().unwrap().as_range(), 0..5);
    }

    #[test]
    fn discard_noise_clears_pure_garbage() {
        let mut a = acc(16);
        a.append(&[0x01, 0x02, 0x03]);
        let outcome = a.scan();
        assert_eq!(a.discard_noise(outcome), 3);
        assert!(a.is_empty());
    }
}
