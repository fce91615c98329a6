use std::ops::Range;

/// A worker's corrected byte range into the shared input
///
/// `start` and `end` are absolute offsets forming the half-open range
/// `[start, end)`; `buffer_size` records how many raw bytes the worker read to
/// derive them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteSegment {
    pub start: usize,
    pub end: usize,
    pub buffer_size: usize,
}
impl ByteSegment {
    #[must_use]
    pub fn new(start: usize, end: usize, buffer_size: usize) -> Self {
        debug_assert!(start <= end, "segment start past its end");
        Self {
            start,
            end,
            buffer_size,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Translates the absolute range into a range within a buffer read at `offset`
    #[must_use]
    pub fn local_range(&self, offset: usize) -> Range<usize> {
        (self.start - offset)..(self.end - offset)
    }
}
