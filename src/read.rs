//! Raw access to the shared input
//!
//! The input is memory-mapped once and shared by every worker. Each worker
//! copies its nominal range (plus the read-ahead pad) into an owned buffer and
//! scans it with a [`LineScanner`].

use std::{fs::File, path::Path, sync::Arc};

use memmap2::Mmap;

use crate::{
    core::WorkerPlan,
    error::{ReadError, Result},
};

/// The line terminator separating FASTA lines
pub const TERMINATOR: u8 = b'\n';

/// A read-only view of the input file shared by all workers
///
/// Cloning is cheap: the memory map is reference counted, so every worker
/// thread holds a handle to the same mapping.
#[derive(Clone)]
pub struct SharedInput {
    /// Memory mapped file contents, `None` for an empty file
    mmap: Option<Arc<Mmap>>,
}
impl SharedInput {
    /// Opens and memory-maps the input file
    ///
    /// Empty files are not mapped; they behave as a zero-length input.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Self { mmap: None });
        }

        // Safety: the file is open and won't be modified while mapped
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Some(Arc::new(mmap)),
        })
    }

    /// Size of the shared input in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.as_ref().map_or(0, |m| m.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the full mapped contents
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().map(|m| &m[..]).unwrap_or_default()
    }

    /// Copies `len` bytes starting at `offset` into `dst`
    ///
    /// `dst` is cleared first and grown to fit, so a worker can reuse one buffer
    /// across runs.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Truncated`] if the requested range extends past the
    /// end of the input.
    pub fn read_at(&self, offset: usize, len: usize, dst: &mut Vec<u8>) -> Result<()> {
        let bytes = self.as_bytes();
        let Some(src) = offset
            .checked_add(len)
            .and_then(|end| bytes.get(offset..end))
        else {
            return Err(ReadError::Truncated {
                offset,
                len,
                available: bytes.len(),
            }
            .into());
        };
        dst.clear();
        dst.extend_from_slice(src);
        Ok(())
    }

    /// Reads the raw segment described by a worker plan
    pub fn read_segment(&self, plan: &WorkerPlan, dst: &mut Vec<u8>) -> Result<()> {
        self.read_at(plan.nominal_offset, plan.buffer_size, dst)
    }
}

/// A bounds-safe, restartable scanner over the lines of a byte buffer
///
/// Iterating yields each line without its terminator. A final line that is
/// not terminated is still yielded. The scanner never reads past the end of
/// its buffer; searches that find nothing return `None`.
#[derive(Clone, Debug)]
pub struct LineScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}
impl<'a> LineScanner<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current position of the scanner within its buffer
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Restarts scanning at `pos` (clamped to the buffer length)
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    /// Finds the first terminator at or after `from`, looking at most `window` bytes
    ///
    /// Returns the index of the terminator within the buffer, or `None` if the
    /// window (clipped to the buffer) holds no terminator.
    #[must_use]
    pub fn find_terminator(&self, from: usize, window: usize) -> Option<usize> {
        let end = from.saturating_add(window).min(self.bytes.len());
        let haystack = self.bytes.get(from..end)?;
        memchr::memchr(TERMINATOR, haystack).map(|idx| from + idx)
    }
}
impl<'a> Iterator for LineScanner<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.bytes.get(self.pos..)?;
        if rest.is_empty() {
            return None;
        }
        match memchr::memchr(TERMINATOR, rest) {
            Some(idx) => {
                self.pos += idx + 1;
                Some(&rest[..idx])
            }
            None => {
                self.pos = self.bytes.len();
                Some(rest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn shared(bytes: &[u8]) -> (tempfile::NamedTempFile, SharedInput) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        let input = SharedInput::open(file.path()).unwrap();
        (file, input)
    }

    #[test]
    fn test_read_at() {
        let (_file, input) = shared(b">one\nACGT\n>two\nTTGA\n");
        assert_eq!(input.len(), 20);

        let mut buf = Vec::new();
        input.read_at(5, 4, &mut buf).unwrap();
        assert_eq!(buf, b"ACGT");

        // buffer is reused and shrunk
        input.read_at(0, 1, &mut buf).unwrap();
        assert_eq!(buf, b">");
    }

    #[test]
    fn test_read_past_end() {
        let (_file, input) = shared(b">one\nACGT\n");
        let mut buf = Vec::new();
        let err = input.read_at(8, 4, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ReadError(ReadError::Truncated { available: 10, .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        let (_file, input) = shared(b"");
        assert!(input.is_empty());
        let mut buf = vec![1, 2, 3];
        input.read_at(0, 0, &mut buf).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_read_segment() {
        let (_file, input) = shared(b">a\nAC\n>b\nGT\n>c\nTT\n");
        let plan = WorkerPlan::new(input.len(), 2, 1, 4).unwrap();
        let mut buf = Vec::new();
        input.read_segment(&plan, &mut buf).unwrap();
        assert_eq!(buf, b"GT\n>c\nTT\n");
    }

    #[test]
    fn test_lines() {
        let lines: Vec<&[u8]> = LineScanner::new(b">a\nAC\n\nGT").collect();
        assert_eq!(lines, vec![&b">a"[..], b"AC", b"", b"GT"]);
        assert_eq!(LineScanner::new(b"").count(), 0);
        assert_eq!(LineScanner::new(b"\n").count(), 1);
    }

    #[test]
    fn test_restart() {
        let mut scanner = LineScanner::new(b"AC\nGT\nTT\n");
        assert_eq!(scanner.next(), Some(&b"AC"[..]));
        assert_eq!(scanner.position(), 3);
        scanner.seek(6);
        assert_eq!(scanner.next(), Some(&b"TT"[..]));
        assert_eq!(scanner.next(), None);
        scanner.seek(100);
        assert_eq!(scanner.position(), 9);
    }

    #[test]
    fn test_find_terminator() {
        let scanner = LineScanner::new(b"ACGT\nAC\n");
        assert_eq!(scanner.find_terminator(0, 8), Some(4));
        assert_eq!(scanner.find_terminator(4, 1), Some(4));
        assert_eq!(scanner.find_terminator(5, 2), None);
        assert_eq!(scanner.find_terminator(5, 3), Some(7));
        assert_eq!(scanner.find_terminator(8, 10), None);
        assert_eq!(scanner.find_terminator(50, 10), None);
    }
}
