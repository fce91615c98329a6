//! Output assembly and positional writes
//!
//! A worker serializes its records into a local buffer using the canonical
//! layout:
//!
//! ```text
//! >header
//! SEQUENCE
//!
//! >header
//! SEQUENCE
//! ```
//!
//! with exactly one blank line between records and none after the last. The
//! buffer is then written at the worker's absolute offset in the shared output.
//!
//! # Example
//!
//! ```rust
//! use seqtrans::{assemble, Record, Successor};
//!
//! let records = vec![Record::complete(b"one", b"MK"), Record::complete(b"two", b"W")];
//! let mut buffer = Vec::new();
//! assemble(&records, Successor::End, &mut buffer);
//! assert_eq!(buffer, b">one\nMK\n\n>two\nW\n");
//! ```

use std::{
    fs::{File, OpenOptions},
    path::Path,
    sync::Arc,
};

use crate::{
    core::Record,
    error::{Result, WriteError},
    exchange::Successor,
    extract::HEADER_MARKER,
};

/// Separator emitted between two records: ends the sequence line and adds a blank line
const RECORD_SEPARATOR: &[u8] = b"\n\n";

/// Serializes a worker's records into `dst`
///
/// The tail of the locally last record depends on what follows it in the
/// global output, which only the marker exchange can tell:
///
/// * [`Successor::Fragment`] - the next non-empty worker continues this
///   record's sequence, so nothing is appended.
/// * [`Successor::Complete`] - another record follows: `\n\n`.
/// * [`Successor::End`] - this is the last record of the output: `\n`.
///
/// Fragments emit no header line, only their sequence.
pub fn assemble(records: &[Record], successor: Successor, dst: &mut Vec<u8>) {
    dst.clear();
    dst.reserve(
        records
            .iter()
            .map(|r| r.serialized_len() + RECORD_SEPARATOR.len())
            .sum(),
    );

    let Some((last, rest)) = records.split_last() else {
        return;
    };
    for record in rest {
        push_record(record, dst);
        dst.extend_from_slice(RECORD_SEPARATOR);
    }
    push_record(last, dst);
    match successor {
        Successor::Fragment => {}
        Successor::Complete => dst.extend_from_slice(RECORD_SEPARATOR),
        Successor::End => dst.push(b'\n'),
    }
}

fn push_record(record: &Record, dst: &mut Vec<u8>) {
    if let Some(header) = record.header() {
        dst.push(HEADER_MARKER);
        dst.extend_from_slice(header);
        dst.push(b'\n');
    }
    dst.extend_from_slice(record.sequence());
}

/// The output file shared by all workers
///
/// Every worker writes a disjoint byte range, so positional writes through a
/// shared handle need no locking.
#[derive(Clone)]
pub struct SharedOutput {
    file: Arc<File>,
}
impl SharedOutput {
    /// Opens the output in create/write mode without truncating it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        Ok(Self {
            file: Arc::new(file),
        })
    }

    /// Writes the whole buffer at the absolute `offset`
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        write_all_at(&self.file, buf, offset)
    }

    /// Sets the final length of the output, dropping stale trailing bytes
    pub fn set_len(&self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        Ok(())
    }

    /// Flushes written data to the storage layer
    pub fn sync(&self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)?;
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => {
                return Err(WriteError::ShortWrite {
                    offset,
                    remaining: buf.len(),
                }
                .into())
            }
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Converts a buffer length into a file offset
pub(crate) fn offset_len(len: usize) -> Result<u64> {
    u64::try_from(len).map_err(|_| WriteError::OffsetOverflow.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembled(records: &[Record], successor: Successor) -> Vec<u8> {
        let mut buffer = vec![b'?'; 4];
        assemble(records, successor, &mut buffer);
        buffer
    }

    #[test]
    fn test_canonical_layout() {
        let records = vec![
            Record::complete(b"one", b"MKV"),
            Record::complete(b"two", b"W"),
        ];
        assert_eq!(
            assembled(&records, Successor::End),
            b">one\nMKV\n\n>two\nW\n"
        );
        assert_eq!(
            assembled(&records, Successor::Complete),
            b">one\nMKV\n\n>two\nW\n\n"
        );
        assert_eq!(
            assembled(&records, Successor::Fragment),
            b">one\nMKV\n\n>two\nW"
        );
    }

    #[test]
    fn test_fragment_has_no_header() {
        let records = vec![Record::fragment(b"KK"), Record::complete(b"two", b"W")];
        assert_eq!(assembled(&records, Successor::End), b"KK\n\n>two\nW\n");
    }

    #[test]
    fn test_seam_reassembles() {
        // a record split between two workers after its header line
        let mut left = Vec::new();
        assemble(
            &[Record::complete(b"one", b"M"), Record::complete(b"two", b"")],
            Successor::Fragment,
            &mut left,
        );
        let mut right = Vec::new();
        assemble(&[Record::fragment(b"KV")], Successor::End, &mut right);
        left.extend_from_slice(&right);

        let mut whole = Vec::new();
        assemble(
            &[Record::complete(b"one", b"M"), Record::complete(b"two", b"KV")],
            Successor::End,
            &mut whole,
        );
        assert_eq!(left, whole);
    }

    #[test]
    fn test_empty_records() {
        assert!(assembled(&[], Successor::Complete).is_empty());
        assert!(assembled(&[], Successor::End).is_empty());
    }

    #[test]
    fn test_write_at() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let output = SharedOutput::open(file.path()).unwrap();
        output.write_at(4, b"EFGH").unwrap();
        output.write_at(0, b"ABCD").unwrap();
        output.sync().unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), b"ABCDEFGH");

        output.set_len(6).unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), b"ABCDEF");
    }
}
