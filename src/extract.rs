//! Record extraction from a corrected segment

use crate::{core::utils::trim_cr, core::Record, read::LineScanner};

/// The marker byte that opens a FASTA header line
pub const HEADER_MARKER: u8 = b'>';

/// Extracts the ordered records of a corrected segment
///
/// The segment must start on a line boundary, which the boundary reconciler
/// guarantees. Sequence lines found before the first header continue a record
/// owned by a lower-id worker and are returned as a single leading
/// [`Record::Fragment`]. Each header line opens a [`Record::Complete`] whose
/// sequence is the concatenation of the following lines with their
/// terminators stripped. Empty lines are skipped.
#[must_use]
pub fn extract_records(segment: &[u8]) -> Vec<Record> {
    let mut records = Vec::new();
    extend_records(segment, &mut records);
    records
}

/// Same as [`extract_records`], appending into an existing list
pub fn extend_records(segment: &[u8], records: &mut Vec<Record>) {
    let first_new = records.len();
    for line in LineScanner::new(segment).map(trim_cr) {
        if let Some(header) = line.strip_prefix(&[HEADER_MARKER]) {
            records.push(Record::complete(header, b""));
        } else if line.is_empty() {
            continue;
        } else if let Some(last) = records[first_new..].last_mut() {
            last.sequence_mut().extend_from_slice(line);
        } else {
            records.push(Record::fragment(line));
        }
    }
}
