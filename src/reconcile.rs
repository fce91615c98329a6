//! Boundary reconciliation
//!
//! Nominal worker ranges cut the input at arbitrary bytes. Each cut point is
//! moved forward to one byte past the next line terminator, so the corrected
//! segments of consecutive workers meet exactly on a line boundary.
//!
//! A cut point `k` (between worker `k - 1` and worker `k`) is evaluated by both
//! neighbours over the same window `[chunk * k, chunk * k + pad]`, so they
//! always agree on where one segment ends and the next begins.

use crate::{
    core::{ByteSegment, WorkerPlan},
    error::{BoundaryError, Result},
    read::LineScanner,
};

/// Resolves cut point `k` using the raw bytes a worker read for `plan`
///
/// # Arguments
///
/// * `plan` - The plan of the worker doing the scan
/// * `buffer` - The raw bytes read for `plan` (starting at `plan.nominal_offset`)
/// * `k` - The cut point to resolve, in `0..=plan.total_workers`
///
/// # Returns
///
/// The absolute offset of the first byte after the terminator that closes the
/// line crossing the nominal cut, or the end of the file if no terminator
/// follows the cut before the end of the file.
///
/// # Errors
///
/// Returns [`BoundaryError::TerminatorNotFound`] if the pad window ends before
/// the end of the file without holding a terminator.
pub fn cut_point(plan: &WorkerPlan, buffer: &[u8], k: usize) -> Result<usize> {
    if k == 0 {
        return Ok(0);
    }
    if k >= plan.total_workers {
        return Ok(plan.file_size);
    }

    let cut = plan.nominal_cut(k);
    debug_assert!(
        cut >= plan.nominal_offset,
        "cut point precedes the worker's read"
    );
    let window = plan.scan_window();
    let scanner = LineScanner::new(buffer);
    match scanner.find_terminator(cut - plan.nominal_offset, window) {
        Some(idx) => Ok(plan.nominal_offset + idx + 1),
        None if cut.saturating_add(window) >= plan.file_size => Ok(plan.file_size),
        None => Err(BoundaryError::TerminatorNotFound { cut, window }.into()),
    }
}

/// Trims a worker's nominal range to line boundaries
///
/// * A single worker owns the whole file and performs no scan.
/// * Worker 0 starts at 0 and scans for its end.
/// * The last worker ends at the end of the file and scans for its start.
/// * Every other worker scans for both ends.
pub fn reconcile(plan: &WorkerPlan, buffer: &[u8]) -> Result<ByteSegment> {
    if plan.is_single() {
        return Ok(ByteSegment::new(0, plan.file_size, plan.buffer_size));
    }

    let start = if plan.is_first() {
        0
    } else {
        cut_point(plan, buffer, plan.id)?
    };
    let end = if plan.is_last() {
        plan.file_size
    } else {
        cut_point(plan, buffer, plan.id + 1)?
    };

    log::debug!(
        "Worker {} corrected [{}, {}) to [{}, {})",
        plan.id,
        plan.nominal_offset,
        plan.nominal_offset + plan.chunk,
        start,
        end
    );
    Ok(ByteSegment::new(start, end, plan.buffer_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reconciles every worker over an in-memory input
    fn segments(input: &[u8], workers: usize, pad: usize) -> Result<Vec<ByteSegment>> {
        WorkerPlan::all(input.len(), workers, pad)?
            .iter()
            .map(|plan| reconcile(plan, &input[plan.read_range()]))
            .collect()
    }

    fn assert_contiguous(input: &[u8], segments: &[ByteSegment]) {
        let mut rebuilt = Vec::new();
        let mut expected_start = 0;
        for segment in segments {
            assert_eq!(segment.start, expected_start);
            rebuilt.extend_from_slice(&input[segment.range()]);
            expected_start = segment.end;
        }
        assert_eq!(expected_start, input.len());
        assert_eq!(rebuilt, input);
    }

    const INPUT: &[u8] = b">one\nACGTACGTAC\n>two\nTTGACCATGA\n>three\nGGGCCCAAAT\n";

    #[test]
    fn test_single_worker() {
        let segments = segments(INPUT, 1, 1).unwrap();
        assert_eq!(segments, vec![ByteSegment::new(0, INPUT.len(), INPUT.len())]);
    }

    #[test]
    fn test_segments_end_on_terminators() {
        let segments = segments(INPUT, 3, 16).unwrap();
        assert_contiguous(INPUT, &segments);
        for segment in &segments[..2] {
            assert_eq!(INPUT[segment.end - 1], b'\n');
        }
    }

    #[test]
    fn test_cut_on_terminator() {
        // ">a\nAC\n" + ">b\nGT\n": the nominal cut (6) is the first byte of a line
        let input = b">a\nAC\n>b\nGT\n";
        let segments = segments(input, 2, 4).unwrap();
        assert_eq!(segments[0].range(), 0..9);
        assert_eq!(segments[1].range(), 9..12);
    }

    #[test]
    fn test_contiguous_for_many_worker_counts() {
        for workers in 1..=INPUT.len() + 3 {
            let segments = segments(INPUT, workers, 16).unwrap();
            assert_eq!(segments.len(), workers);
            assert_contiguous(INPUT, &segments);
        }
    }

    #[test]
    fn test_unterminated_final_line() {
        let input = b">a\nACGTACGT\n>b\nTTTTTTTT";
        for workers in 1..=6 {
            let segments = segments(input, workers, 12).unwrap();
            assert_contiguous(input, &segments);
        }
    }

    #[test]
    fn test_lines_as_long_as_pad() {
        // every line is exactly 8 bytes before its terminator
        let input = b">aaaaaaa\nACGTACGT\n>bbbbbbb\nACGTACGT\n";
        for workers in 2..=input.len() {
            let segments = segments(input, workers, 8).unwrap();
            assert_contiguous(input, &segments);
        }
    }

    #[test]
    fn test_pad_too_small() {
        let input = b">a\nACGTACGTACGTACGTACGT\n>b\nAC\n";
        let err = segments(input, 2, 2).unwrap_err();
        assert!(err.is_pad_too_small());
    }

    #[test]
    fn test_deterministic() {
        let first = segments(INPUT, 4, 16).unwrap();
        for _ in 0..5 {
            assert_eq!(segments(INPUT, 4, 16).unwrap(), first);
        }
    }
}
