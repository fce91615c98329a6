/// Computes the exclusive prefix sum of `values` into `offsets`
///
/// `offsets[i]` is the sum of `values[..i]`. Returns `None` if the running sum
/// overflows.
pub(crate) fn calculate_offsets(values: &[u64], offsets: &mut Vec<u64>) -> Option<u64> {
    offsets.clear();
    let mut total = 0u64;
    for value in values {
        offsets.push(total);
        total = total.checked_add(*value)?;
    }
    Some(total)
}

/// Strips a single trailing carriage return from a line
#[inline]
pub(crate) fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
