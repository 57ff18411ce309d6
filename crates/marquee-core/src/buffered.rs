//! Buffered range handling
//!
//! Elements report buffered ranges as an unordered set that may contain
//! small gaps between segments. These helpers merge them and pick the
//! buffered edge shown on the seek bar.

use crate::types::TimeRange;

/// Gaps narrower than this are treated as contiguous (seconds)
pub const CONTIGUITY_TOLERANCE: f64 = 0.1;

/// Sort and merge ranges, dropping empty or non-finite ones
pub fn merge_ranges(ranges: &[TimeRange]) -> Vec<TimeRange> {
    let mut sorted: Vec<TimeRange> = ranges
        .iter()
        .copied()
        .filter(|r| r.start.is_finite() && r.end.is_finite() && r.end > r.start)
        .collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start - last.end < CONTIGUITY_TOLERANCE => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Right edge of the buffered data at `current_time`.
///
/// Returns the end of the merged range containing `current_time`. When no
/// range contains it, nothing is buffered ahead and the position itself is
/// returned, so the result is never behind the playhead.
pub fn buffered_end(ranges: &[TimeRange], current_time: f64) -> f64 {
    let position = if current_time.is_finite() { current_time.max(0.0) } else { 0.0 };

    merge_ranges(ranges)
        .iter()
        .find(|r| {
            position >= r.start - CONTIGUITY_TOLERANCE && position <= r.end + CONTIGUITY_TOLERANCE
        })
        .map(|r| r.end.max(position))
        .unwrap_or(position)
}
