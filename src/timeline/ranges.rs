//! Operations over sorted, disjoint lists of closed frame intervals.
//!
//! The maintained invariant: ranges are sorted by `start` and pairwise
//! disjoint. Ranges may touch: a boundary between two adjacent ranges is
//! load-bearing (a hold-keyframe value jump, the motion-blur split) and every
//! operation here preserves it.

use crate::foundation::core::{Frame, TimeRange};

/// Intersect `dst` with `src` in place.
///
/// A frame is covered by the result iff it is covered by both inputs: content
/// is static only where all contributors are static. Range boundaries from
/// either input survive in the result; touching ranges are never re-joined,
/// so a split one contributor introduced cannot be erased by merging in
/// another.
pub fn merge_time_ranges(dst: &mut Vec<TimeRange>, src: &[TimeRange]) {
    let mut out = Vec::with_capacity(dst.len().max(src.len()));
    let mut i = 0;
    let mut j = 0;
    while i < dst.len() && j < src.len() {
        let a = dst[i];
        let b = src[j];
        let start = a.start.max(b.start);
        let end = a.end.min(b.end);
        if start <= end {
            out.push(TimeRange { start, end });
        }
        if a.end < b.end {
            i += 1;
        } else {
            j += 1;
        }
    }
    *dst = out;
}

/// Ensure `frame` is a range boundary, splitting any range that straddles it.
///
/// The covered frame set is unchanged; a range `[s, e]` with `s < frame <= e`
/// becomes `[s, frame - 1], [frame, e]`. The two halves stay adjacent on
/// purpose: callers split exactly where representative frames must diverge.
pub fn split_time_ranges_at(ranges: &mut Vec<TimeRange>, frame: Frame) {
    let idx = ranges.partition_point(|r| r.end < frame);
    if idx >= ranges.len() {
        return;
    }
    let r = ranges[idx];
    if r.contains(frame) && frame > r.start {
        ranges[idx] = TimeRange {
            start: r.start,
            end: frame - 1,
        };
        ranges.insert(
            idx + 1,
            TimeRange {
                start: frame,
                end: r.end,
            },
        );
    }
}

/// Shift every range by `delta` frames.
///
/// Used to convert ranges expressed in another timeline (a track matte, a
/// parent layer) into the current layer's local frame space.
pub fn offset_time_ranges(ranges: &mut [TimeRange], delta: i64) {
    for r in ranges.iter_mut() {
        *r = r.shift(delta);
    }
}

/// Remove the closed interval `[start, end]` from the covered set.
///
/// This is the exclude-varying primitive: a contributor calls it for every
/// span during which its value changes. An inverted interval removes nothing.
pub fn subtract_from_time_ranges(ranges: &mut Vec<TimeRange>, start: Frame, end: Frame) {
    if start > end {
        return;
    }
    let mut out = Vec::with_capacity(ranges.len() + 1);
    for r in ranges.iter() {
        if r.end < start || r.start > end {
            out.push(*r);
            continue;
        }
        if r.start < start {
            out.push(TimeRange {
                start: r.start,
                end: start - 1,
            });
        }
        if r.end > end {
            out.push(TimeRange {
                start: end + 1,
                end: r.end,
            });
        }
    }
    *ranges = out;
}

/// Return `true` iff `[from, to]` is not fully covered by `ranges`.
///
/// Coverage may be stitched from several adjacent ranges (splits keep the
/// covered set intact).
pub fn has_varying_time_range(ranges: &[TimeRange], from: Frame, to: Frame) -> bool {
    let mut cursor = from;
    for r in ranges {
        if r.end < cursor {
            continue;
        }
        if r.start > cursor {
            return true;
        }
        cursor = r.end + 1;
        if cursor > to {
            return false;
        }
    }
    cursor <= to
}

/// Map `frame` to the representative (start) frame of the range containing it.
///
/// Identity when no range covers `frame`. This is the collapse that lets every
/// frame of a static span share one cache entry.
pub fn convert_frame_by_static_time_ranges(ranges: &[TimeRange], frame: Frame) -> Frame {
    let idx = ranges.partition_point(|r| r.end < frame);
    match ranges.get(idx) {
        Some(r) if r.contains(frame) => r.start,
        _ => frame,
    }
}
