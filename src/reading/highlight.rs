use crate::reading::offsets::SegmentRange;

/// A segment lights up only on strict overlap: touching a boundary, or a
/// zero-width highlighted range sitting on one, does not count.
pub fn is_highlighted(
    segment_index: usize,
    ranges: &[SegmentRange],
    highlighted: Option<SegmentRange>,
) -> bool {
    let Some(highlighted) = highlighted else {
        return false;
    };
    match ranges.get(segment_index) {
        Some(range) => range.start < highlighted.end && range.end > highlighted.start,
        None => false,
    }
}

/// Indices of every segment `is_highlighted` accepts.
pub fn highlighted_segments(ranges: &[SegmentRange], highlighted: Option<SegmentRange>) -> Vec<usize> {
    (0..ranges.len())
        .filter(|&i| is_highlighted(i, ranges, highlighted))
        .collect()
}
