//*** START FILE: src/reading/offsets.rs ***//
use crate::types::story::{Story, StoryId};

/// Half-open `[start, end)` interval into a story's plain text, counted in
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentRange {
    pub start: usize,
    pub end: usize,
}

impl SegmentRange {
    pub fn new(start: usize, end: usize) -> Self {
        SegmentRange { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Prefix-offset table for one story. Built once per story load and never
/// mutated; ranges are contiguous, start at 0 and end at the plain text length.
#[derive(Debug, Clone, Default)]
pub struct SegmentOffsetIndex {
    story_id: StoryId,
    ranges: Vec<SegmentRange>,
    plain_text: String,
}

impl SegmentOffsetIndex {
    pub fn build(story: &Story) -> Self {
        let mut ranges = Vec::with_capacity(story.segments.len());
        let mut plain_text = String::new();
        let mut cursor = 0;
        for segment in &story.segments {
            let start = cursor;
            cursor += segment.hanzi.chars().count();
            ranges.push(SegmentRange::new(start, cursor));
            plain_text.push_str(&segment.hanzi);
        }
        SegmentOffsetIndex {
            story_id: story.id,
            ranges,
            plain_text,
        }
    }

    pub fn story_id(&self) -> StoryId {
        self.story_id
    }

    pub fn ranges(&self) -> &[SegmentRange] {
        &self.ranges
    }

    pub fn range_of(&self, segment_index: usize) -> Option<SegmentRange> {
        self.ranges.get(segment_index).copied()
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    /// Character length of the plain text (the end of the last range).
    pub fn text_len(&self) -> usize {
        self.ranges.last().map_or(0, |r| r.end)
    }

    /// Range of the first occurrence of `needle` in the plain text. Repeated
    /// substrings always resolve to the first one.
    pub fn find_first(&self, needle: &str) -> Option<SegmentRange> {
        if needle.is_empty() {
            return None;
        }
        let byte_index = self.plain_text.find(needle)?;
        let start = self.plain_text[..byte_index].chars().count();
        Some(SegmentRange::new(start, start + needle.chars().count()))
    }
}

//*** END FILE: src/reading/offsets.rs ***//
