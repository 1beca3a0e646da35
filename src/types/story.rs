//*** START FILE: src/types/story.rs ***//
use serde::{Deserialize, Serialize};

pub type StoryId = i64;

/// One display unit of a story. `hanzi` is never empty; `pinyin` may be
/// missing (punctuation usually has none).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Segment {
    pub hanzi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinyin: Option<String>,
}

impl Segment {
    pub fn new(hanzi: &str, pinyin: Option<&str>) -> Self {
        Segment {
            hanzi: hanzi.to_string(),
            pinyin: pinyin.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub segments: Vec<Segment>,
}

impl Story {
    /// The text every offset in the reader refers to.
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.hanzi.as_str()).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StorySummary {
    pub id: StoryId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

// Wire envelopes, `{ "levels": [...] }` and `{ "stories": [...] }`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LevelList {
    pub levels: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct StoryList {
    pub stories: Vec<StorySummary>,
}
//*** END FILE: src/types/story.rs ***//
