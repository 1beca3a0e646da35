//*** START FILE: src/reading/classifier.rs ***//
use serde::Deserialize;

use crate::types::lookup::Granularity;

/// Upper bounds (inclusive, in characters) for each granularity below
/// `Sentence`. Anything longer than `clause` is a sentence.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct GranularityThresholds {
    pub character: usize,
    pub word: usize,
    pub phrase: usize,
    pub clause: usize,
}

impl Default for GranularityThresholds {
    fn default() -> Self {
        GranularityThresholds {
            character: 1,
            word: 3,
            phrase: 9,
            clause: 20,
        }
    }
}

impl GranularityThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.character <= self.word && self.word <= self.phrase && self.phrase <= self.clause {
            Ok(())
        } else {
            Err(format!(
                "granularity thresholds must be ascending (character <= word <= phrase <= clause), got {}/{}/{}/{}",
                self.character, self.word, self.phrase, self.clause
            ))
        }
    }

    /// Whitespace is dropped before measuring. Length is in code points,
    /// one per hanzi.
    pub fn classify(&self, text: &str) -> Granularity {
        let n = text.chars().filter(|c| !c.is_whitespace()).count();
        if n <= self.character {
            Granularity::Character
        } else if n <= self.word {
            Granularity::Word
        } else if n <= self.phrase {
            Granularity::Phrase
        } else if n <= self.clause {
            Granularity::Clause
        } else {
            Granularity::Sentence
        }
    }
}

/// Classify with the stock thresholds (1/3/9/20).
pub fn classify(text: &str) -> Granularity {
    GranularityThresholds::default().classify(text)
}

//*** END FILE: src/reading/classifier.rs ***//
