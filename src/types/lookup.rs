//*** START FILE: src/types/lookup.rs ***//
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarseness of a selection. Declared in threshold order so `Ord` follows it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Character,
    Word,
    Phrase,
    Clause,
    Sentence,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Character => "character",
            Granularity::Word => "word",
            Granularity::Phrase => "phrase",
            Granularity::Clause => "clause",
            Granularity::Sentence => "sentence",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "character" => Ok(Granularity::Character),
            "word" => Ok(Granularity::Word),
            "phrase" => Ok(Granularity::Phrase),
            "clause" => Ok(Granularity::Clause),
            "sentence" => Ok(Granularity::Sentence),
            other => Err(format!("Unknown granularity '{}'", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub text: String,
    pub granularity: Granularity,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LookupResult {
    pub text: String,
    #[serde(default)]
    pub pinyin: String,
    pub translation: String,
    pub granularity: Granularity,
}

pub type FlashcardId = i64;

/// A saved lookup, as the flashcard store hands it back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Flashcard {
    pub id: FlashcardId,
    pub source_text: String,
    // The store keeps null for cards saved without a reading.
    #[serde(default)]
    pub pinyin: Option<String>,
    pub translation: String,
    pub granularity: Granularity,
}

/// Body of a flashcard creation request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewFlashcard {
    pub source_text: String,
    pub pinyin: String,
    pub translation: String,
    pub granularity: Granularity,
}

impl From<&LookupResult> for NewFlashcard {
    fn from(result: &LookupResult) -> Self {
        NewFlashcard {
            source_text: result.text.clone(),
            pinyin: result.pinyin.clone(),
            translation: result.translation.clone(),
            granularity: result.granularity,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FlashcardList {
    pub flashcards: Vec<Flashcard>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_uses_lowercase_wire_names() {
        let json = serde_json::to_string(&Granularity::Clause).unwrap();
        assert_eq!(json, "\"clause\"");
        let back: Granularity = serde_json::from_str("\"sentence\"").unwrap();
        assert_eq!(back, Granularity::Sentence);
    }

    #[test]
    fn granularity_order_follows_thresholds() {
        assert!(Granularity::Character < Granularity::Word);
        assert!(Granularity::Word < Granularity::Phrase);
        assert!(Granularity::Phrase < Granularity::Clause);
        assert!(Granularity::Clause < Granularity::Sentence);
    }

    #[test]
    fn flashcard_accepts_null_pinyin() {
        let card: Flashcard = serde_json::from_str(
            r#"{"id":4,"source_text":"猫","pinyin":null,"translation":"cat","granularity":"character"}"#,
        )
        .unwrap();
        assert_eq!(card.pinyin, None);
        assert_eq!(card.granularity, Granularity::Character);
    }
}
//*** END FILE: src/types/lookup.rs ***//
