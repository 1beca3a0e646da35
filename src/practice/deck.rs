//*** START FILE: src/practice/deck.rs ***//
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::practice::learned::{load_learned, persist_learned, LearnedMap};
use crate::store::KeyValueStore;
use crate::types::lookup::{Flashcard, FlashcardId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PracticeFilter {
    #[default]
    All,
    /// Everything not marked learned.
    Unknown,
}

impl fmt::Display for PracticeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeFilter::All => f.write_str("all"),
            PracticeFilter::Unknown => f.write_str("unknown"),
        }
    }
}

impl FromStr for PracticeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(PracticeFilter::All),
            "unknown" => Ok(PracticeFilter::Unknown),
            other => Err(format!("Unknown practice filter '{}' (expected all|unknown)", other)),
        }
    }
}

/// `index` is None exactly when the deck is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PracticeCursor {
    pub index: Option<usize>,
    pub show_answer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PracticeAction {
    SetFilter(PracticeFilter),
    SetFlashcards(Vec<Flashcard>),
    LoadLearned(LearnedMap),
    Next,
    Previous,
    Flip,
    MarkLearned { id: FlashcardId, learned: bool },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PracticeState {
    pub flashcards: Vec<Flashcard>,
    pub filter: PracticeFilter,
    pub learned: LearnedMap,
    pub cursor: PracticeCursor,
}

impl PracticeState {
    pub fn new(flashcards: Vec<Flashcard>, learned: LearnedMap) -> Self {
        PracticeState::default()
            .apply(PracticeAction::LoadLearned(learned))
            .apply(PracticeAction::SetFlashcards(flashcards))
    }

    /// The cards being practiced, in collection order. Learned-state never
    /// reorders, it only hides cards under the `Unknown` filter.
    pub fn deck(&self) -> Vec<&Flashcard> {
        self.flashcards
            .iter()
            .filter(|card| match self.filter {
                PracticeFilter::All => true,
                PracticeFilter::Unknown => !self.learned.is_learned(card.id),
            })
            .collect()
    }

    pub fn deck_len(&self) -> usize {
        self.deck().len()
    }

    pub fn active_card(&self) -> Option<&Flashcard> {
        self.cursor.index.and_then(|i| self.deck().get(i).copied())
    }

    pub fn apply(mut self, action: PracticeAction) -> Self {
        let before_len = self.deck_len();
        let before_index = self.cursor.index;

        match action {
            PracticeAction::SetFilter(filter) => {
                self.filter = filter;
                self.cursor.index = Some(0);
                self.cursor.show_answer = false;
            }
            PracticeAction::SetFlashcards(cards) => self.flashcards = cards,
            PracticeAction::LoadLearned(map) => self.learned = map,
            PracticeAction::Next => self.step(before_len, 1),
            PracticeAction::Previous => self.step(before_len, before_len.saturating_sub(1)),
            PracticeAction::Flip => self.cursor.show_answer = !self.cursor.show_answer,
            PracticeAction::MarkLearned { id, learned } => self.learned.set(id, learned),
        }

        self.settle(before_len, before_index)
    }

    // Cyclic move by `forward` places; decks of one card or less don't move.
    fn step(&mut self, len: usize, forward: usize) {
        if len <= 1 {
            return;
        }
        if let Some(i) = self.cursor.index {
            self.cursor.index = Some((i + forward) % len);
            self.cursor.show_answer = false;
        }
    }

    // Keeps the cursor inside the deck after any change.
    fn settle(mut self, before_len: usize, before_index: Option<usize>) -> Self {
        let len = self.deck_len();
        self.cursor.index = match self.cursor.index {
            _ if len == 0 => None,
            None => Some(0),
            Some(i) if i >= len => Some(len - 1),
            Some(i) => Some(i),
        };
        if len != before_len || self.cursor.index != before_index {
            self.cursor.show_answer = false;
        }
        self
    }
}

/// Practice state plus the store its learned map lives in. Every
/// learned-state change is written through under the current identity.
pub struct PracticeDeckManager<S: KeyValueStore> {
    store: Arc<S>,
    identity: Option<String>,
    state: PracticeState,
}

impl<S: KeyValueStore> PracticeDeckManager<S> {
    pub fn new(store: Arc<S>, identity: Option<String>) -> Self {
        let learned = load_learned(store.as_ref(), identity.as_deref());
        PracticeDeckManager {
            store,
            identity,
            state: PracticeState::new(Vec::new(), learned),
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Reloads the learned map when the identity actually changes.
    pub fn set_identity(&mut self, identity: Option<String>) {
        if self.identity == identity {
            return;
        }
        info!(identity = identity.as_deref().unwrap_or("anon"), "switching learned map");
        let learned = load_learned(self.store.as_ref(), identity.as_deref());
        self.identity = identity;
        self.dispatch(PracticeAction::LoadLearned(learned));
    }

    pub fn dispatch(&mut self, action: PracticeAction) {
        let persist = matches!(action, PracticeAction::MarkLearned { .. });
        let state = std::mem::take(&mut self.state);
        self.state = state.apply(action);
        if persist {
            persist_learned(self.store.as_ref(), self.identity.as_deref(), &self.state.learned);
        }
    }

    pub fn set_flashcards(&mut self, cards: Vec<Flashcard>) {
        self.dispatch(PracticeAction::SetFlashcards(cards));
    }

    pub fn set_filter(&mut self, filter: PracticeFilter) {
        self.dispatch(PracticeAction::SetFilter(filter));
    }

    pub fn next(&mut self) {
        self.dispatch(PracticeAction::Next);
    }

    pub fn previous(&mut self) {
        self.dispatch(PracticeAction::Previous);
    }

    pub fn flip(&mut self) {
        self.dispatch(PracticeAction::Flip);
    }

    pub fn mark_learned(&mut self, id: FlashcardId, learned: bool) {
        self.dispatch(PracticeAction::MarkLearned { id, learned });
    }

    /// Flips the learned flag of the active card. No-op on an empty deck.
    pub fn toggle_active_learned(&mut self) {
        if let Some(id) = self.state.active_card().map(|c| c.id) {
            let learned = !self.state.learned.is_learned(id);
            self.mark_learned(id, learned);
        }
    }

    pub fn state(&self) -> &PracticeState {
        &self.state
    }

    pub fn deck(&self) -> Vec<&Flashcard> {
        self.state.deck()
    }

    pub fn active_card(&self) -> Option<&Flashcard> {
        self.state.active_card()
    }

    pub fn cursor(&self) -> PracticeCursor {
        self.state.cursor
    }

    pub fn filter(&self) -> PracticeFilter {
        self.state.filter
    }

    pub fn is_learned(&self, id: FlashcardId) -> bool {
        self.state.learned.is_learned(id)
    }
}

//*** END FILE: src/practice/deck.rs ***//
