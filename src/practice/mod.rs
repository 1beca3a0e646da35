pub mod deck;
pub mod learned;

pub use deck::{PracticeAction, PracticeCursor, PracticeDeckManager, PracticeFilter, PracticeState};
pub use learned::{learned_key, LearnedMap};
