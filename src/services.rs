//*** START FILE: src/services.rs ***//
use async_trait::async_trait;

use crate::error::CoachResult;
use crate::session::{Credentials, Session};
use crate::types::lookup::{Flashcard, LookupRequest, LookupResult, NewFlashcard};
use crate::types::story::{Story, StoryId, StorySummary};

// Every call carries the bearer token; an empty token means "not logged in".

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> CoachResult<Session>;
    async fn register(&self, credentials: &Credentials) -> CoachResult<Session>;
}

#[async_trait]
pub trait StoryService: Send + Sync {
    async fn levels(&self, token: &str) -> CoachResult<Vec<String>>;
    async fn stories(&self, token: &str, level: &str) -> CoachResult<Vec<StorySummary>>;
    async fn story(&self, token: &str, id: StoryId) -> CoachResult<Story>;
}

#[async_trait]
pub trait LookupService: Send + Sync {
    async fn lookup(&self, token: &str, request: &LookupRequest) -> CoachResult<LookupResult>;
}

#[async_trait]
pub trait FlashcardStore: Send + Sync {
    async fn flashcards(&self, token: &str) -> CoachResult<Vec<Flashcard>>;
    async fn create_flashcard(&self, token: &str, card: &NewFlashcard) -> CoachResult<()>;
}

/// Everything the reader talks to over the wire.
pub trait Backend: AuthService + StoryService + LookupService + FlashcardStore {}

impl<T> Backend for T where T: AuthService + StoryService + LookupService + FlashcardStore {}

/// Text-to-speech. Fire-and-forget; never awaited.
pub trait Speech: Send + Sync {
    fn speak(&self, text: &str, lang: &str);
}
//*** END FILE: src/services.rs ***//
