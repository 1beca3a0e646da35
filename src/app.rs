//*** START FILE: src/app.rs ***//
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{CoachError, CoachResult};
use crate::practice::PracticeDeckManager;
use crate::reading::{
    highlighted_segments, PendingLookup, ReadingEvent, ReadingState, Rect, Resolution, SegmentOffsetIndex,
    SelectionEvent, SelectionResolver, SelectionSource, Viewport,
};
use crate::services::{Backend, Speech};
use crate::session::{Credentials, Session, SessionStore};
use crate::store::KeyValueStore;
use crate::types::lookup::{LookupResult, NewFlashcard};
use crate::types::story::{Story, StoryId, StorySummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

/// The reader's whole interaction state. Every handler runs to completion
/// before the next one; only lookups are split into begin/complete so two of
/// them can be in flight at once.
pub struct CoachApp<B: Backend, S: KeyValueStore> {
    backend: B,
    sessions: SessionStore<S>,
    session: Option<Session>,
    speech: Option<Box<dyn Speech>>,
    speech_lang: String,
    viewport: Viewport,
    resolver: SelectionResolver,
    levels: Vec<String>,
    selected_level: Option<String>,
    stories: Vec<StorySummary>,
    story: Option<Story>,
    index: Option<SegmentOffsetIndex>,
    reading: ReadingState,
    practice: PracticeDeckManager<S>,
}

impl<B: Backend, S: KeyValueStore> CoachApp<B, S> {
    /// Restores a stored session, if any, and loads its learned map.
    pub fn new(backend: B, store: Arc<S>, config: &Config) -> Self {
        let sessions = SessionStore::new(store.clone());
        let session = sessions.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not restore session");
            None
        });
        let identity = session.as_ref().and_then(|s| s.identity()).map(str::to_string);
        CoachApp {
            backend,
            sessions,
            session,
            speech: None,
            speech_lang: config.speech_lang.clone(),
            viewport: Viewport { scroll_x: 0.0, scroll_y: 0.0, width: config.viewport_width },
            resolver: SelectionResolver::new(config.granularity, config.bubble),
            levels: Vec::new(),
            selected_level: None,
            stories: Vec::new(),
            story: None,
            index: None,
            reading: ReadingState::default(),
            practice: PracticeDeckManager::new(store, identity),
        }
    }

    pub fn with_speech(mut self, speech: Box<dyn Speech>) -> Self {
        self.speech = Some(speech);
        self
    }

    fn update_reading(&mut self, event: ReadingEvent) {
        let state = std::mem::take(&mut self.reading);
        self.reading = state.apply(event);
    }

    // Surfaces an error without touching anything else.
    fn record<T>(&mut self, result: CoachResult<T>) -> CoachResult<T> {
        if let Err(e) = &result {
            self.update_reading(ReadingEvent::Error(e.to_string()));
        }
        result
    }

    pub fn token(&self) -> &str {
        self.session.as_ref().map_or("", |s| s.token.as_str())
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub async fn authenticate(&mut self, mode: AuthMode, credentials: &Credentials) -> CoachResult<()> {
        self.update_reading(ReadingEvent::ClearError);
        let result = match mode {
            AuthMode::Login => self.backend.login(credentials).await,
            AuthMode::Register => self.backend.register(credentials).await,
        };
        let session = self.record(result)?;
        info!(username = %session.username, "signed in");
        self.sessions.save(&session);
        self.practice.set_identity(session.identity().map(str::to_string));
        self.session = Some(session);
        self.refresh_library().await
    }

    pub fn logout(&mut self) {
        self.sessions.clear();
        self.session = None;
        self.levels.clear();
        self.selected_level = None;
        self.stories.clear();
        self.story = None;
        self.index = None;
        self.resolver.invalidate();
        self.update_reading(ReadingEvent::Dismiss);
        self.practice.set_flashcards(Vec::new());
        self.practice.set_identity(None);
    }

    /// Levels and flashcards; nothing to fetch without a session.
    pub async fn refresh_library(&mut self) -> CoachResult<()> {
        if self.token().is_empty() {
            return Ok(());
        }
        let result = self.backend.levels(self.token()).await;
        self.levels = self.record(result)?;
        self.refresh_flashcards().await
    }

    pub async fn refresh_flashcards(&mut self) -> CoachResult<()> {
        let result = self.backend.flashcards(self.token()).await;
        let cards = self.record(result)?;
        self.practice.set_flashcards(cards);
        Ok(())
    }

    pub async fn select_level(&mut self, level: &str) -> CoachResult<()> {
        self.selected_level = Some(level.to_string()).filter(|l| !l.is_empty());
        if level.is_empty() {
            return Ok(());
        }
        let result = self.backend.stories(self.token(), level).await;
        self.stories = self.record(result)?;
        Ok(())
    }

    pub async fn select_story(&mut self, id: StoryId) -> CoachResult<()> {
        let result = self.backend.story(self.token(), id).await;
        let story = self.record(result)?;
        self.load_story(story);
        Ok(())
    }

    /// Rebuilds the offset index only when a different story comes in; the
    /// old bubble, highlight and any lookup still in flight go with the old
    /// story.
    pub fn load_story(&mut self, story: Story) {
        if self.story.as_ref() == Some(&story) {
            return;
        }
        info!(id = story.id, title = %story.title, segments = story.segments.len(), "story loaded");
        self.index = Some(SegmentOffsetIndex::build(&story));
        self.story = Some(story);
        self.resolver.invalidate();
        self.update_reading(ReadingEvent::StoryChanged);
    }

    /// First half of a selection: classify, locate, stamp. None when there is
    /// no story or the selection is blank.
    pub fn begin_selection(&mut self, event: &SelectionEvent) -> Option<PendingLookup> {
        let index = self.index.as_ref()?;
        self.resolver.begin(event, index)
    }

    /// Second half: apply the lookup answer unless a newer selection was made
    /// in the meantime.
    pub fn complete_selection(&mut self, pending: PendingLookup, outcome: CoachResult<LookupResult>) -> Resolution {
        let resolution = self.resolver.finish(pending, outcome, &self.viewport);
        self.update_reading(ReadingEvent::Resolved(resolution.clone()));
        resolution
    }

    pub async fn lookup(&self, pending: &PendingLookup) -> CoachResult<LookupResult> {
        self.backend.lookup(self.token(), &pending.request).await
    }

    pub async fn select(&mut self, event: &SelectionEvent) -> Option<Resolution> {
        let pending = self.begin_selection(event)?;
        let outcome = self.lookup(&pending).await;
        Some(self.complete_selection(pending, outcome))
    }

    pub async fn select_from(&mut self, source: &dyn SelectionSource) -> Option<Resolution> {
        let event = SelectionEvent::from_source(source);
        self.select(&event).await
    }

    /// Reads the segment aloud and looks it up with its exact range.
    pub async fn click_segment(&mut self, segment_index: usize, rect: Option<Rect>) -> Option<Resolution> {
        let hanzi = self.story.as_ref()?.segments.get(segment_index)?.hanzi.clone();
        self.speak(&hanzi);
        let event = SelectionEvent::segment_click(self.index.as_ref()?, &hanzi, segment_index, rect)?;
        self.select(&event).await
    }

    /// Saves the live bubble as a flashcard and reloads the collection.
    pub async fn save_flashcard(&mut self) -> CoachResult<()> {
        let Some(bubble) = &self.reading.bubble else {
            return Ok(());
        };
        let card = NewFlashcard::from(&bubble.result);
        let result = self.backend.create_flashcard(self.token(), &card).await;
        self.record(result)?;
        info!(text = %card.source_text, "flashcard saved");
        self.refresh_flashcards().await
    }

    pub fn dismiss_bubble(&mut self) {
        self.update_reading(ReadingEvent::Dismiss);
    }

    fn speak(&self, text: &str) {
        if let Some(speech) = &self.speech {
            speech.speak(text, &self.speech_lang);
        }
    }

    pub fn speak_story(&self) {
        if let Some(index) = &self.index {
            self.speak(index.plain_text());
        }
    }

    pub fn speak_bubble(&self) {
        if let Some(bubble) = &self.reading.bubble {
            self.speak(bubble.text());
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn selected_level(&self) -> Option<&str> {
        self.selected_level.as_deref()
    }

    pub fn stories(&self) -> &[StorySummary] {
        &self.stories
    }

    pub fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    pub fn index(&self) -> Option<&SegmentOffsetIndex> {
        self.index.as_ref()
    }

    pub fn reading(&self) -> &ReadingState {
        &self.reading
    }

    pub fn error(&self) -> Option<&str> {
        self.reading.error.as_deref()
    }

    /// Segments to draw highlighted for the live bubble.
    pub fn highlighted_segments(&self) -> Vec<usize> {
        match &self.index {
            Some(index) => highlighted_segments(index.ranges(), self.reading.highlighted),
            None => Vec::new(),
        }
    }

    pub fn practice(&self) -> &PracticeDeckManager<S> {
        &self.practice
    }

    pub fn practice_mut(&mut self) -> &mut PracticeDeckManager<S> {
        &mut self.practice
    }

    pub fn report(&mut self, error: &CoachError) {
        self.update_reading(ReadingEvent::Error(error.to_string()));
    }
}
//*** END FILE: src/app.rs ***//
