//*** START FILE: src/api/local.rs ***//
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::error::{CoachError, CoachResult};
use crate::services::{AuthService, FlashcardStore, LookupService, StoryService};
use crate::session::{Credentials, Session};
use crate::store::KeyValueStore;
use crate::types::lookup::{Flashcard, Granularity, LookupRequest, LookupResult, NewFlashcard};
use crate::types::story::{Segment, Story, StoryId, StorySummary};

pub const OFFLINE_USERS_KEY: &str = "offlineUsers";
pub const OFFLINE_FLASHCARDS_PREFIX: &str = "offlineFlashcards:";
pub const TRANSLATION_UNAVAILABLE: &str = "Translation unavailable";
const TOKEN_PREFIX: &str = "local-";

#[derive(Debug, Clone)]
struct DictEntry {
    translation: &'static str,
    pinyin: &'static str,
    granularity: Granularity,
}

fn builtin_dictionary() -> HashMap<&'static str, DictEntry> {
    use Granularity::*;
    let rows: [(&str, &str, &str, Granularity); 9] = [
        ("你好", "hello", "nǐ hǎo", Word),
        ("今天", "today", "jīn tiān", Word),
        ("公园", "park", "gōng yuán", Word),
        ("在", "to be at/in", "zài", Character),
        ("我", "I; me", "wǒ", Character),
        ("我们", "we", "wǒ men", Word),
        ("猫", "cat", "māo", Character),
        ("朋友", "friend", "péng you", Word),
        ("我们一起喝热茶。", "We drink hot tea together.", "wǒ men yì qǐ hē rè chá", Sentence),
    ];
    rows.into_iter()
        .map(|(text, translation, pinyin, granularity)| (text, DictEntry { translation, pinyin, granularity }))
        .collect()
}

fn story(id: StoryId, title: &str, level: &str, parts: &[(&str, &str)]) -> Story {
    Story {
        id,
        title: title.to_string(),
        level: Some(level.to_string()),
        segments: parts.iter().map(|(h, p)| Segment::new(h, Some(*p))).collect(),
    }
}

/// The two stories a fresh library ships with.
pub fn seed_stories() -> Vec<Story> {
    vec![
        story(1, "公园里的早晨", "beginner", &[
            ("今天", "jīn tiān"), ("早上", "zǎo shang"), ("，", ""), ("我", "wǒ"),
            ("在", "zài"), ("公园", "gōng yuán"), ("散步", "sàn bù"), ("。", ""),
            ("我", "wǒ"), ("看到", "kàn dào"), ("一只", "yì zhī"), ("猫", "māo"), ("。", ""),
        ]),
        story(2, "一起喝茶", "intermediate", &[
            ("下午", "xià wǔ"), ("，", ""), ("我", "wǒ"), ("和", "hé"), ("朋友", "péng you"),
            ("在", "zài"), ("小店", "xiǎo diàn"), ("聊天", "liáo tiān"), ("。", ""),
            ("我们", "wǒ men"), ("一起", "yì qǐ"), ("喝", "hē"), ("热茶", "rè chá"), ("。", ""),
        ]),
    ]
}

/// Salted with the username so equal passwords don't share a digest.
fn password_digest(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b"|");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn flashcards_key(username: &str) -> String {
    format!("{}{}", OFFLINE_FLASHCARDS_PREFIX, username)
}

/// Username behind a `local-<username>` token.
fn owner(token: &str) -> CoachResult<&str> {
    token
        .strip_prefix(TOKEN_PREFIX)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| CoachError::Transport("Invalid or expired token".to_string()))
}

#[derive(Default)]
struct Cards {
    // newest first, like the server returns them
    list: Vec<Flashcard>,
    next_id: i64,
}

impl Cards {
    fn from_list(list: Vec<Flashcard>) -> Self {
        let next_id = list.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        Cards { list, next_id }
    }
}

/// In-process backend for offline use: seed catalog, built-in dictionary,
/// accounts and per-user flashcards, optionally mirrored into a key-value
/// store so they outlive the process.
pub struct LocalBackend {
    stories: Vec<Story>,
    dictionary: HashMap<&'static str, DictEntry>,
    // username -> password digest
    users: Mutex<HashMap<String, String>>,
    // username -> collection, loaded on first use
    cards: Mutex<HashMap<String, Cards>>,
    persist: Option<Arc<dyn KeyValueStore>>,
}

fn lock<T>(m: &Mutex<T>) -> CoachResult<MutexGuard<'_, T>> {
    m.lock().map_err(|_| CoachError::Transport("offline backend lock poisoned".to_string()))
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBackend {
    pub fn new() -> Self {
        LocalBackend {
            stories: seed_stories(),
            dictionary: builtin_dictionary(),
            users: Mutex::new(HashMap::new()),
            cards: Mutex::new(HashMap::new()),
            persist: None,
        }
    }

    /// Accounts and flashcards are read from and written back to `store`.
    pub fn persistent(store: Arc<dyn KeyValueStore>) -> Self {
        let users: HashMap<String, String> = read_json(store.as_ref(), OFFLINE_USERS_KEY);
        LocalBackend {
            users: Mutex::new(users),
            persist: Some(store),
            ..Self::new()
        }
    }

    pub fn with_stories(mut self, stories: Vec<Story>) -> Self {
        self.stories = stories;
        self
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) {
        let Some(store) = &self.persist else { return };
        let result = serde_json::to_string(value)
            .map_err(|e| e.to_string())
            .and_then(|raw| store.set(key, &raw).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(%key, error = %e, "failed to persist offline data");
        }
    }

    fn load_cards(&self, username: &str) -> Cards {
        match &self.persist {
            Some(store) => Cards::from_list(read_json(store.as_ref(), &flashcards_key(username))),
            None => Cards::from_list(Vec::new()),
        }
    }

    fn session_for(username: &str) -> Session {
        Session {
            token: format!("{}{}", TOKEN_PREFIX, username),
            username: username.to_string(),
        }
    }
}

/// Missing or unreadable entries start empty.
fn read_json<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(%key, error = %e, "ignoring unreadable offline data");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(%key, error = %e, "could not read offline data");
            T::default()
        }
    }
}

#[async_trait]
impl AuthService for LocalBackend {
    async fn login(&self, credentials: &Credentials) -> CoachResult<Session> {
        let username = credentials.username.trim();
        let users = lock(&self.users)?;
        match users.get(username) {
            Some(digest) if *digest == password_digest(username, &credentials.password) => {
                Ok(Self::session_for(username))
            }
            _ => Err(CoachError::Auth("Invalid credentials".to_string())),
        }
    }

    async fn register(&self, credentials: &Credentials) -> CoachResult<Session> {
        let username = credentials.username.trim();
        if username.is_empty() || credentials.password.chars().count() < 6 {
            return Err(CoachError::Auth("Username and password (>=6 chars) required".to_string()));
        }
        let mut users = lock(&self.users)?;
        if users.contains_key(username) {
            return Err(CoachError::Auth("Username already exists".to_string()));
        }
        users.insert(username.to_string(), password_digest(username, &credentials.password));
        self.write_json(OFFLINE_USERS_KEY, &*users);
        info!(%username, "offline account created");
        Ok(Self::session_for(username))
    }
}

#[async_trait]
impl StoryService for LocalBackend {
    async fn levels(&self, _token: &str) -> CoachResult<Vec<String>> {
        let levels: BTreeSet<String> = self.stories.iter().filter_map(|s| s.level.clone()).collect();
        Ok(levels.into_iter().collect())
    }

    async fn stories(&self, _token: &str, level: &str) -> CoachResult<Vec<StorySummary>> {
        let mut found: Vec<StorySummary> = self
            .stories
            .iter()
            .filter(|s| level.is_empty() || s.level.as_deref() == Some(level))
            .map(|s| StorySummary { id: s.id, title: s.title.clone(), level: s.level.clone() })
            .collect();
        found.sort_by_key(|s| s.id);
        Ok(found)
    }

    async fn story(&self, _token: &str, id: StoryId) -> CoachResult<Story> {
        self.stories
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| CoachError::Transport(format!("Story {} not found", id)))
    }
}

#[async_trait]
impl LookupService for LocalBackend {
    async fn lookup(&self, _token: &str, request: &LookupRequest) -> CoachResult<LookupResult> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(CoachError::Lookup("Text required".to_string()));
        }
        // A dictionary hit wins outright, including its own granularity.
        let result = match self.dictionary.get(text) {
            Some(entry) => LookupResult {
                text: text.to_string(),
                pinyin: entry.pinyin.to_string(),
                translation: entry.translation.to_string(),
                granularity: entry.granularity,
            },
            None => LookupResult {
                text: text.to_string(),
                pinyin: String::new(),
                translation: TRANSLATION_UNAVAILABLE.to_string(),
                granularity: request.granularity,
            },
        };
        Ok(result)
    }
}

#[async_trait]
impl FlashcardStore for LocalBackend {
    async fn flashcards(&self, token: &str) -> CoachResult<Vec<Flashcard>> {
        let username = owner(token)?;
        let mut cards = lock(&self.cards)?;
        let mine = cards
            .entry(username.to_string())
            .or_insert_with(|| self.load_cards(username));
        Ok(mine.list.clone())
    }

    async fn create_flashcard(&self, token: &str, card: &NewFlashcard) -> CoachResult<()> {
        let username = owner(token)?;
        if card.source_text.trim().is_empty() || card.translation.trim().is_empty() {
            return Err(CoachError::Transport(
                "source_text, translation, granularity are required".to_string(),
            ));
        }
        let mut cards = lock(&self.cards)?;
        let mine = cards
            .entry(username.to_string())
            .or_insert_with(|| self.load_cards(username));
        let id = mine.next_id;
        mine.next_id += 1;
        mine.list.insert(
            0,
            Flashcard {
                id,
                source_text: card.source_text.clone(),
                pinyin: Some(card.pinyin.clone()),
                translation: card.translation.clone(),
                granularity: card.granularity,
            },
        );
        self.write_json(&flashcards_key(username), &mine.list);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::classifier::classify;
    use crate::store::MemoryStore;

    fn request(text: &str) -> LookupRequest {
        LookupRequest { text: text.to_string(), granularity: classify(text) }
    }

    #[tokio::test]
    async fn dictionary_entry_overrides_granularity() {
        let backend = LocalBackend::new();
        let req = request("我们一起喝热茶。");
        assert_eq!(req.granularity, Granularity::Phrase);
        let result = backend.lookup("", &req).await.unwrap();
        assert_eq!(result.granularity, Granularity::Sentence);
        assert_eq!(result.translation, "We drink hot tea together.");
    }

    #[tokio::test]
    async fn unknown_text_keeps_requested_granularity() {
        let backend = LocalBackend::new();
        let result = backend.lookup("", &request("小店聊天")).await.unwrap();
        assert_eq!(result.translation, TRANSLATION_UNAVAILABLE);
        assert_eq!(result.pinyin, "");
        assert_eq!(result.granularity, Granularity::Phrase);
    }

    #[tokio::test]
    async fn blank_lookup_is_rejected() {
        let backend = LocalBackend::new();
        let err = backend.lookup("", &request("  ")).await.unwrap_err();
        assert_eq!(err, CoachError::Lookup("Text required".into()));
    }

    #[tokio::test]
    async fn catalog_lists_levels_and_stories() {
        let backend = LocalBackend::new();
        assert_eq!(backend.levels("").await.unwrap(), vec!["beginner", "intermediate"]);
        let beginner = backend.stories("", "beginner").await.unwrap();
        assert_eq!(beginner.len(), 1);
        assert_eq!(beginner[0].title, "公园里的早晨");
        let story = backend.story("", 2).await.unwrap();
        assert_eq!(story.plain_text(), "下午，我和朋友在小店聊天。我们一起喝热茶。");
        assert_eq!(story.segments[1].pinyin, None);
        assert!(backend.story("", 99).await.is_err());
    }

    #[tokio::test]
    async fn register_then_login() {
        let backend = LocalBackend::new();
        let creds = Credentials { username: "mei".into(), password: "secret1".into() };
        let session = backend.register(&creds).await.unwrap();
        assert_eq!(session.username, "mei");
        assert!(backend.register(&creds).await.is_err());
        assert_eq!(backend.login(&creds).await.unwrap(), session);

        let wrong = Credentials { password: "nope".into(), ..creds };
        assert_eq!(backend.login(&wrong).await.unwrap_err(), CoachError::Auth("Invalid credentials".into()));
    }

    #[tokio::test]
    async fn short_password_is_refused() {
        let backend = LocalBackend::new();
        let creds = Credentials { username: "mei".into(), password: "123".into() };
        assert!(matches!(backend.register(&creds).await, Err(CoachError::Auth(_))));
    }

    #[tokio::test]
    async fn flashcards_newest_first_and_persisted() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let backend = LocalBackend::persistent(store.clone());
        for text in ["猫", "公园"] {
            let result = backend.lookup("", &request(text)).await.unwrap();
            backend.create_flashcard("local-mei", &NewFlashcard::from(&result)).await.unwrap();
        }
        let cards = backend.flashcards("local-mei").await.unwrap();
        assert_eq!(cards.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(cards[0].source_text, "公园");
        assert!(store.get("offlineFlashcards:mei").unwrap().is_some());

        let reopened = LocalBackend::persistent(store);
        assert_eq!(reopened.flashcards("local-mei").await.unwrap(), cards);
    }

    #[tokio::test]
    async fn each_user_sees_only_their_cards() {
        let backend = LocalBackend::new();
        let mei = backend.register(&Credentials { username: "mei".into(), password: "secret1".into() }).await.unwrap();
        let lin = backend.register(&Credentials { username: "lin".into(), password: "secret2".into() }).await.unwrap();

        let cat = backend.lookup(&mei.token, &request("猫")).await.unwrap();
        backend.create_flashcard(&mei.token, &NewFlashcard::from(&cat)).await.unwrap();

        assert_eq!(backend.flashcards(&mei.token).await.unwrap().len(), 1);
        assert!(backend.flashcards(&lin.token).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cards_need_a_local_token() {
        let backend = LocalBackend::new();
        let cat = backend.lookup("", &request("猫")).await.unwrap();
        for token in ["", "local-", "Bearer mei"] {
            let err = backend.flashcards(token).await.unwrap_err();
            assert_eq!(err, CoachError::Transport("Invalid or expired token".into()));
            assert!(backend.create_flashcard(token, &NewFlashcard::from(&cat)).await.is_err());
        }
    }

    #[tokio::test]
    async fn accounts_survive_a_reopen() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let creds = Credentials { username: "mei".into(), password: "secret1".into() };
        LocalBackend::persistent(store.clone()).register(&creds).await.unwrap();

        let raw = store.get(OFFLINE_USERS_KEY).unwrap().unwrap();
        assert!(!raw.contains("secret1"));

        let reopened = LocalBackend::persistent(store);
        assert_eq!(reopened.login(&creds).await.unwrap().token, "local-mei");
        assert!(reopened.register(&creds).await.is_err());
        let wrong = Credentials { password: "secret2".into(), ..creds };
        assert!(reopened.login(&wrong).await.is_err());
    }

    #[tokio::test]
    async fn flashcard_needs_text_and_translation() {
        let backend = LocalBackend::new();
        let card = NewFlashcard {
            source_text: "猫".into(),
            pinyin: String::new(),
            translation: " ".into(),
            granularity: Granularity::Character,
        };
        assert!(backend.create_flashcard("local-mei", &card).await.is_err());
    }
}
//*** END FILE: src/api/local.rs ***//
