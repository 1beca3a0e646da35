use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::store::KeyValueStore;
use crate::types::lookup::FlashcardId;

pub const LEARNED_KEY_PREFIX: &str = "learnedFlashcards:";
pub const ANONYMOUS_IDENTITY: &str = "anon";

/// Which flashcards a user has marked as known. Stored as a JSON object
/// keyed by card id.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct LearnedMap(BTreeMap<FlashcardId, bool>);

impl LearnedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cards never marked count as not learned.
    pub fn is_learned(&self, id: FlashcardId) -> bool {
        self.0.get(&id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: FlashcardId, learned: bool) {
        self.0.insert(id, learned);
    }

    pub fn learned_count(&self) -> usize {
        self.0.values().filter(|&&v| v).count()
    }
}

/// Store key for one identity; no identity (or an empty one) is "anon".
pub fn learned_key(identity: Option<&str>) -> String {
    let who = identity.filter(|s| !s.is_empty()).unwrap_or(ANONYMOUS_IDENTITY);
    format!("{}{}", LEARNED_KEY_PREFIX, who)
}

/// Missing or unreadable entries start from an empty map.
pub fn load_learned(store: &dyn KeyValueStore, identity: Option<&str>) -> LearnedMap {
    let key = learned_key(identity);
    match store.get(&key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(%key, error = %e, "ignoring unreadable learned map");
            LearnedMap::new()
        }),
        Ok(None) => LearnedMap::new(),
        Err(e) => {
            warn!(%key, error = %e, "could not read learned map");
            LearnedMap::new()
        }
    }
}

/// Fire-and-forget: a failed write is logged and the in-memory map stays
/// authoritative.
pub fn persist_learned(store: &dyn KeyValueStore, identity: Option<&str>, map: &LearnedMap) {
    let key = learned_key(identity);
    let result = serde_json::to_string(map)
        .map_err(|e| e.to_string())
        .and_then(|raw| store.set(&key, &raw).map_err(|e| e.to_string()));
    if let Err(e) = result {
        warn!(%key, error = %e, "failed to persist learned map");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn keys_per_identity() {
        assert_eq!(learned_key(Some("mei")), "learnedFlashcards:mei");
        assert_eq!(learned_key(None), "learnedFlashcards:anon");
        assert_eq!(learned_key(Some("")), "learnedFlashcards:anon");
    }

    #[test]
    fn json_uses_string_ids() {
        let mut map = LearnedMap::new();
        map.set(3, true);
        map.set(11, false);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"3":true,"11":false}"#);
        assert_eq!(map.learned_count(), 1);
    }

    #[test]
    fn persist_then_load_per_identity() {
        let store = MemoryStore::new();
        let mut map = LearnedMap::new();
        map.set(5, true);
        persist_learned(&store, Some("mei"), &map);

        assert!(load_learned(&store, Some("mei")).is_learned(5));
        assert!(!load_learned(&store, None).is_learned(5));
    }

    #[test]
    fn garbage_entry_loads_empty() {
        let store = MemoryStore::new();
        store.set("learnedFlashcards:anon", "[oops").unwrap();
        assert_eq!(load_learned(&store, None), LearnedMap::new());
    }
}
