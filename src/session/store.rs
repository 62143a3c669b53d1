//! In-memory session store
//!
//! All mutation of session data goes through this type. Each operation takes
//! the lock once; concurrent turns on one session are last-write-wins.

use super::fields::{CollectedFields, Parameters};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

/// Named per-session counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Counter {
    NoInput,
    NoMatch,
}

impl Counter {
    pub const ALL: [Counter; 2] = [Counter::NoInput, Counter::NoMatch];
}

/// State of one learner's conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub turn_counters: BTreeMap<Counter, u32>,
    pub collected_fields: CollectedFields,
    /// Display name of the last state executed for this session
    pub last_intent: Option<String>,
    /// Webhook turns handled
    pub turns: u64,
}

impl SessionRecord {
    fn new(session_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            created_at: now,
            last_activity: now,
            turn_counters: Counter::ALL.into_iter().map(|c| (c, 0)).collect(),
            collected_fields: CollectedFields::default(),
            last_intent: None,
            turns: 0,
        }
    }

    pub fn counter(&self, counter: Counter) -> u32 {
        self.turn_counters.get(&counter).copied().unwrap_or(0)
    }
}

/// Process-local registry of session records
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the record for `session_id`, creating it if absent.
    /// Refreshes `last_activity` on an existing record.
    pub fn get_or_create(&self, session_id: &str) -> SessionRecord {
        let now = Utc::now();
        let mut sessions = self.write();
        if let Some(record) = sessions.get_mut(session_id) {
            record.last_activity = now.max(record.last_activity);
            return record.clone();
        }

        tracing::info!(session_id = %session_id, "Creating session");
        let record = SessionRecord::new(session_id, now);
        sessions.insert(session_id.to_string(), record.clone());
        record
    }

    pub fn get(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        self.read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
    }

    /// Merge normalized fields into a session's collected fields.
    ///
    /// A record reset between turns is recreated rather than dropping the
    /// update.
    pub fn merge(&self, session_id: &str, fields: Parameters) {
        if fields.is_empty() {
            return;
        }
        let mut sessions = self.write();
        let record = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord::new(session_id, Utc::now()));
        tracing::debug!(
            session_id = %session_id,
            keys = ?fields.keys().collect::<Vec<_>>(),
            "Merging session fields"
        );
        record.collected_fields.merge(fields);
    }

    pub fn increment_counter(&self, session_id: &str, counter: Counter) -> u32 {
        let mut sessions = self.write();
        let record = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord::new(session_id, Utc::now()));
        let value = record.turn_counters.entry(counter).or_insert(0);
        *value += 1;
        *value
    }

    /// Record that `intent` ran for this session
    pub fn record_intent(&self, session_id: &str, intent: &str) {
        if let Some(record) = self.write().get_mut(session_id) {
            record.last_intent = Some(intent.to_string());
        }
    }

    /// Count one completed webhook turn
    pub fn record_turn(&self, session_id: &str) {
        if let Some(record) = self.write().get_mut(session_id) {
            record.turns += 1;
            tracing::debug!(
                session_id = %session_id,
                turns = record.turns,
                collected = ?record.collected_fields.keys(),
                "Turn recorded"
            );
        }
    }

    /// Delete one record; returns whether it existed
    pub fn reset(&self, session_id: &str) -> bool {
        self.write().remove(session_id).is_some()
    }

    /// Delete every record; returns how many were removed
    pub fn reset_all(&self) -> usize {
        let mut sessions = self.write();
        let count = sessions.len();
        sessions.clear();
        count
    }

    /// Remove records whose last activity is older than `ttl` relative to
    /// `now`; returns how many were removed
    pub fn evict_idle(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub_signed(ttl) else {
            return 0;
        };

        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, record| record.last_activity >= cutoff);
        before - sessions.len()
    }

    /// Copy of every record, ordered by session id
    pub fn snapshot(&self) -> BTreeMap<String, SessionRecord> {
        self.read()
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[allow(dead_code)] // API completeness alongside len()
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_get_or_create_new_record() {
        let store = SessionStore::new();
        let record = store.get_or_create("s1");

        assert_eq!(record.session_id, "s1");
        assert_eq!(record.created_at, record.last_activity);
        assert_eq!(record.counter(Counter::NoInput), 0);
        assert_eq!(record.counter(Counter::NoMatch), 0);
        assert_eq!(record.turn_counters.len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_or_create_returns_existing() {
        let store = SessionStore::new();
        let first = store.get_or_create("s1");
        store.merge("s1", fields(json!({"school": "한빛초"})));

        let second = store.get_or_create("s1");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.last_activity >= first.last_activity);
        assert_eq!(second.collected_fields.school.as_deref(), Some("한빛초"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = SessionStore::new();
        assert_eq!(
            store.get("nope"),
            Err(StoreError::SessionNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_merge_preserves_other_fields() {
        let store = SessionStore::new();
        store.get_or_create("s1");
        store.merge("s1", fields(json!({"person": [{"name": "민지"}]})));
        store.merge("s1", fields(json!({"celebrity": "아이유"})));

        let record = store.get("s1").unwrap();
        assert_eq!(record.collected_fields.person_name(), Some("민지"));
        assert_eq!(record.collected_fields.celebrity.as_deref(), Some("아이유"));
    }

    #[test]
    fn test_increment_counter() {
        let store = SessionStore::new();
        store.get_or_create("s1");
        assert_eq!(store.increment_counter("s1", Counter::NoMatch), 1);
        assert_eq!(store.increment_counter("s1", Counter::NoMatch), 2);
        let record = store.get("s1").unwrap();
        assert_eq!(record.counter(Counter::NoMatch), 2);
        assert_eq!(record.counter(Counter::NoInput), 0);
    }

    #[test]
    fn test_reset_one_and_all() {
        let store = SessionStore::new();
        store.get_or_create("a");
        store.get_or_create("b");
        store.get_or_create("c");

        assert!(store.reset("b"));
        assert!(!store.reset("b"));
        assert!(store.get("b").is_err());
        assert!(store.get("a").is_ok());

        assert_eq!(store.reset_all(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict_idle() {
        let store = SessionStore::new();
        store.get_or_create("old");
        store.get_or_create("fresh");

        let later = Utc::now() + chrono::Duration::hours(2);
        // Touch "fresh" as if it were active an hour from now
        {
            let mut sessions = store.write();
            if let Some(record) = sessions.get_mut("fresh") {
                record.last_activity = later - chrono::Duration::minutes(5);
            }
        }

        let evicted = store.evict_idle(later, Duration::from_secs(3600));
        assert_eq!(evicted, 1);
        assert!(store.get("old").is_err());
        assert!(store.get("fresh").is_ok());
    }

    #[test]
    fn test_record_turn_and_intent() {
        let store = SessionStore::new();
        store.get_or_create("s1");
        store.record_intent("s1", "Welcome");
        store.record_turn("s1");

        let record = store.get("s1").unwrap();
        assert_eq!(record.last_intent.as_deref(), Some("Welcome"));
        assert_eq!(record.turns, 1);
    }

    #[test]
    fn test_serializes_camel_case() {
        let store = SessionStore::new();
        let record = store.get_or_create("s1");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["sessionId"], "s1");
        assert_eq!(value["turnCounters"]["no-match"], 0);
        assert_eq!(value["collectedFields"], json!({}));
    }
}
