//! Per-session conversation history with idle expiry.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::provider::Message;

/// Conversation state of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub last_seen: DateTime<Utc>,
}

impl SessionState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            messages: Vec::new(),
            last_seen: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_seen > ttl
    }

    /// Append a message, keeping only the newest `max_messages`.
    pub fn push(&mut self, message: Message, max_messages: usize) {
        self.messages.push(message);
        if self.messages.len() > max_messages {
            let excess = self.messages.len() - max_messages;
            self.messages.drain(..excess);
        }
    }

    pub fn is_full(&self, max_messages: usize) -> bool {
        self.messages.len() >= max_messages
    }
}

/// Key-value store of session state with time-to-live semantics.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current state for `key`. Missing and expired sessions come back empty
    /// with `last_seen = now`.
    async fn load(&self, key: &str, now: DateTime<Utc>) -> SessionState;

    async fn save(&self, key: &str, state: SessionState);

    /// Forget `key` entirely.
    async fn remove(&self, key: &str);

    /// Number of stored sessions, expired ones included until evicted.
    async fn len(&self) -> usize;
}

/// Process-local session store.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_secs(ttl_secs: u64) -> Self {
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self::new(Duration::try_seconds(secs).unwrap_or(Duration::MAX))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &str, now: DateTime<Utc>) -> SessionState {
        let sessions = self.sessions.read().await;
        match sessions.get(key) {
            Some(state) if !state.is_expired(now, self.ttl) => state.clone(),
            Some(_) => {
                tracing::debug!(session = %key, "Session idle past timeout, resetting");
                SessionState::new(now)
            }
            None => SessionState::new(now),
        }
    }

    async fn save(&self, key: &str, state: SessionState) {
        let now = state.last_seen;
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired(now, self.ttl));
        sessions.insert(key.to_string(), state);
    }

    async fn remove(&self, key: &str) {
        self.sessions.write().await.remove(key);
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_push_truncates_oldest() {
        let mut state = SessionState::new(at(0));
        for i in 0..7 {
            state.push(Message::user(format!("q{i}")), 4);
        }
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.messages[0].content, "q3");
        assert!(state.is_full(4));
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let store = InMemorySessionStore::from_secs(300);
        let state = store.load("s", at(0)).await;
        assert!(state.messages.is_empty());
        assert_eq!(state.last_seen, at(0));
    }

    #[tokio::test]
    async fn test_idle_session_resets() {
        let store = InMemorySessionStore::from_secs(300);
        let mut state = SessionState::new(at(0));
        state.push(Message::user("試壓"), 10);
        store.save("s", state).await;

        assert_eq!(store.load("s", at(300)).await.messages.len(), 1);
        let reset = store.load("s", at(301)).await;
        assert!(reset.messages.is_empty());
        assert_eq!(reset.last_seen, at(301));
    }

    #[tokio::test]
    async fn test_save_evicts_expired_sessions() {
        let store = InMemorySessionStore::from_secs(60);
        store.save("old", SessionState::new(at(0))).await;
        store.save("new", SessionState::new(at(120))).await;
        assert_eq!(store.len().await, 1);

        store.remove("new").await;
        assert_eq!(store.len().await, 0);
    }
}
