use std::collections::HashMap;
use std::sync::Mutex;

use tabula_core::types::{ChatMessage, SessionId};

/// In-memory conversation history keyed by session id.
///
/// Histories live for the lifetime of the process; there is no eviction.
/// A session id the store has never seen starts an empty history.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Vec<ChatMessage>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self, session_id: &SessionId) -> Vec<ChatMessage> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    pub fn append(&self, session_id: &SessionId, messages: &[ChatMessage]) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session_id.clone())
            .or_default()
            .extend_from_slice(messages);
    }

    pub fn len(&self, session_id: &SessionId) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).map(|h| h.len()).unwrap_or(0)
    }

    pub fn clear(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histories_are_isolated_per_session() {
        let store = SessionStore::new();
        let a = SessionId::from_string("a");
        let b = SessionId::from_string("b");

        store.append(&a, &[ChatMessage::user("how many users?")]);
        store.append(&a, &[ChatMessage::user("and their ages?")]);
        store.append(&b, &[ChatMessage::user("unrelated")]);

        assert_eq!(store.len(&a), 2);
        assert_eq!(store.len(&b), 1);
        assert_eq!(store.history(&a)[0].text(), "how many users?");

        store.clear(&a);
        assert_eq!(store.len(&a), 0);
        assert_eq!(store.len(&b), 1);
    }
}
