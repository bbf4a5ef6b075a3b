use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::session::StreamingSession;

/// Runtime sessions of this process, keyed by session id.
///
/// The lock is never held across an await point.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<StreamingSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the session unless the id is taken. Returns false when it was.
    pub fn insert(&self, session: Arc<StreamingSession>) -> bool {
        let mut sessions = self.sessions.lock();
        let id = session.id();
        if sessions.contains_key(&id) {
            return false;
        }
        sessions.insert(id, session);
        true
    }

    /// Returns the stored session for the id, inserting `session` if there is none.
    pub fn get_or_insert(&self, session: Arc<StreamingSession>) -> Arc<StreamingSession> {
        self.sessions
            .lock()
            .entry(session.id())
            .or_insert(session)
            .clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<StreamingSession>> {
        self.sessions.lock().get(&id).cloned()
    }

    /// Removes the entry only if it still refers to `session`.
    pub fn remove(&self, session: &Arc<StreamingSession>) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get(&session.id()) {
            Some(stored) if Arc::ptr_eq(stored, session) => {
                sessions.remove(&session.id());
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Direction, Gender, ReferenceType, Streaming, VendorName};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn session(id: Uuid) -> Arc<StreamingSession> {
        let streaming = Streaming {
            id,
            customer_id: Uuid::new_v4(),
            reference_type: ReferenceType::Call,
            reference_id: Uuid::new_v4(),
            language: "en-US".to_string(),
            gender: Gender::Neutral,
            vendor: VendorName::ElevenLabs,
            voice_id: String::new(),
            direction: Direction::Out,
            activeflow_id: None,
            pod_id: "pod-a".to_string(),
        };
        Arc::new(StreamingSession::new(
            streaming,
            CancellationToken::new(),
            Duration::from_millis(20),
        ))
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        assert!(store.insert(session(id)));
        assert!(!store.insert(session(id)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_or_insert_keeps_first() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        let first = session(id);
        store.insert(first.clone());

        let resolved = store.get_or_insert(session(id));
        assert!(Arc::ptr_eq(&resolved, &first));
    }

    #[test]
    fn test_remove_only_same_session() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        let first = session(id);
        store.insert(first.clone());

        assert!(!store.remove(&session(id)));
        assert!(store.get(id).is_some());
        assert!(store.remove(&first));
        assert!(store.is_empty());
    }
}
