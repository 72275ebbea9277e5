//! In-memory session registry.
//!
//! Maps session ids to shared [`Session`] handles. Lookups and inserts go
//! through `DashMap`'s entry API, so the only critical section is the shard
//! lock held while a single entry is inspected or inserted. Nothing here is
//! ever held across an engine call.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::{Entry, VacantEntry};
use tracing::debug;
use uuid::Uuid;

use super::Session;

/// Owns every session known to this process.
///
/// Sessions are never removed; they live until the process exits.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `id`, creating it if needed.
    ///
    /// - `None` or an empty id allocates a fresh UUID v7 id. The id is only
    ///   accepted if its entry is vacant, so two concurrent allocations can
    ///   never share a session even if the generator repeated itself.
    /// - A known id returns the existing session untouched.
    /// - An unknown id creates a session under exactly that id.
    ///
    /// Concurrent calls with the same id all receive the same `Arc<Session>`.
    pub fn get_or_create(&self, id: Option<&str>) -> Arc<Session> {
        match id.filter(|id| !id.is_empty()) {
            Some(id) => match self.sessions.entry(id.to_string()) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    debug!(session_id = %id, "Registered client-supplied session");
                    Self::insert_new(entry)
                }
            },
            None => loop {
                let generated = Uuid::now_v7().to_string();
                if let Entry::Vacant(entry) = self.sessions.entry(generated) {
                    let session = Self::insert_new(entry);
                    debug!(session_id = %session.id(), "Allocated new session");
                    return session;
                }
            },
        }
    }

    /// Look up an existing session without creating one.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn insert_new(entry: VacantEntry<'_, String, Arc<Session>>) -> Arc<Session> {
        let session = Arc::new(Session::new(entry.key().clone()));
        entry.insert(Arc::clone(&session));
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_id_allocates_new_session() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create(None);
        let b = registry.get_or_create(Some(""));
        assert_ne!(a.id(), b.id());
        assert!(!a.id().is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_explicit_id_is_idempotent() {
        let registry = SessionRegistry::new();
        let first = registry.get_or_create(Some("conversation-1"));
        let second = registry.get_or_create(Some("conversation-1"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.created_at(), second.created_at());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_id_keeps_client_value() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create(Some("client-chosen"));
        assert_eq!(session.id(), "client-chosen");
        assert!(registry.get("client-chosen").is_some());
    }

    #[test]
    fn test_get_does_not_create() {
        let registry = SessionRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_empty_id_creation_is_collision_free() {
        let registry = Arc::new(SessionRegistry::new());

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get_or_create(None).id().to_string() })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), 200);
        assert_eq!(registry.len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_same_id_converges() {
        let registry = Arc::new(SessionRegistry::new());

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get_or_create(Some("shared")) })
            })
            .collect();

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }

        assert_eq!(registry.len(), 1);
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
    }
}
