//! Gateway sessions and the registry that owns them.
//!
//! A `Session` is one conversation. Its mutable state sits behind a per-session
//! async mutex (the turn lock): holding the guard is what gives a turn exclusive
//! access to the session, and the guard is held for the whole engine call.

pub mod registry;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use turnstile_types::chat::ChatTurn;

pub use registry::SessionRegistry;

/// One ongoing conversation.
///
/// `id` and `created_at` never change after construction. Everything else lives
/// in [`SessionState`] and is only reachable through [`Session::lock`].
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
}

/// State guarded by a session's turn lock.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Completed turns, oldest first. Only appended to.
    pub history: Vec<ChatTurn>,
}

impl Session {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Acquire the turn lock, waiting for any turn already running.
    ///
    /// Waiters are granted the lock in the order they started waiting.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// Number of history entries, waiting for the turn lock if it is held.
    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_new_session_is_empty() {
        let session = Session::new("abc".to_string());
        assert_eq!(session.id(), "abc");
        assert_eq!(session.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let session = Arc::new(Session::new("abc".to_string()));
        let guard = session.lock().await;

        let waiter = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut state = session.lock().await;
                state.history.push(ChatTurn::user("second"));
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(session.history_len().await, 1);
    }
}
