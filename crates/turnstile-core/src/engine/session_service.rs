//! In-memory session store for execution engines.
//!
//! Engines keep their own per-session conversation (model messages, tool
//! calls, tool results) separately from the gateway's turn history. Entries are
//! keyed by `(app_name, session_id)` and owned by a single fixed user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use turnstile_types::engine::EngineError;
use turnstile_types::llm::Message;

/// One session in the engine's store.
#[derive(Debug)]
pub struct EngineSession {
    pub app_name: String,
    pub user_id: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Model conversation so far, excluding the system instruction.
    pub messages: Mutex<Vec<Message>>,
}

/// Process-local engine session store.
///
/// `get` and `create` mirror a remote session service: a lookup of an unknown
/// id fails with `NotFound` and a second create of the same id fails with
/// `AlreadyExists`.
#[derive(Debug)]
pub struct InMemorySessionService {
    app_name: String,
    user_id: String,
    sessions: DashMap<(String, String), Arc<EngineSession>>,
}

impl InMemorySessionService {
    pub fn new(app_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            sessions: DashMap::new(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn get(&self, session_id: &str) -> Result<Arc<EngineSession>, EngineError> {
        self.sessions
            .get(&self.key(session_id))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::NotFound(session_id.to_string()))
    }

    pub fn create(&self, session_id: &str) -> Result<Arc<EngineSession>, EngineError> {
        match self.sessions.entry(self.key(session_id)) {
            Entry::Occupied(_) => Err(EngineError::AlreadyExists(session_id.to_string())),
            Entry::Vacant(entry) => {
                let session = Arc::new(EngineSession {
                    app_name: self.app_name.clone(),
                    user_id: self.user_id.clone(),
                    id: session_id.to_string(),
                    created_at: Utc::now(),
                    messages: Mutex::new(Vec::new()),
                });
                entry.insert(Arc::clone(&session));
                Ok(session)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn key(&self, session_id: &str) -> (String, String) {
        (self.app_name.clone(), session_id.to_string())
    }
}
