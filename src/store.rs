//! In-memory registry of conversation sessions keyed by client session id

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::chat::ConversationSession;
use crate::config::GeminiConfig;

/// A session shared between request handlers
///
/// Each session has its own lock, so requests for one conversation are
/// serialized while other conversations proceed independently.
pub type SharedSession = Arc<Mutex<ConversationSession>>;

/// Session registry backing the HTTP gateway
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SharedSession>>,
    config: GeminiConfig,
    http: reqwest::Client,
}

impl SessionStore {
    /// Create an empty store; new sessions share one HTTP client
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Get the session for `id`, creating it on first use
    pub async fn ensure(&self, id: &str) -> SharedSession {
        if let Some(session) = self.sessions.read().await.get(id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id = %id, "created conversation session");
                Arc::new(Mutex::new(
                    ConversationSession::with_client(self.config.clone(), self.http.clone())
                        .with_id(id),
                ))
            })
            .clone()
    }

    /// Get an existing session
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Reset an existing session's history
    ///
    /// Returns `false` if no session exists for `id`.
    pub async fn reset(&self, id: &str) -> bool {
        let Some(session) = self.get(id).await else {
            return false;
        };
        session.lock().await.reset();
        true
    }

    /// Drop all sessions
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
