//! Session-scoped conversation memory.
//!
//! Sessions live for the lifetime of the process and are never persisted.
//! The outer map lock is only held to look up or create an entry; mutation
//! of a single session's history is serialized by that session's own mutex,
//! so different sessions proceed fully in parallel.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Ordered history of a single conversation, bounded to the most recent N turns.
#[derive(Debug, Default)]
pub struct Session {
    turns: VecDeque<Turn>,
}

/// In-memory store of conversation sessions keyed by an opaque identifier.
pub struct SessionStore {
    max_history_length: usize,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new(max_history_length: usize) -> Self {
        Self {
            max_history_length,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the session for `session_id`, creating an empty one if absent.
    ///
    /// Concurrent calls with the same id resolve to a single session object.
    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().get(session_id) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write();
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::default()))),
        )
    }

    /// Append a turn, evicting the oldest once the bound is exceeded.
    pub fn append_turn(&self, session_id: &str, question: &str, answer: &str) {
        let session = self.get_or_create(session_id);
        let mut session = session.lock();

        session.turns.push_back(Turn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        while session.turns.len() > self.max_history_length {
            session.turns.pop_front();
        }
    }

    /// Recent turns for `session_id`, oldest first. Empty when absent.
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        match self.sessions.read().get(session_id) {
            Some(session) => session.lock().turns.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Remove all state for a session. Clearing a nonexistent session is not
    /// an error.
    pub fn clear(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }
}
