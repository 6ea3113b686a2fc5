//! Live session registry: session id → its SSE connection.

use std::sync::Arc;

use dashmap::DashMap;

use crate::transport::SseConnection;

/// All currently-connected sessions. Lookups on the message path are
/// lock-free reads; removal is idempotent.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SseConnection>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, conn: Arc<SseConnection>) {
        self.sessions.insert(conn.session_id.clone(), conn);
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<SseConnection>> {
        self.sessions.get(session_id).map(|c| Arc::clone(&c))
    }

    pub fn remove(&self, session_id: &str) -> Option<Arc<SseConnection>> {
        self.sessions.remove(session_id).map(|(_, conn)| conn)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
