//! In-memory store for session-scoped resources (screenshots).
//!
//! Keyed by (session id, resource name). All mutation is single-step keyed
//! insert/evict; nothing reads-modifies-writes across await points.

use dashmap::DashMap;

/// A stored payload with its content type.
#[derive(Debug, Clone)]
pub struct StoredResource {
    /// Base64 payload.
    pub data: String,
    pub mime_type: String,
}

/// Resource store shared by all sessions; entries are purged in bulk when
/// the owning session is destroyed.
#[derive(Default)]
pub struct ResourceStore {
    entries: DashMap<String, Vec<(String, StoredResource)>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resource under the session, keeping insertion order.
    /// Re-using a name replaces the earlier payload.
    pub fn insert(
        &self,
        session_id: &str,
        name: impl Into<String>,
        data: impl Into<String>,
        mime_type: impl Into<String>,
    ) {
        let name = name.into();
        let resource = StoredResource {
            data: data.into(),
            mime_type: mime_type.into(),
        };
        let mut session = self.entries.entry(session_id.to_string()).or_default();
        match session.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = resource,
            None => session.push((name, resource)),
        }
    }

    /// Resource names and mime types for one session, oldest first.
    pub fn list(&self, session_id: &str) -> Vec<(String, String)> {
        self.entries
            .get(session_id)
            .map(|session| {
                session
                    .iter()
                    .map(|(name, res)| (name.clone(), res.mime_type.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, session_id: &str, name: &str) -> Option<StoredResource> {
        self.entries.get(session_id).and_then(|session| {
            session
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, res)| res.clone())
        })
    }

    /// Drop every resource owned by the session. Idempotent.
    pub fn evict_session(&self, session_id: &str) -> usize {
        self.entries
            .remove(session_id)
            .map(|(_, session)| session.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let store = ResourceStore::new();
        store.insert("s1", "shot-1", "aGk=", "image/png");

        let res = store.get("s1", "shot-1").unwrap();
        assert_eq!(res.data, "aGk=");
        assert_eq!(res.mime_type, "image/png");
        assert!(store.get("s1", "other").is_none());
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = ResourceStore::new();
        store.insert("s1", "a", "1", "image/png");
        store.insert("s1", "b", "2", "image/png");
        store.insert("s1", "c", "3", "image/png");

        let names: Vec<String> = store.list("s1").into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn reinsert_replaces_payload_in_place() {
        let store = ResourceStore::new();
        store.insert("s1", "a", "old", "image/png");
        store.insert("s1", "a", "new", "image/png");

        assert_eq!(store.list("s1").len(), 1);
        assert_eq!(store.get("s1", "a").unwrap().data, "new");
    }

    #[test]
    fn sessions_are_isolated() {
        let store = ResourceStore::new();
        store.insert("a", "shot", "from-a", "image/png");
        store.insert("b", "shot", "from-b", "image/png");

        assert_eq!(store.get("a", "shot").unwrap().data, "from-a");
        assert_eq!(store.get("b", "shot").unwrap().data, "from-b");

        store.evict_session("a");
        assert!(store.get("a", "shot").is_none());
        assert_eq!(store.get("b", "shot").unwrap().data, "from-b");
    }

    #[test]
    fn evict_is_idempotent() {
        let store = ResourceStore::new();
        store.insert("s1", "a", "1", "image/png");
        assert_eq!(store.evict_session("s1"), 1);
        assert_eq!(store.evict_session("s1"), 0);
        assert_eq!(store.evict_session("never-existed"), 0);
    }
}
