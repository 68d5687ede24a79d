// dryrun/core/execution/src/session.rs

// Registry of named session sandboxes
use crate::metrics::ACTIVE_SESSIONS;
use crate::types::ExecutionError;
use dashmap::DashMap;
use dryrun_storage::{RootStore, Snapshot};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Isolated working copy of the ledger
#[derive(Debug)]
pub struct Session {
    snapshot: Snapshot<'static>,
    timestamp: u64,
}

impl Session {
    pub fn new(root: Arc<dyn RootStore>) -> Self {
        Self {
            snapshot: Snapshot::new(root),
            timestamp: 0,
        }
    }

    pub fn snapshot(&self) -> &Snapshot<'static> {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut Snapshot<'static> {
        &mut self.snapshot
    }

    /// Pinned block timestamp; 0 runs against the live chain head
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Pin a new timestamp; moving backwards is rejected
    pub fn set_timestamp(&mut self, timestamp: u64) -> Result<(), ExecutionError> {
        if timestamp < self.timestamp {
            return Err(ExecutionError::TimestampRegression {
                current: self.timestamp,
                requested: timestamp,
            });
        }
        self.timestamp = timestamp;
        Ok(())
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Concurrent map of session id to session.
///
/// Handles are cloned out of the map before their mutex is taken, so no map
/// shard lock is ever held while a session is in use.
pub struct SessionRegistry {
    root: Arc<dyn RootStore>,
    sessions: DashMap<String, SessionHandle>,
}

impl SessionRegistry {
    pub fn new(root: Arc<dyn RootStore>) -> Self {
        Self {
            root,
            sessions: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Arc<dyn RootStore> {
        &self.root
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    pub fn get_or_fail(&self, id: &str) -> Result<SessionHandle, ExecutionError> {
        self.get(id)
            .ok_or_else(|| ExecutionError::SessionNotFound(id.to_string()))
    }

    /// Existing session, or a fresh one layered on the canonical root
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        if let Some(handle) = self.get(id) {
            return handle;
        }
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!("Creating session {}", id);
                ACTIVE_SESSIONS.inc();
                Arc::new(Mutex::new(Session::new(self.root.clone())))
            })
            .value()
            .clone()
    }

    /// Session ids in ascending order
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!("Deleted session {}", id);
            ACTIVE_SESSIONS.dec();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dryrun_storage::{MemoryStore, StorageKey};

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let registry = registry();
        let first = registry.get_or_create("a");
        let second = registry.get_or_create("a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("b").is_none());
        assert!(matches!(registry.get_or_fail("b"), Err(ExecutionError::SessionNotFound(_))));
    }

    #[test]
    fn test_list_and_remove() {
        let registry = registry();
        registry.get_or_create("b");
        registry.get_or_create("a");
        assert_eq!(registry.list(), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert_eq!(registry.list(), vec!["b".to_string()]);
    }

    #[test]
    fn test_sessions_do_not_share_state() {
        let registry = registry();
        let a = registry.get_or_create("a");
        let b = registry.get_or_create("b");
        let key = StorageKey::new(1, b"k".to_vec());
        a.lock().snapshot_mut().put(key.clone(), b"v".to_vec());
        assert!(b.lock().snapshot().get(&key).is_none());
        assert_eq!(a.lock().snapshot().get(&key), Some(b"v".to_vec()));
    }

    #[test]
    fn test_timestamp_is_monotonic() {
        let mut session = Session::new(Arc::new(MemoryStore::new()));
        assert_eq!(session.timestamp(), 0);
        session.set_timestamp(10).unwrap();
        session.set_timestamp(10).unwrap();
        assert!(matches!(
            session.set_timestamp(9),
            Err(ExecutionError::TimestampRegression { current: 10, requested: 9 })
        ));
        assert_eq!(session.timestamp(), 10);
    }

    #[test]
    fn test_concurrent_creation_yields_one_session() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get_or_create("shared"))
            })
            .collect();
        let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }
}
