use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ContextError;
use crate::session::Session;

/// Shared, individually locked session.
///
/// Holding the lock for the whole of one user turn serializes all work on a
/// session while leaving other sessions free to proceed.
pub type SessionHandle = Arc<Mutex<Session>>;

type Registry = HashMap<Uuid, SessionHandle>;

/// Trait for session registries
pub trait SessionStore: Send + Sync {
    /// Look up a session by ID
    fn get(&self, session_id: &Uuid) -> Result<Option<SessionHandle>, ContextError>;

    /// Insert a session, replacing any session stored under the same ID
    fn put(&self, session: Session) -> Result<SessionHandle, ContextError>;

    /// Insert `session` unless its ID is already present. Returns the stored
    /// handle and whether the insert happened.
    fn get_or_insert(&self, session: Session) -> Result<(SessionHandle, bool), ContextError>;

    /// Remove a session. Returns whether it was present.
    fn delete(&self, session_id: &Uuid) -> Result<bool, ContextError>;

    /// Handles to every stored session, in no particular order
    fn list(&self) -> Result<Vec<SessionHandle>, ContextError>;
}

/// Process-local session registry. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStore {
    sessions: RwLock<Registry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, ContextError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ContextError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Registry>, ContextError> {
        self.sessions
            .read()
            .map_err(|e| ContextError::Storage(format!("Session registry lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Registry>, ContextError> {
        self.sessions
            .write()
            .map_err(|e| ContextError::Storage(format!("Session registry lock poisoned: {}", e)))
    }
}

impl SessionStore for InMemoryStore {
    fn get(&self, session_id: &Uuid) -> Result<Option<SessionHandle>, ContextError> {
        Ok(self.read()?.get(session_id).cloned())
    }

    fn put(&self, session: Session) -> Result<SessionHandle, ContextError> {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.write()?.insert(id, handle.clone());
        debug!("Stored session {}", id);
        Ok(handle)
    }

    fn get_or_insert(&self, session: Session) -> Result<(SessionHandle, bool), ContextError> {
        let id = session.id();
        let mut sessions = self.write()?;
        if let Some(existing) = sessions.get(&id) {
            return Ok((existing.clone(), false));
        }
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(id, handle.clone());
        info!("Created session {}", id);
        Ok((handle, true))
    }

    fn delete(&self, session_id: &Uuid) -> Result<bool, ContextError> {
        let removed = self.write()?.remove(session_id).is_some();
        if removed {
            info!("Deleted session {}", session_id);
        }
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<SessionHandle>, ContextError> {
        let sessions: Vec<_> = self.read()?.values().cloned().collect();
        debug!("Listed {} sessions", sessions.len());
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{Model, RolePreset};

    fn session() -> Session {
        Session::new(Model::default(), RolePreset::default())
    }

    #[test]
    fn test_store_basic_operations() {
        let store = InMemoryStore::new();
        let mut session = session();
        session.add_user_turn("Hello".to_string());
        let id = session.id();

        store.put(session).unwrap();
        assert_eq!(store.len().unwrap(), 1);

        let handle = store.get(&id).unwrap().expect("session stored");
        assert_eq!(tokio_test::block_on(handle.lock()).turns().len(), 1);

        assert_eq!(store.list().unwrap().len(), 1);

        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(store.get(&id).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_get_or_insert_keeps_existing_session() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();

        let mut first = Session::with_id(id, Model::default(), RolePreset::default());
        first.add_user_turn("first".to_string());
        let (_, inserted) = store.get_or_insert(first).unwrap();
        assert!(inserted);

        let replacement = Session::with_id(id, Model::Llama, RolePreset::Teacher);
        let (handle, inserted) = store.get_or_insert(replacement).unwrap();
        assert!(!inserted);

        let stored = tokio_test::block_on(handle.lock());
        assert_eq!(stored.turns()[0].content, "first");
        assert_eq!(stored.model(), Model::default());
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = InMemoryStore::new();
        let a = store.put(session()).unwrap();
        let b = store.put(session()).unwrap();

        tokio_test::block_on(async {
            let mut a = a.lock().await;
            // b stays lockable while a is held
            let b = b.try_lock().expect("b is not locked");
            a.add_user_turn("only in a".to_string());
            assert!(b.turns().is_empty());
        });
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
