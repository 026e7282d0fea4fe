//! Concurrent session store
//!
//! A `DashMap` from id to a per-session `RwLock`. The map shard lock is
//! held only long enough to clone the handle; all waiting happens on the
//! session lock, bounded by the configured timeout, so operations on
//! different sessions never block each other.

use crate::error::DsoError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dso_model::Session;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to one session
pub type SessionHandle = Arc<RwLock<Session>>;

/// Map of live sessions
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
    lock_timeout: Duration,
}

impl SessionStore {
    /// Create empty store
    #[must_use]
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            lock_timeout,
        }
    }

    /// Handle for `id`
    ///
    /// # Errors
    /// Returns `DsoError::NotFound` for unknown ids
    pub fn handle(&self, id: &str) -> Result<SessionHandle, DsoError> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DsoError::NotFound(id.to_string()))
    }

    /// Insert a new session
    ///
    /// # Errors
    /// Returns `DsoError::DuplicateSession` if the id is taken
    pub fn insert_new(&self, session: Session) -> Result<SessionHandle, DsoError> {
        let id = session.id.clone();
        let handle = Arc::new(RwLock::new(session));
        self.insert(&id, &handle)?;
        Ok(handle)
    }

    /// Publish `handle` under `id`
    ///
    /// # Errors
    /// Returns `DsoError::DuplicateSession` if the id is taken
    pub fn insert(&self, id: &str, handle: &SessionHandle) -> Result<(), DsoError> {
        match self.sessions.entry(id.to_string()) {
            Entry::Occupied(entry) => Err(DsoError::DuplicateSession(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(handle));
                Ok(())
            }
        }
    }

    /// Remove `id` if it still maps to `handle`
    pub fn remove_if_current(&self, id: &str, handle: &SessionHandle) -> bool {
        self.sessions
            .remove_if(id, |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    /// Check that `handle` is still the live entry for `id`
    ///
    /// A handle goes stale when its session is evicted (or its creation
    /// rolled back) while a caller waited for the lock.
    ///
    /// # Errors
    /// Returns `DsoError::NotFound` for stale handles
    pub fn ensure_current(&self, id: &str, handle: &SessionHandle) -> Result<(), DsoError> {
        match self.sessions.get(id) {
            Some(entry) if Arc::ptr_eq(entry.value(), handle) => Ok(()),
            _ => Err(DsoError::NotFound(id.to_string())),
        }
    }

    /// Shared lock with timeout
    ///
    /// # Errors
    /// Returns `DsoError::ConcurrencyTimeout` if the lock is not acquired in time
    pub fn read<'a>(
        &self,
        id: &str,
        handle: &'a SessionHandle,
    ) -> Result<RwLockReadGuard<'a, Session>, DsoError> {
        handle
            .try_read_for(self.lock_timeout)
            .ok_or_else(|| self.timeout(id))
    }

    /// Exclusive lock with timeout
    ///
    /// # Errors
    /// Returns `DsoError::ConcurrencyTimeout` if the lock is not acquired in time
    pub fn write<'a>(
        &self,
        id: &str,
        handle: &'a SessionHandle,
    ) -> Result<RwLockWriteGuard<'a, Session>, DsoError> {
        handle
            .try_write_for(self.lock_timeout)
            .ok_or_else(|| self.timeout(id))
    }

    fn timeout(&self, id: &str) -> DsoError {
        let waited_ms = u64::try_from(self.lock_timeout.as_millis()).unwrap_or(u64::MAX);
        tracing::warn!(session_id = id, waited_ms, "session lock timed out");
        DsoError::ConcurrencyTimeout {
            session_id: id.to_string(),
            waited_ms,
        }
    }

    /// Live ids, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Get number of live sessions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dso_model::SessionConfig;

    fn session(id: &str) -> Session {
        Session::new(id, SessionConfig::new(), Utc::now()).unwrap()
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let store = SessionStore::new(Duration::from_millis(50));
        store.insert_new(session("a")).unwrap();
        assert!(matches!(
            store.insert_new(session("a")),
            Err(DsoError::DuplicateSession(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn held_write_lock_times_out_readers() {
        let store = SessionStore::new(Duration::from_millis(20));
        let handle = store.insert_new(session("a")).unwrap();
        let _guard = store.write("a", &handle).unwrap();

        let other = store.handle("a").unwrap();
        let err = store.read("a", &other).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.code(), "concurrency_timeout");
    }

    #[test]
    fn removed_handles_go_stale() {
        let store = SessionStore::new(Duration::from_millis(20));
        let handle = store.insert_new(session("a")).unwrap();
        assert!(store.ensure_current("a", &handle).is_ok());

        assert!(store.remove_if_current("a", &handle));
        assert!(store.ensure_current("a", &handle).is_err());

        // a new session under the same id does not revive the old handle
        store.insert_new(session("a")).unwrap();
        assert!(store.ensure_current("a", &handle).is_err());
    }
}
