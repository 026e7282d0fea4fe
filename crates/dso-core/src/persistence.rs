//! Session persistence
//!
//! The manager persists every computed snapshot before swapping it into
//! the store, so a backend failure leaves the in-memory session unchanged.

use crate::config::PersistenceConfig;
use crate::error::PersistenceError;
use dashmap::DashMap;
use dso_model::Session;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Storage backend for session snapshots
#[cfg_attr(test, mockall::automock)]
pub trait SessionPersistence: Send + Sync {
    /// Store (or replace) a snapshot
    fn save(&self, session: &Session) -> Result<(), PersistenceError>;

    /// Fetch a snapshot by id
    fn load(&self, id: &str) -> Result<Option<Session>, PersistenceError>;

    /// Remove a snapshot; missing ids are not an error
    fn delete(&self, id: &str) -> Result<(), PersistenceError>;

    /// Every stored id
    fn list_ids(&self) -> Result<Vec<String>, PersistenceError>;
}

/// Build the backend selected by configuration
///
/// # Errors
/// Returns `PersistenceError::Io` if the storage directory cannot be created
pub fn from_config(
    config: &PersistenceConfig,
) -> Result<Arc<dyn SessionPersistence>, PersistenceError> {
    Ok(match config {
        PersistenceConfig::Memory => Arc::new(InMemoryPersistence::new()),
        PersistenceConfig::JsonDir { path } => Arc::new(JsonDirPersistence::open(path)?),
    })
}

/// Process-local backend
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    sessions: DashMap<String, Session>,
}

impl InMemoryPersistence {
    /// Create empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Get number of stored sessions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionPersistence for InMemoryPersistence {
    fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<Session>, PersistenceError> {
        Ok(self.sessions.get(id).map(|s| s.value().clone()))
    }

    fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        self.sessions.remove(id);
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<String>, PersistenceError> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

/// One pretty-printed JSON document per session
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the target, so readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct JsonDirPersistence {
    dir: PathBuf,
}

impl JsonDirPersistence {
    /// Open (creating if needed) a storage directory
    ///
    /// # Errors
    /// Returns `PersistenceError::Io` if the directory cannot be created
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Storage directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, PersistenceError> {
        let storable = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if storable {
            Ok(self.dir.join(format!("{id}.json")))
        } else {
            Err(PersistenceError::InvalidId(id.to_string()))
        }
    }
}

impl SessionPersistence for JsonDirPersistence {
    fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        let path = self.path_for(&session.id)?;
        let bytes =
            serde_json::to_vec_pretty(session).map_err(|source| PersistenceError::Encode {
                id: session.id.clone(),
                source,
            })?;
        let io = |source| PersistenceError::Io {
            path: path.clone(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(io)?;
        temp.write_all(&bytes).map_err(io)?;
        temp.as_file().sync_all().map_err(io)?;
        temp.persist(&path).map_err(|e| io(e.error))?;
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<Session>, PersistenceError> {
        let path = self.path_for(id)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistenceError::Decode { path, source })
    }

    fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }

    fn list_ids(&self) -> Result<Vec<String>, PersistenceError> {
        let io = |source| PersistenceError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io)? {
            let path = entry.map_err(io)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
