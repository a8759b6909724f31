use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::Role;

/// What the client remembers between runs. Token, role and id live in one
/// record, so they are written and cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub user_id: Uuid,
}

/// Client-local persistent storage for the session record.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<Session>>;
    fn save(&self, session: &Session) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// JSON file on disk; writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> anyhow::Result<Option<Session>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("read {}", self.path.display())),
        };
        let session = serde_json::from_slice(&raw)
            .with_context(|| format!("parse session file {}", self.path.display()))?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(session)?)
            .with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> anyhow::Result<Option<Session>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        *self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        Session {
            token: "t.o.k".into(),
            role: Role::Admin,
            user_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn file_storage_persists_and_clears_whole_record() {
        let path = std::env::temp_dir().join(format!("resumed-session-{}.json", Uuid::new_v4()));
        let storage = FileSessionStorage::new(&path);
        assert_eq!(storage.load().unwrap(), None);

        let session = sample();
        storage.save(&session).unwrap();
        assert_eq!(FileSessionStorage::new(&path).load().unwrap(), Some(session));

        storage.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(storage.load().unwrap(), None);
        storage.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_partial_session() {
        let path = std::env::temp_dir().join(format!("resumed-session-{}.json", Uuid::new_v4()));
        std::fs::write(&path, br#"{"token":"abc"}"#).unwrap();
        let storage = FileSessionStorage::new(&path);
        assert!(storage.load().is_err());
        storage.clear().unwrap();
    }

    #[test]
    fn memory_storage_roundtrip() {
        let storage = MemorySessionStorage::new();
        let session = sample();
        storage.save(&session).unwrap();
        assert_eq!(storage.load().unwrap(), Some(session));
        storage.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }
}
