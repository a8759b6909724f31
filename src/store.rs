use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::resumes::dto::StoredResume;

/// Failure of a store operation, already translated out of the driver's vocabulary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Translate a sqlx error; unique violations become [`StoreError::Conflict`].
pub(crate) fn from_sqlx(err: sqlx::Error, conflict: &str, context: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(conflict.to_string())
        }
        _ => StoreError::Backend(anyhow::Error::new(err).context(context)),
    }
}

/// Rows behind the in-memory stores. Users and resumes live under one lock
/// so deleting a user drops their resume, as the foreign key does in Postgres.
#[derive(Default)]
pub struct MemoryTables {
    pub(crate) users: HashMap<Uuid, User>,
    pub(crate) resumes: HashMap<Uuid, StoredResume>,
}

pub type SharedTables = Arc<Mutex<MemoryTables>>;

pub(crate) fn lock_tables(tables: &SharedTables) -> StoreResult<MutexGuard<'_, MemoryTables>> {
    tables
        .lock()
        .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory store lock poisoned")))
}
