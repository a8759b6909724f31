use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::resumes::dto::{ResumeDraft, StoredResume};
use crate::store::{lock_tables, SharedTables, StoreError, StoreResult};

/// One draft per user; saving replaces it.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<StoredResume>>;
    async fn upsert(&self, user_id: Uuid, draft: ResumeDraft) -> StoreResult<StoredResume>;
}

#[derive(Debug, FromRow)]
struct ResumeRow {
    user_id: Uuid,
    document: Json<ResumeDraft>,
    updated_at: OffsetDateTime,
}

impl From<ResumeRow> for StoredResume {
    fn from(r: ResumeRow) -> Self {
        Self {
            user_id: r.user_id,
            draft: r.document.0,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgResumeStore {
    db: PgPool,
}

impl PgResumeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<StoredResume>> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            SELECT user_id, document, updated_at
            FROM resumes
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find resume by user")?;
        Ok(row.map(StoredResume::from))
    }

    async fn upsert(&self, user_id: Uuid, draft: ResumeDraft) -> StoreResult<StoredResume> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes (user_id, document)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET document = EXCLUDED.document, updated_at = now()
            RETURNING user_id, document, updated_at
            "#,
        )
        .bind(user_id)
        .bind(Json(&draft))
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            // Token outlived its account.
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::NotFound("User")
            }
            _ => StoreError::Backend(anyhow::Error::new(e).context("upsert resume")),
        })?;
        Ok(row.into())
    }
}

/// Process-local resume store. Shares its tables with the user store so an
/// upsert for a missing user fails the way the foreign key makes it fail.
pub struct MemoryResumeStore {
    tables: SharedTables,
}

impl MemoryResumeStore {
    pub fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<StoredResume>> {
        Ok(lock_tables(&self.tables)?.resumes.get(&user_id).cloned())
    }

    async fn upsert(&self, user_id: Uuid, draft: ResumeDraft) -> StoreResult<StoredResume> {
        let mut tables = lock_tables(&self.tables)?;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("User"));
        }
        let stored = StoredResume {
            user_id,
            draft,
            updated_at: OffsetDateTime::now_utc(),
        };
        tables.resumes.insert(user_id, stored.clone());
        Ok(stored)
    }
}
