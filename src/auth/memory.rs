use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{UserStore, DUPLICATE_EMAIL};
use crate::auth::repo_types::{NewUser, Role, User, UserSummary};
use crate::store::{lock_tables, MemoryTables, SharedTables, StoreError, StoreResult};

/// Process-local user store. Every operation runs inside one critical
/// section, so the email check and the insert cannot interleave.
#[derive(Default)]
pub struct MemoryUserStore {
    tables: SharedTables,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store over tables shared with a [`MemoryResumeStore`](crate::resumes::repo::MemoryResumeStore).
    pub fn with_tables(tables: SharedTables) -> Self {
        Self { tables }
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, MemoryTables>> {
        lock_tables(&self.tables)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.lock()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(DUPLICATE_EMAIL.into()));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_all(&self) -> StoreResult<Vec<UserSummary>> {
        let mut out: Vec<UserSummary> = self.lock()?.users.values().map(UserSummary::from).collect();
        out.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(out)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> StoreResult<UserSummary> {
        let mut tables = self.lock()?;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound("User"))?;
        user.role = role;
        Ok(UserSummary::from(&*user))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.lock()?;
        tables.users.remove(&id).ok_or(StoreError::NotFound("User"))?;
        tables.resumes.remove(&id);
        Ok(())
    }
}
