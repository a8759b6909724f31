use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Role, User, UserRow, UserSummary, UserSummaryRow};
use crate::store::{from_sqlx, StoreError, StoreResult};

pub const DUPLICATE_EMAIL: &str = "Email already registered";

/// Persistence of user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    /// All users, ordered by email.
    async fn list_all(&self) -> StoreResult<Vec<UserSummary>>;
    async fn update_role(&self, id: Uuid, role: Role) -> StoreResult<UserSummary>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        // The unique index on lower(email) decides races between registrations.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.password_hash.as_str())
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| from_sqlx(e, DUPLICATE_EMAIL, "insert user"))?;
        Ok(User::try_from(row)?)
    }

    async fn list_all(&self) -> StoreResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            r#"
            SELECT id, email, name, role
            FROM users
            ORDER BY email ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        let users = rows
            .into_iter()
            .map(UserSummary::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(users)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> StoreResult<UserSummary> {
        let row = sqlx::query_as::<_, UserSummaryRow>(
            r#"
            UPDATE users SET role = $2
            WHERE id = $1
            RETURNING id, email, name, role
            "#,
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.db)
        .await
        .context("update user role")?
        .ok_or(StoreError::NotFound("User"))?;
        Ok(UserSummary::try_from(row)?)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }
}
