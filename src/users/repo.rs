use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::info;

use super::error::{UserError, UserResult};
use super::repo_types::{NewUser, User};

/// Persistence for user records.
///
/// No method checks email uniqueness; a second `save` with the same email
/// creates a second row.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user and return it with the identifier assigned by the store.
    async fn save(&self, user: NewUser) -> UserResult<User>;

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>>;

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>>;

    /// Overwrite the stored record with the same id.
    async fn update(&self, user: User) -> UserResult<User>;
}

const USER_COLUMNS: &str =
    "id, name, occupation, email, password_hash, avatar_file_name, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn save(&self, user: NewUser) -> UserResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (name, occupation, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.occupation)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            ORDER BY id
            LIMIT 1
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let sql = format!(
            r#"
            UPDATE users
               SET name = $2,
                   occupation = $3,
                   email = $4,
                   password_hash = $5,
                   avatar_file_name = $6,
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.occupation)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.avatar_file_name)
            .fetch_optional(&self.db)
            .await?
            .ok_or(UserError::NotFound(user.id))
    }
}

#[derive(Debug, Default)]
struct MemoryTable {
    next_id: i64,
    rows: HashMap<i64, User>,
}

/// Process-local repository for tests and local development.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<MemoryTable>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: NewUser) -> UserResult<User> {
        let mut table = self.table.write().await;
        table.next_id += 1;

        let now = OffsetDateTime::now_utc();
        let stored = User {
            id: table.next_id,
            name: user.name,
            occupation: user.occupation,
            email: user.email,
            password_hash: user.password_hash,
            avatar_file_name: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(stored.id, stored.clone());

        info!(user_id = stored.id, email = %stored.email, "user stored in memory");
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|u| u.email == email)
            .min_by_key(|u| u.id)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn update(&self, mut user: User) -> UserResult<User> {
        let mut table = self.table.write().await;
        let Some(existing) = table.rows.get_mut(&user.id) else {
            return Err(UserError::NotFound(user.id));
        };
        user.created_at = existing.created_at;
        user.updated_at = OffsetDateTime::now_utc();
        *existing = user.clone();
        Ok(user)
    }
}
