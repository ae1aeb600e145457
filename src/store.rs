//! Credential Store
//!
//! Persistence port for accounts plus the Postgres implementation. The
//! session layer only sees the trait, so the lifecycle logic can be
//! exercised against an in-memory double.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, User};

/// Store-level failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint hit on email or user_name
    #[error("Duplicate email or username")]
    Duplicate,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(err.to_string())
    }
}

/// Port for account persistence operations.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account and return the stored row.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Find an account by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Find an account by exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Find an account matching either identifier.
    async fn find_by_email_or_username(
        &self,
        email: &str,
        user_name: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Overwrite or clear the stored refresh token.
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError>;

    /// Replace the password hash.
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;

    /// Apply the present profile fields and return the updated row.
    async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    /// Replace the avatar URL and return the updated row.
    async fn set_avatar_url(&self, id: Uuid, url: &str) -> Result<Option<User>, StoreError>;

    /// Replace the cover image URL and return the updated row.
    async fn set_cover_image_url(&self, id: Uuid, url: &str) -> Result<Option<User>, StoreError>;
}

/// Postgres-backed account store
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the schema if it does not exist yet
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        tracing::info!("Running account store migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_name VARCHAR(100) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(100) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                avatar_url VARCHAR(500) NOT NULL,
                cover_image_url VARCHAR(500),
                refresh_token TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);")
            .execute(&self.db)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_user_name ON users(user_name);")
            .execute(&self.db)
            .await?;

        tracing::info!("Account store migrations completed");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_name, email, full_name, password_hash, avatar_url, cover_image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new_user.user_name)
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&new_user.password_hash)
        .bind(&new_user.avatar_url)
        .bind(&new_user.cover_image_url)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn find_by_email_or_username(
        &self,
        email: &str,
        user_name: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 OR user_name = $2",
        )
        .bind(email)
        .bind(user_name)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn set_avatar_url(&self, id: Uuid, url: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET avatar_url = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(url)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn set_cover_image_url(&self, id: Uuid, url: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET cover_image_url = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(url)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory store double for lifecycle tests

    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<HashMap<Uuid, User>>,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Direct row access for asserting on stored state
        pub fn get(&self, id: Uuid) -> Option<User> {
            self.users.lock().unwrap().get(&id).cloned()
        }

        pub fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
            let mut users = self.users.lock().unwrap();

            let taken = users
                .values()
                .any(|u| u.email == new_user.email || u.user_name == new_user.user_name);
            if taken {
                return Err(StoreError::Duplicate);
            }

            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                user_name: new_user.user_name,
                email: new_user.email,
                full_name: new_user.full_name,
                password_hash: new_user.password_hash,
                avatar_url: new_user.avatar_url,
                cover_image_url: new_user.cover_image_url,
                refresh_token: None,
                created_at: now,
                updated_at: now,
            };
            users.insert(user.id, user.clone());

            Ok(user)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn find_by_email_or_username(
            &self,
            email: &str,
            user_name: &str,
        ) -> Result<Option<User>, StoreError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == email || u.user_name == user_name)
                .cloned())
        }

        async fn set_refresh_token(
            &self,
            id: Uuid,
            token: Option<&str>,
        ) -> Result<(), StoreError> {
            if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
                user.refresh_token = token.map(|t| t.to_string());
                user.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
            if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn update_profile(
            &self,
            id: Uuid,
            full_name: Option<&str>,
            email: Option<&str>,
        ) -> Result<Option<User>, StoreError> {
            let mut users = self.users.lock().unwrap();
            match users.get_mut(&id) {
                Some(user) => {
                    if let Some(full_name) = full_name {
                        user.full_name = full_name.to_string();
                    }
                    if let Some(email) = email {
                        user.email = email.to_string();
                    }
                    user.updated_at = Utc::now();
                    Ok(Some(user.clone()))
                }
                None => Ok(None),
            }
        }

        async fn set_avatar_url(&self, id: Uuid, url: &str) -> Result<Option<User>, StoreError> {
            let mut users = self.users.lock().unwrap();
            match users.get_mut(&id) {
                Some(user) => {
                    user.avatar_url = url.to_string();
                    user.updated_at = Utc::now();
                    Ok(Some(user.clone()))
                }
                None => Ok(None),
            }
        }

        async fn set_cover_image_url(
            &self,
            id: Uuid,
            url: &str,
        ) -> Result<Option<User>, StoreError> {
            let mut users = self.users.lock().unwrap();
            match users.get_mut(&id) {
                Some(user) => {
                    user.cover_image_url = Some(url.to_string());
                    user.updated_at = Utc::now();
                    Ok(Some(user.clone()))
                }
                None => Ok(None),
            }
        }
    }
}
