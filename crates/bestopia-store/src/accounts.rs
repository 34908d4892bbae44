//! User accounts: sign-up, credential lookup, and the admin role check.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;

use crate::{PgStore, StoreError};

/// A user row without its password hash, safe to serialize outward.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Credential row for sign-in verification.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

impl PgStore {
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&new_user.email)
            .fetch_one(&self.pool)
            .await?;
        if taken {
            return Err(StoreError::EmailTaken);
        }

        let row = sqlx::query(
            "INSERT INTO users (username, display_name, email, password) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, username, display_name, email, role, avatar, created_at",
        )
        .bind(&new_user.username)
        .bind(&new_user.display_name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
            avatar: row.try_get("avatar")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        let row = sqlx::query("SELECT id, email, password, role FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(UserCredentials {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password")?,
            role: row.try_get("role")?,
        }))
    }

    pub async fn role_of(&self, user_id: i64) -> Result<Option<String>, StoreError> {
        let role = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }
}
