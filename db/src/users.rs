use chrono::{DateTime, Utc};
use sqlx::{types::Uuid, PgPool};

use crate::errors::{conflict_on_unique, Error, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserFromDB {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

impl UserFromDB {
    /// "First Last", falling back to the username when both names are blank.
    pub fn display_name(&self) -> String {
        let full_name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full_name = full_name.trim();

        if full_name.is_empty() {
            self.username.clone()
        } else {
            full_name.to_string()
        }
    }

    pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<Self> {
        sqlx::query_as::<_, UserFromDB>(
            "
            INSERT INTO users (email, username, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(new_user.email)
        .bind(new_user.username)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A user with that email or username already exists"))
    }

    pub async fn get_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, UserFromDB>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get_existing(pool: &PgPool, user_id: Uuid) -> Result<Self> {
        Self::get_by_id(pool, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {user_id} not found")))
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, UserFromDB>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>> {
        let users = sqlx::query_as::<_, UserFromDB>(
            "
            SELECT * FROM users
            ORDER BY username
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    pub async fn set_password_hash(&self, pool: &PgPool, password_hash: String) -> Result<()> {
        sqlx::query(
            "
            UPDATE users
            SET password_hash = $2,
                updated_at = NOW()
            WHERE user_id = $1
            ",
        )
        .bind(self.user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn set_staff(pool: &PgPool, user_id: Uuid, is_staff: bool) -> Result<()> {
        sqlx::query("UPDATE users SET is_staff = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .bind(is_staff)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    pub async fn create(pool: &PgPool, user_id: Uuid, token_hash: String) -> Result<Self> {
        let token = sqlx::query_as::<_, AuthToken>(
            "
            INSERT INTO auth_tokens (token_hash, user_id)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(token_hash)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    pub async fn find_user(pool: &PgPool, token_hash: &str) -> Result<Option<UserFromDB>> {
        let user = sqlx::query_as::<_, UserFromDB>(
            "
            SELECT u.*
            FROM users u
            JOIN auth_tokens t ON t.user_id = u.user_id
            WHERE t.token_hash = $1
            ",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn delete(pool: &PgPool, token_hash: &str) -> Result<()> {
        sqlx::query("DELETE FROM auth_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;

        Ok(())
    }
}
