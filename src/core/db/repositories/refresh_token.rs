//! Refresh token repository for database operations
//!
//! Stores opaque single-use refresh tokens, one row per live session. The
//! store itself holds no policy: expiry decisions and error mapping live in
//! the auth service. Rotation is the one compound operation, implemented as a
//! conditional delete plus insert inside a single transaction.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::RefreshToken;

/// Refresh token repository error types
#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Refresh token repository for database operations
#[derive(Clone)]
pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new refresh token row; the opaque value is stored verbatim
    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, RefreshTokenRepositoryError> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, token, user_id, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, token, user_id, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Look up a token row by its opaque value
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshToken>, RefreshTokenRepositoryError> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, token, user_id, expires_at, created_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Delete a token row by value; returns whether a row was removed
    pub async fn delete_by_token(
        &self,
        token: &str,
    ) -> Result<bool, RefreshTokenRepositoryError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically consume `old_token` and insert its replacement.
    ///
    /// The delete is conditional on the row still being unexpired; exactly one
    /// concurrent caller per value can see `rows_affected() == 1`. Any other
    /// outcome rolls back and returns `None`: the caller lost the race, or
    /// the token expired between lookup and consume.
    pub async fn rotate(
        &self,
        old_token: &str,
        new_token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, RefreshTokenRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let deleted =
            sqlx::query("DELETE FROM refresh_tokens WHERE token = $1 AND expires_at > NOW()")
                .bind(old_token)
                .execute(&mut *tx)
                .await?;

        if deleted.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, token, user_id, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, token, user_id, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::pool::{DbConfig, create_pool};

    // ========================================================================
    // Test Helpers
    // ========================================================================

    async fn create_test_pool() -> PgPool {
        let config = DbConfig::from_env()
            .expect("DATABASE_URL must be set")
            .max_connections(5);
        create_pool(&config).await.expect("Failed to create pool")
    }

    async fn setup_test_user(pool: &PgPool) -> Uuid {
        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(format!("token_test_{}@example.com", user_id))
        .bind("$2b$12$placeholderhashvalue000000000000000000000000000000000")
        .bind("viewer")
        .execute(pool)
        .await
        .expect("Failed to create test user");
        user_id
    }

    async fn cleanup_test_user(pool: &PgPool, user_id: Uuid) {
        // Cascades to refresh_tokens
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await
            .expect("Failed to clean up test user");
    }

    fn fresh_value() -> String {
        Uuid::new_v4().to_string()
    }

    // ========================================================================
    // Database Tests (require a running database)
    // ========================================================================

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_create_and_find_token() {
        let pool = create_test_pool().await;
        let user_id = setup_test_user(&pool).await;
        let repo = RefreshTokenRepository::new(pool.clone());

        let value = fresh_value();
        let expires_at = Utc::now() + chrono::Duration::days(7);

        let created = repo.create(user_id, &value, expires_at).await.unwrap();
        assert_eq!(created.token, value);
        assert_eq!(created.user_id, user_id);
        assert!(!created.is_expired());

        let found = repo.find_by_token(&value).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        cleanup_test_user(&pool, user_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_find_unknown_token_returns_none() {
        let pool = create_test_pool().await;
        let repo = RefreshTokenRepository::new(pool);

        let found = repo.find_by_token(&fresh_value()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_delete_by_token_is_idempotent() {
        let pool = create_test_pool().await;
        let user_id = setup_test_user(&pool).await;
        let repo = RefreshTokenRepository::new(pool.clone());

        let value = fresh_value();
        repo.create(user_id, &value, Utc::now() + chrono::Duration::days(7))
            .await
            .unwrap();

        assert!(repo.delete_by_token(&value).await.unwrap());
        assert!(!repo.delete_by_token(&value).await.unwrap());

        cleanup_test_user(&pool, user_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_rotate_replaces_token() {
        let pool = create_test_pool().await;
        let user_id = setup_test_user(&pool).await;
        let repo = RefreshTokenRepository::new(pool.clone());

        let old_value = fresh_value();
        let new_value = fresh_value();
        let expires_at = Utc::now() + chrono::Duration::days(7);
        repo.create(user_id, &old_value, expires_at).await.unwrap();

        let rotated = repo
            .rotate(&old_value, &new_value, user_id, expires_at)
            .await
            .unwrap();
        assert!(rotated.is_some());

        // The old value is consumed, the new one is live
        assert!(repo.find_by_token(&old_value).await.unwrap().is_none());
        assert!(repo.find_by_token(&new_value).await.unwrap().is_some());

        cleanup_test_user(&pool, user_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_rotate_unknown_token_returns_none() {
        let pool = create_test_pool().await;
        let user_id = setup_test_user(&pool).await;
        let repo = RefreshTokenRepository::new(pool.clone());

        let rotated = repo
            .rotate(
                &fresh_value(),
                &fresh_value(),
                user_id,
                Utc::now() + chrono::Duration::days(7),
            )
            .await
            .unwrap();
        assert!(rotated.is_none());

        cleanup_test_user(&pool, user_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_rotate_expired_token_returns_none_and_leaves_row() {
        let pool = create_test_pool().await;
        let user_id = setup_test_user(&pool).await;
        let repo = RefreshTokenRepository::new(pool.clone());

        let old_value = fresh_value();
        repo.create(user_id, &old_value, Utc::now() - chrono::Duration::minutes(1))
            .await
            .unwrap();

        let rotated = repo
            .rotate(
                &old_value,
                &fresh_value(),
                user_id,
                Utc::now() + chrono::Duration::days(7),
            )
            .await
            .unwrap();
        assert!(rotated.is_none());

        // The conditional delete does not touch expired rows; eager cleanup
        // of those is the auth service's job
        assert!(repo.find_by_token(&old_value).await.unwrap().is_some());

        cleanup_test_user(&pool, user_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_rotate_has_exactly_one_winner() {
        let pool = create_test_pool().await;
        let user_id = setup_test_user(&pool).await;
        let repo = RefreshTokenRepository::new(pool.clone());

        let old_value = fresh_value();
        let expires_at = Utc::now() + chrono::Duration::days(7);
        repo.create(user_id, &old_value, expires_at).await.unwrap();

        let new_value_a = fresh_value();
        let new_value_b = fresh_value();
        let (a, b) = tokio::join!(
            repo.rotate(&old_value, &new_value_a, user_id, expires_at),
            repo.rotate(&old_value, &new_value_b, user_id, expires_at),
        );

        let a = a.unwrap();
        let b = b.unwrap();
        assert!(
            a.is_some() != b.is_some(),
            "exactly one concurrent rotation must win"
        );

        cleanup_test_user(&pool, user_id).await;
    }
}
