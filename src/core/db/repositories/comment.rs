//! Comment repository for database operations

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{Comment, CommentWithAuthor};

/// Comment repository error types
#[derive(Debug, thiserror::Error)]
pub enum CommentRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

const COMMENT_COLUMNS: &str = "id, record_id, user_id, content, created_at, updated_at";

/// Comment repository for database operations
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    /// Create a new comment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all comments on a record, oldest first, with author emails joined in
    pub async fn list_for_record(
        &self,
        record_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, CommentRepositoryError> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.record_id, c.user_id,
                   COALESCE(u.email, '') AS user_email,
                   c.content, c.created_at, c.updated_at
            FROM comments c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.record_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Find a comment by its id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, CommentRepositoryError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Create a comment on a record
    pub async fn create(
        &self,
        record_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Comment, CommentRepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO comments (id, record_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::new_v4())
            .bind(record_id)
            .bind(user_id)
            .bind(content)
            .fetch_one(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Replace a comment's content and bump `updated_at`.
    ///
    /// Returns `None` if the comment no longer exists.
    pub async fn update_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Comment>, CommentRepositoryError> {
        let sql = format!(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Delete a comment by id, returning whether a row was removed
    pub async fn delete(&self, id: Uuid) -> Result<bool, CommentRepositoryError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
