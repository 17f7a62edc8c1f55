//! Record repository for database operations
//!
//! Internship-log entries with role-scoped visibility: owners query their own
//! rows, viewers query the rows of every owner-role user. Search and sort are
//! applied in SQL.

use std::str::FromStr;

use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::core::db::models::{CreateRecord, Record, UpdateRecord};

/// Record repository error types
#[derive(Debug, thiserror::Error)]
pub enum RecordRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Which records a caller may see
#[derive(Debug, Clone, Copy)]
pub enum RecordScope {
    /// Owner session: only their own records
    Mine(Uuid),
    /// Viewer session: the records of every owner-role user
    AllOwners,
}

/// Sort order for record listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordSort {
    /// Newest first, the default
    #[default]
    DateDesc,
    DateAsc,
    Title,
}

impl RecordSort {
    fn order_clause(&self) -> &'static str {
        match self {
            RecordSort::DateDesc => "ORDER BY date DESC, created_at DESC",
            RecordSort::DateAsc => "ORDER BY date ASC, created_at ASC",
            RecordSort::Title => "ORDER BY title ASC",
        }
    }
}

impl FromStr for RecordSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date-desc" => Ok(RecordSort::DateDesc),
            "date-asc" => Ok(RecordSort::DateAsc),
            "title" => Ok(RecordSort::Title),
            _ => Err(format!("Invalid sort: {}", s)),
        }
    }
}

const RECORD_COLUMNS: &str =
    "id, user_id, date, start_time, end_time, title, content, tags, created_at, updated_at";

/// Record repository for database operations
#[derive(Clone)]
pub struct RecordRepository {
    pool: PgPool,
}

impl RecordRepository {
    /// Create a new record repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List visible records, optionally filtered by a search keyword.
    ///
    /// The keyword matches title, content, or the tags JSON case-insensitively;
    /// blank keywords are ignored.
    pub async fn list(
        &self,
        scope: RecordScope,
        search: Option<&str>,
        sort: RecordSort,
    ) -> Result<Vec<Record>, RecordRepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let records = match scope {
            RecordScope::Mine(user_id) => {
                let sql = format!(
                    r#"
                    SELECT {RECORD_COLUMNS}
                    FROM records
                    WHERE user_id = $1
                      AND ($2::text IS NULL
                           OR title ILIKE $2 OR content ILIKE $2 OR tags::text ILIKE $2)
                    {}
                    "#,
                    sort.order_clause()
                );
                sqlx::query_as::<_, Record>(&sql)
                    .bind(user_id)
                    .bind(pattern)
                    .fetch_all(&self.pool)
                    .await?
            }
            RecordScope::AllOwners => {
                let sql = format!(
                    r#"
                    SELECT {RECORD_COLUMNS}
                    FROM records
                    WHERE user_id IN (SELECT id FROM users WHERE role = 'owner')
                      AND ($1::text IS NULL
                           OR title ILIKE $1 OR content ILIKE $1 OR tags::text ILIKE $1)
                    {}
                    "#,
                    sort.order_clause()
                );
                sqlx::query_as::<_, Record>(&sql)
                    .bind(pattern)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(records)
    }

    /// Fetch a single record if it is visible under the given scope.
    ///
    /// Absent and not-visible both come back as `None`.
    pub async fn find_visible(
        &self,
        id: Uuid,
        scope: RecordScope,
    ) -> Result<Option<Record>, RecordRepositoryError> {
        let record = match scope {
            RecordScope::Mine(user_id) => {
                let sql = format!(
                    "SELECT {RECORD_COLUMNS} FROM records WHERE id = $1 AND user_id = $2"
                );
                sqlx::query_as::<_, Record>(&sql)
                    .bind(id)
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            RecordScope::AllOwners => {
                let sql = format!(
                    r#"
                    SELECT {RECORD_COLUMNS}
                    FROM records
                    WHERE id = $1
                      AND user_id IN (SELECT id FROM users WHERE role = 'owner')
                    "#
                );
                sqlx::query_as::<_, Record>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        Ok(record)
    }

    /// Create a new record owned by `user_id`
    pub async fn create(
        &self,
        user_id: Uuid,
        record: &CreateRecord,
    ) -> Result<Record, RecordRepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO records (id, user_id, date, start_time, end_time, title, content, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Record>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(record.date)
            .bind(record.start_time.as_deref())
            .bind(record.end_time.as_deref())
            .bind(&record.title)
            .bind(&record.content)
            .bind(Json(&record.tags))
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    /// Partially update a record owned by `user_id`.
    ///
    /// `None` fields keep their stored value; `updated_at` is always bumped.
    /// Returns `None` when the record is absent or owned by someone else.
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        update: &UpdateRecord,
    ) -> Result<Option<Record>, RecordRepositoryError> {
        let sql = format!(
            r#"
            UPDATE records
            SET date = COALESCE($3, date),
                start_time = COALESCE($4, start_time),
                end_time = COALESCE($5, end_time),
                title = COALESCE($6, title),
                content = COALESCE($7, content),
                tags = COALESCE($8, tags),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {RECORD_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Record>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(update.date)
            .bind(update.start_time.as_deref())
            .bind(update.end_time.as_deref())
            .bind(update.title.as_deref())
            .bind(update.content.as_deref())
            .bind(update.tags.as_ref().map(Json))
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    /// Delete a record owned by `user_id`; returns whether a row was removed
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool, RecordRepositoryError> {
        let result = sqlx::query("DELETE FROM records WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::pool::{DbConfig, create_pool};
    use chrono::{Datelike, NaiveDate};

    // ========================================================================
    // RecordSort Tests (no database required)
    // ========================================================================

    #[test]
    fn test_record_sort_from_str() {
        assert_eq!("date-desc".parse::<RecordSort>().unwrap(), RecordSort::DateDesc);
        assert_eq!("date-asc".parse::<RecordSort>().unwrap(), RecordSort::DateAsc);
        assert_eq!("title".parse::<RecordSort>().unwrap(), RecordSort::Title);
        assert!("newest".parse::<RecordSort>().is_err());
        assert!("DATE-DESC".parse::<RecordSort>().is_err());
    }

    #[test]
    fn test_record_sort_default_is_date_desc() {
        assert_eq!(RecordSort::default(), RecordSort::DateDesc);
    }

    #[test]
    fn test_record_sort_order_clauses() {
        assert_eq!(
            RecordSort::DateDesc.order_clause(),
            "ORDER BY date DESC, created_at DESC"
        );
        assert_eq!(
            RecordSort::DateAsc.order_clause(),
            "ORDER BY date ASC, created_at ASC"
        );
        assert_eq!(RecordSort::Title.order_clause(), "ORDER BY title ASC");
    }

    // ========================================================================
    // Test Helpers
    // ========================================================================

    async fn create_test_pool() -> PgPool {
        let config = DbConfig::from_env()
            .expect("DATABASE_URL must be set")
            .max_connections(5);
        create_pool(&config).await.expect("Failed to create pool")
    }

    async fn setup_test_user(pool: &PgPool, role: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(format!("record_test_{}@example.com", user_id))
        .bind("$2b$12$placeholderhashvalue000000000000000000000000000000000")
        .bind(role)
        .execute(pool)
        .await
        .expect("Failed to create test user");
        user_id
    }

    async fn cleanup_test_user(pool: &PgPool, user_id: Uuid) {
        // Cascades to records and comments
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await
            .expect("Failed to clean up test user");
    }

    fn sample_record(day: u32, title: &str) -> CreateRecord {
        CreateRecord {
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            start_time: Some("09:00".to_string()),
            end_time: Some("17:00".to_string()),
            title: title.to_string(),
            content: "Worked on the pipeline".to_string(),
            tags: vec!["ci".to_string()],
        }
    }

    // ========================================================================
    // Database Tests (require a running database)
    // ========================================================================

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_create_and_find_visible() {
        let pool = create_test_pool().await;
        let owner_id = setup_test_user(&pool, "owner").await;
        let repo = RecordRepository::new(pool.clone());

        let created = repo
            .create(owner_id, &sample_record(14, "Set up CI"))
            .await
            .unwrap();
        assert_eq!(created.title, "Set up CI");
        assert_eq!(created.tags.0, vec!["ci".to_string()]);
        assert!(created.updated_at.is_none());

        let mine = repo
            .find_visible(created.id, RecordScope::Mine(owner_id))
            .await
            .unwrap();
        assert!(mine.is_some());

        // Owner records are visible to the viewer scope
        let viewer_view = repo
            .find_visible(created.id, RecordScope::AllOwners)
            .await
            .unwrap();
        assert!(viewer_view.is_some());

        cleanup_test_user(&pool, owner_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_viewer_scope_excludes_viewer_records() {
        let pool = create_test_pool().await;
        let viewer_id = setup_test_user(&pool, "viewer").await;
        let repo = RecordRepository::new(pool.clone());

        let created = repo
            .create(viewer_id, &sample_record(14, "Private note"))
            .await
            .unwrap();

        // A record owned by a viewer-role user is not in the owners window
        let found = repo
            .find_visible(created.id, RecordScope::AllOwners)
            .await
            .unwrap();
        assert!(found.is_none());

        // But it is visible to its own scope
        let found = repo
            .find_visible(created.id, RecordScope::Mine(viewer_id))
            .await
            .unwrap();
        assert!(found.is_some());

        cleanup_test_user(&pool, viewer_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_list_search_matches_title_content_tags() {
        let pool = create_test_pool().await;
        let owner_id = setup_test_user(&pool, "owner").await;
        let repo = RecordRepository::new(pool.clone());

        let marker = Uuid::new_v4().simple().to_string();

        let mut by_title = sample_record(10, "irrelevant");
        by_title.title = format!("title-{}", marker);
        let mut by_content = sample_record(11, "second");
        by_content.content = format!("content mentions {}", marker);
        let mut by_tag = sample_record(12, "third");
        by_tag.tags = vec![format!("tag-{}", marker)];
        let unrelated = sample_record(13, "unrelated");

        for record in [&by_title, &by_content, &by_tag, &unrelated] {
            repo.create(owner_id, record).await.unwrap();
        }

        let hits = repo
            .list(
                RecordScope::Mine(owner_id),
                Some(marker.as_str()),
                RecordSort::DateAsc,
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 3);

        cleanup_test_user(&pool, owner_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_list_blank_search_is_ignored() {
        let pool = create_test_pool().await;
        let owner_id = setup_test_user(&pool, "owner").await;
        let repo = RecordRepository::new(pool.clone());

        repo.create(owner_id, &sample_record(14, "One")).await.unwrap();

        let all = repo
            .list(RecordScope::Mine(owner_id), Some("   "), RecordSort::DateDesc)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        cleanup_test_user(&pool, owner_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_list_sort_orders() {
        let pool = create_test_pool().await;
        let owner_id = setup_test_user(&pool, "owner").await;
        let repo = RecordRepository::new(pool.clone());

        repo.create(owner_id, &sample_record(10, "Bravo")).await.unwrap();
        repo.create(owner_id, &sample_record(20, "Alpha")).await.unwrap();
        repo.create(owner_id, &sample_record(15, "Charlie")).await.unwrap();

        let desc = repo
            .list(RecordScope::Mine(owner_id), None, RecordSort::DateDesc)
            .await
            .unwrap();
        let dates: Vec<u32> = desc.iter().map(|r| r.date.day()).collect();
        assert_eq!(dates, vec![20, 15, 10]);

        let asc = repo
            .list(RecordScope::Mine(owner_id), None, RecordSort::DateAsc)
            .await
            .unwrap();
        let dates: Vec<u32> = asc.iter().map(|r| r.date.day()).collect();
        assert_eq!(dates, vec![10, 15, 20]);

        let by_title = repo
            .list(RecordScope::Mine(owner_id), None, RecordSort::Title)
            .await
            .unwrap();
        let titles: Vec<&str> = by_title.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Bravo", "Charlie"]);

        cleanup_test_user(&pool, owner_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_update_partial_keeps_unset_fields() {
        let pool = create_test_pool().await;
        let owner_id = setup_test_user(&pool, "owner").await;
        let repo = RecordRepository::new(pool.clone());

        let created = repo
            .create(owner_id, &sample_record(14, "Before"))
            .await
            .unwrap();

        let update = UpdateRecord {
            title: Some("After".to_string()),
            ..Default::default()
        };
        let updated = repo
            .update(created.id, owner_id, &update)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "After");
        assert_eq!(updated.date, created.date);
        assert_eq!(updated.start_time, created.start_time);
        assert!(updated.updated_at.is_some());

        cleanup_test_user(&pool, owner_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_update_foreign_record_returns_none() {
        let pool = create_test_pool().await;
        let owner_id = setup_test_user(&pool, "owner").await;
        let other_id = setup_test_user(&pool, "owner").await;
        let repo = RecordRepository::new(pool.clone());

        let created = repo
            .create(owner_id, &sample_record(14, "Mine"))
            .await
            .unwrap();

        let update = UpdateRecord {
            title: Some("Stolen".to_string()),
            ..Default::default()
        };
        let result = repo.update(created.id, other_id, &update).await.unwrap();
        assert!(result.is_none());

        cleanup_test_user(&pool, owner_id).await;
        cleanup_test_user(&pool, other_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_delete_record() {
        let pool = create_test_pool().await;
        let owner_id = setup_test_user(&pool, "owner").await;
        let repo = RecordRepository::new(pool.clone());

        let created = repo
            .create(owner_id, &sample_record(14, "Doomed"))
            .await
            .unwrap();

        assert!(repo.delete(created.id, owner_id).await.unwrap());
        assert!(!repo.delete(created.id, owner_id).await.unwrap());

        cleanup_test_user(&pool, owner_id).await;
    }
}
