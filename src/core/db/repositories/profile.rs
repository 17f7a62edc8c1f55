//! Profile repository for database operations
//!
//! One profile row per user, seeded empty at registration and filled in
//! later. Reads on the owner path create the row on demand.

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{Profile, UpdateProfile};

/// Profile repository error types
#[derive(Debug, thiserror::Error)]
pub enum ProfileRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

const PROFILE_COLUMNS: &str =
    "id, user_id, name, company, position, interests, email, github, linkedin, updated_at";

/// Profile repository for database operations
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Create a new profile repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an empty profile row for `user_id`
    pub async fn create_default(
        &self,
        user_id: Uuid,
    ) -> Result<Profile, ProfileRepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO profiles (id, user_id)
            VALUES ($1, $2)
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Find the profile belonging to `user_id`
    pub async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Profile>, ProfileRepositoryError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Fetch the profile for `user_id`, creating an empty row if missing
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<Profile, ProfileRepositoryError> {
        if let Some(profile) = self.find_by_user(user_id).await? {
            return Ok(profile);
        }
        self.create_default(user_id).await
    }

    /// Partially update the profile for `user_id`, creating the row if missing.
    ///
    /// `None` fields keep their stored value; `updated_at` is always bumped.
    pub async fn update(
        &self,
        user_id: Uuid,
        update: &UpdateProfile,
    ) -> Result<Profile, ProfileRepositoryError> {
        // Ensure the row exists so the UPDATE always has a target
        self.get_or_create(user_id).await?;

        let sql = format!(
            r#"
            UPDATE profiles
            SET name = COALESCE($2, name),
                company = COALESCE($3, company),
                position = COALESCE($4, position),
                interests = COALESCE($5, interests),
                email = COALESCE($6, email),
                github = COALESCE($7, github),
                linkedin = COALESCE($8, linkedin),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .bind(update.name.as_deref())
            .bind(update.company.as_deref())
            .bind(update.position.as_deref())
            .bind(update.interests.as_deref())
            .bind(update.email.as_deref())
            .bind(update.github.as_deref())
            .bind(update.linkedin.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok(profile)
    }
}
