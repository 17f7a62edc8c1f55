//! Database repositories for the internship log
//!
//! This module provides repository implementations for database operations.
//! Repositories encapsulate data access logic and provide a clean API for
//! business logic to interact with the database.

pub mod comment;
pub mod profile;
pub mod record;
pub mod refresh_token;
pub mod user;

pub use comment::{CommentRepository, CommentRepositoryError};
pub use profile::{ProfileRepository, ProfileRepositoryError};
pub use record::{RecordRepository, RecordRepositoryError, RecordScope, RecordSort};
pub use refresh_token::{RefreshTokenRepository, RefreshTokenRepositoryError};
pub use user::{UserRepository, UserRepositoryError};
