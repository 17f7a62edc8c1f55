//! Comments module for the internship log
//!
//! This module provides REST API endpoints for comments on records:
//! - List and create comments on visible records
//! - Edit and delete own comments

pub mod api;

pub use api::{CommentApiState, comment_api_router};
