//! Profile module for the internship log
//!
//! This module provides REST API endpoints for the intern's public profile:
//! - Fetch the profile, with placeholder text for unfilled fields
//! - Update the profile (owner only)

pub mod api;

pub use api::{ProfileApiState, profile_api_router};
