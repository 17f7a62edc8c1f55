//! Records module for the internship log
//!
//! This module provides REST API endpoints for internship log records:
//! - Create, read, update, delete records
//! - Search and sort over the visible set
//! - Adjacent-record navigation
//! - Role-based visibility (owners write, viewers read)

pub mod api;

pub use api::{RecordApiState, record_api_router};
