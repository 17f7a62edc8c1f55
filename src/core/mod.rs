//! Core domain models and business logic for the internship log service

pub mod auth;
pub mod comments;
pub mod config;
pub mod db;
pub mod llm_api;
pub mod profile;
pub mod records;
