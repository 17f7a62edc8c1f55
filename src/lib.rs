//! InternLog - Personal Internship Log
//!
//! A single-owner internship journal with JWT authentication, daily records,
//! comments, and an LLM-backed summarize endpoint, served over axum with a
//! static frontend.

pub mod core;
