//! Authentication module for the internship log
//!
//! This module provides authentication functionality including:
//! - JWT access token generation and validation
//! - User registration and login
//! - Single-use refresh tokens rotated through an httpOnly cookie
//! - REST API endpoints for auth operations

pub mod api;
pub mod extract;
pub mod jwt;
pub mod service;

pub use api::{AuthApiState, auth_api_router};
pub use extract::{AuthGate, CurrentUser};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, TokenType};
pub use service::{
    AuthError, AuthService, AuthSession, LoginRequest, RegisterRequest, SessionTokens,
};
