//! Authentication service
//!
//! Provides business logic for user registration, login, logout, and token
//! refresh. Coordinates between the user repository, the refresh token
//! repository, profile seeding, and the JWT service.

use crate::core::auth::jwt::{JwtError, JwtService};
use crate::core::db::models::{Role, User};
use crate::core::db::repositories::{
    ProfileRepository, RefreshTokenRepository, RefreshTokenRepositoryError, UserRepository,
    UserRepositoryError,
};
use uuid::Uuid;

/// Minimum password length in characters
const MIN_PASSWORD_CHARS: usize = 6;

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Missing refresh token")]
    MissingRefreshToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired, please log in again")]
    RefreshTokenExpired,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<UserRepositoryError> for AuthError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::EmailAlreadyExists => AuthError::EmailAlreadyExists,
            _ => AuthError::InternalError(err.to_string()),
        }
    }
}

impl From<RefreshTokenRepositoryError> for AuthError {
    fn from(err: RefreshTokenRepositoryError) -> Self {
        AuthError::InternalError(err.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        // The service only encodes tokens; any JWT failure here is internal
        AuthError::InternalError(err.to_string())
    }
}

/// Registration request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Login request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful token refresh
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    refresh_tokens: RefreshTokenRepository,
    profiles: ProfileRepository,
    jwt: JwtService,
    owner_email: String,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        users: UserRepository,
        refresh_tokens: RefreshTokenRepository,
        profiles: ProfileRepository,
        jwt: JwtService,
        owner_email: impl Into<String>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            profiles,
            jwt,
            owner_email: owner_email.into(),
        }
    }

    /// Validate email format
    fn validate_email(email: &str) -> Result<(), AuthError> {
        // Basic email validation
        if email.is_empty() {
            return Err(AuthError::InvalidEmail);
        }

        if !email.contains('@') || !email.contains('.') {
            return Err(AuthError::InvalidEmail);
        }

        // Check for valid structure: something@something.something
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return Err(AuthError::InvalidEmail);
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() || domain.is_empty() {
            return Err(AuthError::InvalidEmail);
        }

        if !domain.contains('.') {
            return Err(AuthError::InvalidEmail);
        }

        // Check domain has something after the dot
        let domain_parts: Vec<&str> = domain.split('.').collect();
        if domain_parts.iter().any(|p| p.is_empty()) {
            return Err(AuthError::InvalidEmail);
        }

        Ok(())
    }

    /// Validate password length, counted in characters rather than bytes
    fn validate_password(password: &str) -> Result<(), AuthError> {
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::PasswordTooShort);
        }

        Ok(())
    }

    /// Decide the role for a registering email.
    ///
    /// The configured owner email claims the owner role, compared
    /// case-insensitively. Everyone else registers as a viewer.
    fn role_for_email(owner_email: &str, email: &str) -> Role {
        if !owner_email.is_empty() && email.eq_ignore_ascii_case(owner_email) {
            Role::Owner
        } else {
            Role::Viewer
        }
    }

    /// Register a new user and seed their empty profile
    pub async fn register(&self, request: RegisterRequest) -> Result<(), AuthError> {
        // Validate input
        Self::validate_email(&request.email)?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        Self::validate_password(&request.password)?;

        let role = Self::role_for_email(&self.owner_email, &request.email);

        // Hash off the async runtime; bcrypt at cost 12 is CPU-heavy
        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || {
            UserRepository::hash_password(&password)
        })
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))??;

        let user = self.users.create(&request.email, &password_hash, role).await?;

        // Profile seeding is best-effort; the profile API creates on demand
        if let Err(e) = self.profiles.create_default(user.id).await {
            tracing::warn!(user_id = %user.id, "Failed to seed profile: {}", e);
        }

        Ok(())
    }

    /// Login an existing user, issuing an access token and a refresh token
    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, AuthError> {
        // Unknown email and wrong password answer identically
        let user = match self.users.find_by_email(&request.email).await? {
            Some(user) => user,
            None => return Err(AuthError::InvalidCredentials),
        };

        let password = request.password;
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || {
            UserRepository::verify_password(&password, &hash)
        })
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, _) = self.jwt.generate_access_token(user.id)?;

        let refresh_token = Uuid::new_v4().to_string();
        self.refresh_tokens
            .create(user.id, &refresh_token, self.jwt.refresh_token_expires_at())
            .await?;

        Ok(AuthSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Rotate a refresh token, returning a fresh access and refresh token pair.
    ///
    /// The presented token is single-use. Expired tokens are deleted on sight
    /// and reported distinctly so the client knows to log in again. A token
    /// that lost a concurrent rotation race is indistinguishable from an
    /// unknown one.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError> {
        let stored = self
            .refresh_tokens
            .find_by_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if stored.is_expired() {
            self.refresh_tokens.delete_by_token(refresh_token).await?;
            return Err(AuthError::RefreshTokenExpired);
        }

        let replacement = Uuid::new_v4().to_string();
        let rotated = self
            .refresh_tokens
            .rotate(
                refresh_token,
                &replacement,
                stored.user_id,
                self.jwt.refresh_token_expires_at(),
            )
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let (access_token, _) = self.jwt.generate_access_token(rotated.user_id)?;

        Ok(SessionTokens {
            access_token,
            refresh_token: replacement,
        })
    }

    /// Logout by discarding the refresh token. Unknown tokens are a no-op.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let _ = self.refresh_tokens.delete_by_token(refresh_token).await?;
        Ok(())
    }

    /// Cookie lifetime for refresh tokens, in days
    pub fn refresh_cookie_days(&self) -> i64 {
        self.jwt.refresh_token_expiration_days()
    }
}
