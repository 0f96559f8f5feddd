use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Usernames are stored trimmed, so a blank one is no username at all.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Username is required".into()));
    }
    Ok(())
}

/// Form submitted to create a new account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name, also used to log in
    #[validate(
        custom(function = "not_blank"),
        length(max = 64, message = "Username must be at most 64 characters")
    )]
    pub username: String,

    /// Password for the user account
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Form submitted to log in
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username of the account
    #[validate(custom(function = "not_blank"))]
    pub username: String,

    /// Password for the user account
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// User model representing the database schema
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,
    /// Name the user registered with
    pub username: String,
    /// Hashed password of the user
    pub password_hash: String,
    /// Timestamp when the user was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The acting identity derived from this account.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// The authenticated acting user of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Identifier of the user account
    pub id: Uuid,
    /// Display name captured when the token was issued
    pub username: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject of the token, the user ID
    pub sub: String,
    /// Username of the principal
    pub username: String,
    /// Expiration timestamp of the token
    pub exp: usize,
    /// Issued at timestamp of the token
    pub iat: usize,
}

/// Custom error type for authentication-related errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The username is already registered
    #[error("A user with the given username is already registered")]
    UsernameTaken,

    /// The provided credentials are invalid
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// An internal server error occurred
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An error occurred while hashing the password
    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// The token could not be issued or verified
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// An error occurred while validating input data
    #[error("{0}")]
    Validation(String),
}

impl AuthError {
    /// Message safe to show to the visitor.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::PasswordHash(_) | AuthError::Jwt(_) => {
                "Something went wrong, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Flattens validator errors into the first human readable message.
pub fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input".to_string())
}
