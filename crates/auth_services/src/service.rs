use bcrypt::{DEFAULT_COST, hash, verify};
use sqlx::PgPool;

use crate::types::{AuthError, RegisterRequest, User};

/// A service for handling user authentication operations such as creating users,
/// retrieving user information and verifying credentials.
#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    /// Creates a new instance of `AuthService` with the provided database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a new user in the database from the registration form.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        let username = request.username.trim();

        if self.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash(&request.password, DEFAULT_COST)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::UsernameTaken,
            other => AuthError::Database(other),
        })?;

        log::info!("👤 Registered user {} ({})", user.username, user.id);

        Ok(user)
    }

    /// Retrieves a user by username, returning `None` if not found.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Verifies the user's password against the stored hash.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .get_user_by_username(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}
