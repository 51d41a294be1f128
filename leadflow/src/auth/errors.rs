//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Credentials did not match an account
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Account not found
    #[error("Account not found")]
    AccountNotFound,

    /// Email already registered
    #[error("User already exists with this email")]
    DuplicateEmail,

    /// The singleton admin has already been bootstrapped
    #[error("Admin already registered")]
    AdminExists,

    /// A required registration field was missing or empty
    #[error("All fields are required")]
    MissingFields,

    /// Password too short
    #[error("Password must be at least {0} characters long")]
    WeakPassword(usize),

    /// Bearer token missing, malformed, expired, or badly signed
    #[error("Invalid token")]
    InvalidToken,

    /// JWT encoding error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and JWT errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) => "Internal server error".to_string(),
            AuthError::Jwt(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
