// 🔐 Authentication - password verification, session tokens, login/logout
//
// Flow: POST /login → PasswordHasher::verify → SessionKeys::issue → `jwt` cookie
//       protected routes → require_session → SessionKeys::validate

pub mod password;
pub mod token;

#[cfg(feature = "server")]
pub mod handlers;
#[cfg(feature = "server")]
pub mod middleware;

pub use password::PasswordHasher;
pub use token::{SessionClaims, SessionKeys};

use thiserror::Error;

/// Name of the cookie that carries the session token
pub const SESSION_COOKIE: &str = "jwt";

/// The only message a client ever sees for a failed login
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session secret must be provided and non-empty")]
    MissingSecret,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid session token: {0}")]
    InvalidToken(String),

    #[error("session token expired")]
    Expired,

    #[error("could not sign session token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        match self {
            AuthError::InvalidCredentials | AuthError::InvalidToken(_) | AuthError::Expired => {
                (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS).into_response()
            }
            other => {
                tracing::error!(error = %other, "Authentication internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
