//! Credentials for HintForge — bcrypt password hashes and HS256 tokens.
//!
//! Registration stores a bcrypt hash, never the password. Logins trade a
//! verified password for an access/refresh token pair; the gateway's
//! middleware resolves bearer access tokens back to an account id.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKind, TokenPair, TokenSigner};

/// Errors from hashing and token handling.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// bcrypt rejected the input or the stored hash
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Signing a fresh token failed
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// Bad signature, malformed token, or past expiry
    #[error("Token rejected: {0}")]
    InvalidToken(String),

    /// Structurally valid token of the wrong kind
    #[error("Expected {expected} token")]
    WrongTokenKind { expected: token::TokenKind },
}
