//! Access and refresh tokens, HS256 over a shared secret.

use chrono::{Duration, Utc};
use hintforge_core::chat::AccountId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// What a token is for. Refresh tokens only mint new pairs; they never
/// pass the bearer middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,

    /// Access or refresh
    pub kind: TokenKind,

    /// Issued at, unix seconds
    pub iat: i64,

    /// Expiry, unix seconds
    pub exp: i64,
}

impl Claims {
    /// The account this token belongs to.
    pub fn account_id(&self) -> AccountId {
        AccountId::from(&self.sub)
    }
}

/// A freshly minted token pair, shaped for the auth responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies HS256 tokens.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    /// Build a signer from a shared secret and per-kind TTLs.
    pub fn new(secret: &str, access_ttl_minutes: i64, refresh_ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(access_ttl_minutes),
            refresh_ttl: Duration::minutes(refresh_ttl_minutes),
        }
    }

    /// Mint an access/refresh pair for an account.
    pub fn issue_pair(&self, account: &AccountId) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue(account, TokenKind::Access, self.access_ttl)?,
            refresh_token: self.issue(account, TokenKind::Refresh, self.refresh_ttl)?,
        })
    }

    fn issue(
        &self,
        account: &AccountId,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.0.clone(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a token's signature and expiry, then check its kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if data.claims.kind != expected {
            return Err(AuthError::WrongTokenKind { expected });
        }
        Ok(data.claims)
    }
}
