//! Caller verification for privileged cache operations.
//!
//! The HTTP layer only consumes the decision; how a token is checked lives
//! behind [`AdminVerifier`].

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credentials")]
    Missing,
    #[error("invalid credentials")]
    Invalid,
    #[error("privileged access is not configured")]
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub subject: String,
}

#[async_trait]
pub trait AdminVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AdminPrincipal, AuthError>;
}

/// Verifies a single shared bearer token. Only its digest is kept in memory.
pub struct StaticTokenVerifier {
    hashed_token: Option<Vec<u8>>,
}

impl StaticTokenVerifier {
    const SUBJECT: &'static str = "admin";

    pub fn new(token: Option<&str>) -> Self {
        Self {
            hashed_token: token.map(Self::hash_token),
        }
    }

    fn hash_token(token: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hasher.finalize().to_vec()
    }
}

#[async_trait]
impl AdminVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AdminPrincipal, AuthError> {
        let expected = self.hashed_token.as_ref().ok_or(AuthError::Disabled)?;
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let presented = Self::hash_token(token);
        if expected.ct_eq(&presented).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }

        Ok(AdminPrincipal {
            subject: Self::SUBJECT.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_matching_token() {
        let verifier = StaticTokenVerifier::new(Some("s3cret-token"));
        let principal = verifier.verify("s3cret-token").await.expect("valid token");
        assert_eq!(principal.subject, "admin");
    }

    #[tokio::test]
    async fn rejects_wrong_token() {
        let verifier = StaticTokenVerifier::new(Some("s3cret-token"));
        assert_eq!(verifier.verify("guess").await, Err(AuthError::Invalid));
        assert_eq!(verifier.verify("").await, Err(AuthError::Missing));
    }

    #[tokio::test]
    async fn rejects_everyone_without_configured_token() {
        let verifier = StaticTokenVerifier::new(None);
        assert_eq!(verifier.verify("anything").await, Err(AuthError::Disabled));
    }
}
