//! Session management and token revocation on top of the cache
//!
//! The current refresh token of each user lives under `session:{user_id}`,
//! and only that token can be exchanged. Signing in again replaces it, so an
//! older refresh token stops working. Rotated or logged-out tokens are kept under `blacklisted_token:{token}`
//! until they would have expired anyway.

use common::cache::Cache;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::jwt::{Claims, JwtService, TokenType, now_secs};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Session backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Freshly issued access and refresh tokens
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Session manager for issuing, rotating and revoking tokens
#[derive(Clone)]
pub struct SessionManager {
    cache: Arc<dyn Cache>,
    jwt_service: JwtService,
}

impl SessionManager {
    pub fn new(cache: Arc<dyn Cache>, jwt_service: JwtService) -> Self {
        Self { cache, jwt_service }
    }

    /// Issue a token pair and record it as the user's session
    pub async fn issue(&self, user_id: Uuid) -> Result<TokenPair, SessionError> {
        let access_token = self.jwt_service.generate_access_token(user_id)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user_id)?;

        self.cache
            .set(
                &session_key(user_id),
                &refresh_token,
                Some(self.jwt_service.refresh_token_expiry()),
            )
            .await?;

        info!("Issued session for user {}", user_id);

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.jwt_service.access_token_expiry(),
        })
    }

    /// Exchange a refresh token for a new pair, revoking the old one
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let claims = self.verify(refresh_token, TokenType::Refresh).await?;

        let current = self.cache.get(&session_key(claims.sub)).await?;
        if current.as_deref() != Some(refresh_token) {
            warn!("Refresh token for user {} is not the current session", claims.sub);
            return Err(SessionError::Revoked);
        }

        self.blacklist(refresh_token, &claims).await?;
        self.issue(claims.sub).await
    }

    /// End a session: revoke the refresh token, and the access token when given
    pub async fn revoke(
        &self,
        refresh_token: &str,
        access_token: Option<&str>,
    ) -> Result<(), SessionError> {
        let claims = self.verify(refresh_token, TokenType::Refresh).await?;
        self.blacklist(refresh_token, &claims).await?;

        if let Some(access_token) = access_token {
            match self.jwt_service.validate_token(access_token) {
                Ok(access_claims) if access_claims.sub == claims.sub => {
                    self.blacklist(access_token, &access_claims).await?;
                }
                _ => warn!("Ignoring unusable access token on logout"),
            }
        }

        self.cache.delete(&session_key(claims.sub)).await?;
        info!("Revoked session for user {}", claims.sub);
        Ok(())
    }

    /// Resolve an access token to its user
    pub async fn authenticate(&self, access_token: &str) -> Result<Uuid, SessionError> {
        let claims = self.verify(access_token, TokenType::Access).await?;
        Ok(claims.sub)
    }

    async fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, SessionError> {
        let claims = self
            .jwt_service
            .validate_token(token)
            .map_err(|_| SessionError::InvalidToken)?;

        if claims.token_type != expected {
            return Err(SessionError::InvalidToken);
        }

        if self.cache.get(&blacklist_key(token)).await?.is_some() {
            return Err(SessionError::Revoked);
        }

        Ok(claims)
    }

    async fn blacklist(&self, token: &str, claims: &Claims) -> Result<(), SessionError> {
        let remaining = claims.exp.saturating_sub(now_secs()?);
        self.cache
            .set(&blacklist_key(token), "1", Some(remaining.max(1)))
            .await?;
        Ok(())
    }
}

fn session_key(user_id: Uuid) -> String {
    format!("session:{}", user_id)
}

fn blacklist_key(token: &str) -> String {
    format!("blacklisted_token:{}", token)
}
