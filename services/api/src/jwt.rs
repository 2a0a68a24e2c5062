//! RS256 access and refresh tokens
//!
//! Every token carries a random `jti`, so two tokens issued for the same user
//! in the same second are still distinct. Tokens from another issuer are
//! rejected even when the signature checks out.

use anyhow::{Context, Result, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const ISSUER: &str = "media-share";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// PEM-encoded RSA signing key
    pub private_key: String,
    /// PEM-encoded RSA verification key
    pub public_key: String,
    /// Seconds
    pub access_token_expiry: u64,
    /// Seconds
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Keys come from `JWT_PRIVATE_KEY` and `JWT_PUBLIC_KEY`, each holding
    /// either the PEM text or a path to it. Lifetimes default to 15 minutes
    /// and 7 days and can be set with `JWT_ACCESS_TOKEN_EXPIRY` and
    /// `JWT_REFRESH_TOKEN_EXPIRY`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            private_key: pem_from_env("JWT_PRIVATE_KEY")?,
            public_key: pem_from_env("JWT_PUBLIC_KEY")?,
            access_token_expiry: seconds_from_env("JWT_ACCESS_TOKEN_EXPIRY", 15 * 60)?,
            refresh_token_expiry: seconds_from_env("JWT_REFRESH_TOKEN_EXPIRY", 7 * 24 * 60 * 60)?,
        })
    }
}

fn pem_from_env(var: &str) -> Result<String> {
    let value = std::env::var(var).with_context(|| format!("{} is not set", var))?;
    if value.trim_start().starts_with("-----BEGIN") {
        return Ok(value);
    }

    std::fs::read_to_string(&value).with_context(|| format!("cannot read {} from {}", var, value))
}

fn seconds_from_env(var: &str, default: u64) -> Result<u64> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number of seconds", var)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Signs and verifies tokens with one RSA key pair
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: u64,
    refresh_token_expiry: u64,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .context("invalid JWT private key")?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())
            .context("invalid JWT public key")?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
        })
    }

    pub fn generate_access_token(&self, user_id: Uuid) -> Result<String> {
        self.sign(user_id, TokenType::Access, self.access_token_expiry)
    }

    pub fn generate_refresh_token(&self, user_id: Uuid) -> Result<String> {
        self.sign(user_id, TokenType::Refresh, self.refresh_token_expiry)
    }

    fn sign(&self, user_id: Uuid, token_type: TokenType, lifetime: u64) -> Result<String> {
        let issued_at = now_secs()?;
        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iss: ISSUER.to_string(),
            iat: issued_at,
            exp: issued_at + lifetime,
            token_type,
        };

        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?)
    }

    /// Check signature, issuer and expiry, returning the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }

    pub fn access_token_expiry(&self) -> u64 {
        self.access_token_expiry
    }

    pub fn refresh_token_expiry(&self) -> u64 {
        self.refresh_token_expiry
    }
}

/// Seconds since the Unix epoch
pub fn now_secs() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|e| anyhow!("system clock is before the Unix epoch: {}", e))
}
