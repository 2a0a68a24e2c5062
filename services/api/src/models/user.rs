//! User model, credential schemas and response payloads

use chrono::{DateTime, Utc};
use common::validation::BodySchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::error;
use uuid::Uuid;
use validator::Validate;

use crate::password::{self, PasswordError, PasswordHasher};

/// Stored user
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Compare a plaintext password against the stored hash
    pub fn validate_password(&self, password: &str) -> bool {
        match password::verify(password, &self.password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                error!("Cannot verify password for user {}: {}", self.id, e);
                false
            }
        }
    }
}

/// A user ready to be persisted
///
/// The only constructor hashes the plaintext password, so a `NewUser` never
/// carries a raw password and a stored hash is never hashed twice.
#[derive(Debug, Clone)]
pub struct NewUser {
    username: String,
    email: String,
    password_hash: String,
}

impl NewUser {
    pub fn new(
        registration: UserRegistration,
        hasher: &PasswordHasher,
    ) -> Result<Self, PasswordError> {
        let password_hash = hasher.hash(&registration.password)?;
        Ok(Self {
            username: registration.username,
            email: registration.email,
            password_hash,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

/// Public view of a user; never includes the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login body
#[derive(Debug, Deserialize, Validate)]
pub struct UserCredentialsSchema {
    #[validate(
        required(message = "email is required"),
        email(message = "invalid email address")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "password is required"),
        length(min = 8, message = "password must be at least 8 characters long")
    )]
    pub password: Option<String>,
}

/// Validated login credentials
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

impl BodySchema for UserCredentialsSchema {
    type Output = UserCredentials;

    fn into_output(self) -> UserCredentials {
        UserCredentials {
            email: normalize_email(self.email.unwrap_or_default()),
            password: self.password.unwrap_or_default(),
        }
    }
}

/// Registration body: the credentials plus a username
#[derive(Debug, Deserialize, Validate)]
pub struct UserRegistrationSchema {
    #[validate(
        required(message = "username is required"),
        length(min = 3, message = "username must be at least 3 characters long")
    )]
    pub username: Option<String>,
    #[validate(
        required(message = "email is required"),
        email(message = "invalid email address")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "password is required"),
        length(min = 8, message = "password must be at least 8 characters long")
    )]
    pub password: Option<String>,
}

/// Validated registration data
#[derive(Debug, Clone)]
pub struct UserRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl BodySchema for UserRegistrationSchema {
    type Output = UserRegistration;

    fn into_output(self) -> UserRegistration {
        UserRegistration {
            username: self.username.unwrap_or_default(),
            email: normalize_email(self.email.unwrap_or_default()),
            password: self.password.unwrap_or_default(),
        }
    }
}

/// Refresh and logout body
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenSchema {
    #[serde(alias = "refreshToken")]
    #[validate(required(message = "refresh token is required"))]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

impl BodySchema for RefreshTokenSchema {
    type Output = RefreshTokenRequest;

    fn into_output(self) -> RefreshTokenRequest {
        RefreshTokenRequest {
            refresh_token: self.refresh_token.unwrap_or_default(),
        }
    }
}

fn normalize_email(email: String) -> String {
    email.trim().to_lowercase()
}
