//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    config::ServerConfig,
    password::PasswordHasher,
    rate_limiter::RateLimiter,
    repositories::{MediaStore, UserStore},
    session::SessionManager,
    storage::BlobStorage,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub users: Arc<dyn UserStore>,
    pub media: Arc<dyn MediaStore>,
    pub storage: Arc<dyn BlobStorage>,
    pub sessions: SessionManager,
    pub password_hasher: PasswordHasher,
    pub login_limiter: RateLimiter,
}
