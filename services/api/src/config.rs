//! Server settings loaded from `APP_*` environment variables

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;

/// HTTP server, upload and security settings
///
/// Each field maps to an upper-cased `APP_` variable, e.g. `APP_PORT` or
/// `APP_UPLOAD_DIR`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding uploaded media files
    pub upload_dir: PathBuf,
    /// Built web client to serve for unmatched paths
    pub static_dir: Option<PathBuf>,
    /// Allowed CORS origin, `*` for any
    pub cors_origin: String,
    pub max_upload_bytes: usize,
    /// Argon2 memory cost in KiB
    pub password_memory_kib: u32,
    /// Argon2 iteration count
    pub password_iterations: u32,
    /// Argon2 lanes
    pub password_parallelism: u32,
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
    pub login_ban_seconds: u64,
}

impl ServerConfig {
    /// Load settings from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("upload_dir", "uploads")?
            .set_default("cors_origin", "*")?
            .set_default("max_upload_bytes", 10 * 1024 * 1024)?
            .set_default("password_memory_kib", 19 * 1024)?
            .set_default("password_iterations", 2)?
            .set_default("password_parallelism", 1)?
            .set_default("login_max_attempts", 5)?
            .set_default("login_window_seconds", 300)?
            .set_default("login_ban_seconds", 3600)?
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Address to bind the listener to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
