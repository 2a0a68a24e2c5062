use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{
    build_app,
    config::ServerConfig,
    jwt::{JwtConfig, JwtService},
    password::PasswordHasher,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{MediaRepository, UserRepository},
    session::SessionManager,
    state::AppState,
    storage::LocalStorage,
};
use common::{
    cache::{RedisCache, RedisConfig},
    database::{self, DatabaseConfig},
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let config = ServerConfig::from_env()?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool, &MIGRATOR).await?;

    let redis_config = RedisConfig::from_env()?;
    let cache = RedisCache::connect(&redis_config).await?;

    if !cache.health_check().await? {
        anyhow::bail!("Failed to connect to Redis");
    }

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;
    let password_hasher = PasswordHasher::new(
        config.password_memory_kib,
        config.password_iterations,
        config.password_parallelism,
    )?;
    let storage = LocalStorage::new(&config.upload_dir).await?;

    let app_state = AppState {
        users: Arc::new(UserRepository::new(pool.clone())),
        media: Arc::new(MediaRepository::new(pool)),
        storage: Arc::new(storage),
        sessions: SessionManager::new(Arc::new(cache), jwt_service),
        password_hasher,
        login_limiter: RateLimiter::new(RateLimiterConfig::from(&config)),
        config: Arc::new(config),
    };

    let address = app_state.config.bind_address();
    let app = build_app(app_state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down API service");
        })
        .await?;

    Ok(())
}
