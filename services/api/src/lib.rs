//! Media-sharing API service
//!
//! Registration and login, JWT sessions backed by Redis, and image uploads
//! stored on disk with their metadata in PostgreSQL.

pub mod config;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;

use axum::{Router, http::HeaderValue};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::state::AppState;

/// The full application: routes plus tracing and CORS layers
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origin == "*" {
        return layer.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Ignoring invalid CORS origin {:?}, allowing any", origin);
            layer.allow_origin(Any)
        }
    }
}
