//! HTTP routes

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::services::{ServeDir, ServeFile};

use crate::{middleware::auth_middleware, state::AppState};

pub mod auth;
pub mod media;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/me/media", get(media::list_my_media))
        .route(
            "/media",
            get(media::list_media).post(media::upload_media).layer(
                DefaultBodyLimit::max(state.config.max_upload_bytes),
            ),
        )
        .route(
            "/media/:id",
            get(media::get_media).delete(media::delete_media),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/media/:id/file", get(media::get_media_file))
        .merge(protected_routes);

    let router = match &state.config.static_dir {
        Some(dir) => {
            let index = dir.join("index.html");
            router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => router,
    };

    router.with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}
