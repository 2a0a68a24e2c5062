//! Shared helpers for the HTTP integration tests
//!
//! The router is the production one from `api::build_app`; only the stores
//! and the cache are swapped for in-memory versions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use api::{
    build_app,
    config::ServerConfig,
    jwt::{JwtConfig, JwtService},
    models::{Media, NewMedia, NewUser, Page, User},
    password::PasswordHasher,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{MediaStore, StoreError, StoreResult, UserStore},
    session::SessionManager,
    state::AppState,
    storage::LocalStorage,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::Utc;
use common::cache::Cache;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    fn username_of(&self, id: Uuid) -> String {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    pub fn stored(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: &NewUser) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new_user.email()) {
            return Err(StoreError::Conflict(new_user.email().to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username().to_string(),
            email: new_user.email().to_string(),
            password_hash: new_user.password_hash().to_string(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.stored(email))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }
}

pub struct MemoryMediaStore {
    users: Arc<MemoryUserStore>,
    /// Insertion order; newest last
    items: Mutex<Vec<Media>>,
}

impl MemoryMediaStore {
    fn newest_first<'a>(items: impl DoubleEndedIterator<Item = &'a Media>, page: Page) -> Vec<Media> {
        items
            .rev()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn create(&self, new_media: &NewMedia) -> StoreResult<Media> {
        let media = Media {
            id: Uuid::new_v4(),
            user_id: new_media.user_id,
            username: self.users.username_of(new_media.user_id),
            caption: new_media.caption.clone(),
            content_type: new_media.content_type.clone(),
            size_bytes: new_media.size_bytes,
            storage_key: new_media.storage_key.clone(),
            created_at: Utc::now(),
        };
        self.items.lock().unwrap().push(media.clone());
        Ok(media)
    }

    async fn list(&self, page: Page) -> StoreResult<Vec<Media>> {
        let items = self.items.lock().unwrap();
        Ok(Self::newest_first(items.iter(), page))
    }

    async fn list_by_user(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Media>> {
        let items = self.items.lock().unwrap();
        let mine: Vec<&Media> = items.iter().filter(|m| m.user_id == user_id).collect();
        Ok(Self::newest_first(mine.into_iter(), page))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Media>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|m| m.id != id);
        Ok(items.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, key: &str, value: &str, _ttl_seconds: Option<u64>) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A router wired to in-memory stores, plus handles to inspect them
pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUserStore>,
    pub upload_dir: PathBuf,
    _dir: TempDir,
}

pub fn test_config(upload_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        upload_dir,
        static_dir: None,
        cors_origin: "*".to_string(),
        max_upload_bytes: 64 * 1024,
        password_memory_kib: 1024,
        password_iterations: 1,
        password_parallelism: 1,
        login_max_attempts: 3,
        login_window_seconds: 300,
        login_ban_seconds: 3600,
    }
}

pub async fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let upload_dir = dir.path().join("uploads");
    let config = test_config(upload_dir.clone());

    let users = Arc::new(MemoryUserStore::default());
    let media = Arc::new(MemoryMediaStore {
        users: users.clone(),
        items: Mutex::new(Vec::new()),
    });

    let jwt_service = JwtService::new(JwtConfig {
        private_key: include_str!("../fixtures/jwt_private.pem").to_string(),
        public_key: include_str!("../fixtures/jwt_public.pem").to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
    })
    .unwrap();

    let state = AppState {
        users: users.clone(),
        media,
        storage: Arc::new(LocalStorage::new(&upload_dir).await.unwrap()),
        sessions: SessionManager::new(Arc::new(MemoryCache::default()), jwt_service),
        password_hasher: PasswordHasher::new(
            config.password_memory_kib,
            config.password_iterations,
            config.password_parallelism,
        )
        .unwrap(),
        login_limiter: RateLimiter::new(RateLimiterConfig::from(&config)),
        config: Arc::new(config),
    };

    TestApp {
        router: build_app(state),
        users,
        upload_dir,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response<Body> {
        let request = Request::delete(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json_auth(&self, uri: &str, token: &str, body: Value) -> Response<Body> {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// POST a multipart form; `parts` are (name, content type, bytes)
    pub async fn post_multipart(
        &self,
        uri: &str,
        token: &str,
        parts: &[(&str, Option<&str>, &[u8])],
    ) -> Response<Body> {
        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    /// Register and log in, returning the access token
    pub async fn signup(&self, username: &str, email: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "email": email,
            "password": "123456789",
        });
        let response = self.post_json("/register", body).await;
        assert_eq!(response.status(), 201);

        let response = self
            .post_json(
                "/login",
                serde_json::json!({ "email": email, "password": "123456789" }),
            )
            .await;
        assert_eq!(response.status(), 200);
        body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match content_type {
            Some(content_type) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\nContent-Type: {}\r\n\r\n",
                        name, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
