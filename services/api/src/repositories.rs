//! Persistence seams for users and media
//!
//! Handlers depend on the [`UserStore`] and [`MediaStore`] traits; the
//! PostgreSQL implementations live in the submodules.

use async_trait::async_trait;
use common::error::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Media, NewMedia, NewUser, Page, User};

pub mod media;
pub mod user;

pub use media::MediaRepository;
pub use user::UserRepository;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; a taken email yields [`StoreError::Conflict`]
    async fn create(&self, new_user: &NewUser) -> StoreResult<User>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn create(&self, new_media: &NewMedia) -> StoreResult<Media>;

    /// All media, newest first
    async fn list(&self, page: Page) -> StoreResult<Vec<Media>>;

    /// One user's media, newest first
    async fn list_by_user(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Media>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Media>>;

    /// Returns whether a row was removed
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}
