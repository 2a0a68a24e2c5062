//! Media repository for database operations

use async_trait::async_trait;
use common::error::DatabaseError;
use sqlx::PgPool;
use uuid::Uuid;

use super::{MediaStore, StoreResult};
use crate::models::{Media, NewMedia, Page};

/// PostgreSQL-backed [`MediaStore`]
#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    /// Create a new media repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for MediaRepository {
    async fn create(&self, new_media: &NewMedia) -> StoreResult<Media> {
        let media = sqlx::query_as::<_, Media>(
            r#"
            WITH inserted AS (
                INSERT INTO media (user_id, caption, content_type, size_bytes, storage_key)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, user_id, caption, content_type, size_bytes, storage_key, created_at
            )
            SELECT i.id, i.user_id, u.username, i.caption, i.content_type, i.size_bytes,
                   i.storage_key, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(new_media.user_id)
        .bind(&new_media.caption)
        .bind(&new_media.content_type)
        .bind(new_media.size_bytes)
        .bind(&new_media.storage_key)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(media)
    }

    async fn list(&self, page: Page) -> StoreResult<Vec<Media>> {
        let items = sqlx::query_as::<_, Media>(
            r#"
            SELECT m.id, m.user_id, u.username, m.caption, m.content_type, m.size_bytes,
                   m.storage_key, m.created_at
            FROM media m
            JOIN users u ON u.id = m.user_id
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(items)
    }

    async fn list_by_user(&self, user_id: Uuid, page: Page) -> StoreResult<Vec<Media>> {
        let items = sqlx::query_as::<_, Media>(
            r#"
            SELECT m.id, m.user_id, u.username, m.caption, m.content_type, m.size_bytes,
                   m.storage_key, m.created_at
            FROM media m
            JOIN users u ON u.id = m.user_id
            WHERE m.user_id = $1
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(items)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Media>> {
        let media = sqlx::query_as::<_, Media>(
            r#"
            SELECT m.id, m.user_id, u.username, m.caption, m.content_type, m.size_bytes,
                   m.storage_key, m.created_at
            FROM media m
            JOIN users u ON u.id = m.user_id
            WHERE m.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(media)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, UserRegistration};
    use crate::password::PasswordHasher;
    use crate::repositories::{UserRepository, UserStore};

    async fn seed_user(pool: &PgPool) -> Uuid {
        let hasher = PasswordHasher::new(1024, 1, 1).unwrap();
        let new_user = NewUser::new(
            UserRegistration {
                username: "poster".to_string(),
                email: "poster@example.com".to_string(),
                password: "123456789".to_string(),
            },
            &hasher,
        )
        .unwrap();
        UserRepository::new(pool.clone())
            .create(&new_user)
            .await
            .unwrap()
            .id
    }

    fn new_media(user_id: Uuid, caption: &str) -> NewMedia {
        NewMedia {
            user_id,
            caption: Some(caption.to_string()),
            content_type: "image/png".to_string(),
            size_bytes: 4,
            storage_key: Uuid::new_v4().to_string(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires PostgreSQL via DATABASE_URL"]
    async fn test_create_list_delete(pool: PgPool) {
        let user_id = seed_user(&pool).await;
        let repo = MediaRepository::new(pool);
        let page = Page {
            limit: 10,
            offset: 0,
        };

        let first = repo.create(&new_media(user_id, "first")).await.unwrap();
        let second = repo.create(&new_media(user_id, "second")).await.unwrap();
        assert_eq!(first.username, "poster");

        let items = repo.list(page).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, second.id);

        let mine = repo.list_by_user(user_id, page).await.unwrap();
        assert_eq!(mine.len(), 2);

        assert!(repo.delete(first.id).await.unwrap());
        assert!(!repo.delete(first.id).await.unwrap());
        assert!(repo.find_by_id(first.id).await.unwrap().is_none());
    }
}
