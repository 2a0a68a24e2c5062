//! Media upload, listing and retrieval endpoints

use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use common::validation::ValidationRejection;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{MediaQuery, MediaResponse, MediaUpload, NewMedia, UploadedFile},
    state::AppState,
};

/// List everyone's media, newest first
pub async fn list_media(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<MediaQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let items = state.media.list(query.page()).await?;
    Ok(Json(items.iter().map(MediaResponse::from).collect::<Vec<_>>()))
}

/// List the caller's media, newest first
pub async fn list_my_media(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<MediaQuery>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let items = state.media.list_by_user(user.id, query.page()).await?;
    Ok(Json(items.iter().map(MediaResponse::from).collect::<Vec<_>>()))
}

/// Get a media item by ID
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let media = state
        .media
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Media"))?;

    Ok(Json(MediaResponse::from(&media)))
}

/// Serve the stored file of a media item
pub async fn get_media_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let media = state
        .media
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Media"))?;

    let bytes = state.storage.get(&media.storage_key).await?.ok_or_else(|| {
        warn!("Media {} has no stored file under {}", media.id, media.storage_key);
        ApiError::NotFound("Media")
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, media.content_type),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
            (header::CONTENT_DISPOSITION, "inline".to_string()),
            (header::CACHE_CONTROL, "private, max-age=86400".to_string()),
        ],
        bytes,
    ))
}

/// Upload an image with an optional caption
///
/// Expects `multipart/form-data` with a `file` part and an optional
/// `caption` part. Only PNG, JPEG, GIF and WebP files are kept.
pub async fn upload_media(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut upload = MediaUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload.file = Some(UploadedFile {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("caption") => {
                let caption = field.text().await.map_err(multipart_error)?;
                upload.set_caption(caption);
            }
            _ => {}
        }
    }

    let (caption, file) = upload.check()?;

    let storage_key = Uuid::new_v4().to_string();
    state.storage.put(&storage_key, &file.bytes).await?;

    let new_media = NewMedia {
        user_id: user.id,
        caption,
        content_type: file.content_type,
        size_bytes: file.bytes.len() as i64,
        storage_key,
    };

    let media = match state.media.create(&new_media).await {
        Ok(media) => media,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&new_media.storage_key).await {
                error!(
                    "Failed to remove orphaned upload {}: {}",
                    new_media.storage_key, cleanup
                );
            }
            return Err(e.into());
        }
    };

    info!("User {} uploaded media {}", user.id, media.id);
    Ok((StatusCode::CREATED, Json(MediaResponse::from(&media))))
}

/// Delete one of the caller's media items
pub async fn delete_media(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let media = state
        .media
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Media"))?;

    if media.user_id != user.id {
        warn!("User {} tried to delete media {} owned by {}", user.id, id, media.user_id);
        return Err(ApiError::Forbidden);
    }

    if !state.media.delete(id).await? {
        return Err(ApiError::NotFound("Media"));
    }

    if let Err(e) = state.storage.delete(&media.storage_key).await {
        error!("Failed to remove file for deleted media {}: {}", id, e);
    }

    info!("User {} deleted media {}", user.id, id);
    Ok(StatusCode::NO_CONTENT)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ValidationRejection::single("file", e.body_text()).into()
    }
}
