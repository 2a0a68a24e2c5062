//! Media models for the API service

use chrono::{DateTime, Utc};
use common::validation::ValidationRejection;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Stored media item joined with its author's username
#[derive(Debug, Clone, FromRow)]
pub struct Media {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub caption: Option<String>,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

/// Media record to insert once its bytes are stored
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub user_id: Uuid,
    pub caption: Option<String>,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaAuthor {
    pub id: Uuid,
    pub username: String,
}

/// Media as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct MediaResponse {
    pub id: Uuid,
    pub caption: Option<String>,
    pub content_type: String,
    pub size: i64,
    /// Where the client loads the file from
    pub url: String,
    pub user: MediaAuthor,
    pub created_at: DateTime<Utc>,
}

impl From<&Media> for MediaResponse {
    fn from(media: &Media) -> Self {
        Self {
            id: media.id,
            caption: media.caption.clone(),
            content_type: media.content_type.clone(),
            size: media.size_bytes,
            url: format!("/media/{}/file", media.id),
            user: MediaAuthor {
                id: media.user_id,
                username: media.username.clone(),
            },
            created_at: media.created_at,
        }
    }
}

/// Query parameters for media listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Clamped pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl MediaQuery {
    pub fn page(&self) -> Page {
        Page {
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

/// File part of an upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Multipart upload, checked before anything is stored
#[derive(Debug, Clone, Default, Validate)]
pub struct MediaUpload {
    #[validate(length(max = 2200, message = "caption must be at most 2200 characters long"))]
    pub caption: Option<String>,
    pub file: Option<UploadedFile>,
}

impl MediaUpload {
    /// Set the caption, treating a blank one as absent
    pub fn set_caption(&mut self, caption: String) {
        let caption = caption.trim();
        self.caption = (!caption.is_empty()).then(|| caption.to_string());
    }

    /// Run the caption rules and the file checks, returning the file on success
    ///
    /// The stored content type comes from the file's signature, never from
    /// the type the client declared.
    pub fn check(self) -> Result<(Option<String>, UploadedFile), ValidationRejection> {
        let mut rejection = match self.validate() {
            Ok(()) => ValidationRejection::default(),
            Err(errors) => ValidationRejection::from(&errors),
        };

        let file = match self.file {
            None => Err("file is required"),
            Some(file) if file.bytes.is_empty() => Err("file must not be empty"),
            Some(file) => match sniff_image(&file.bytes) {
                Some(content_type) => Ok(UploadedFile {
                    content_type: content_type.to_string(),
                    bytes: file.bytes,
                }),
                None => Err("only image uploads are supported"),
            },
        };

        match file {
            Ok(file) if rejection.errors.is_empty() => Ok((self.caption, file)),
            Ok(_) => Err(rejection),
            Err(message) => {
                rejection
                    .errors
                    .insert("file".to_string(), message.to_string());
                Err(rejection)
            }
        }
    }
}

/// Content type of a PNG, JPEG, GIF or WebP file, judged by its leading bytes
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

    if bytes.starts_with(PNG) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}
