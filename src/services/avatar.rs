// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Avatar replacement: one stored image per user.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{Database, DbError};
use crate::services::profile_store::ProfileStore;

pub const AVATAR_BUCKET: &str = "avatars";

static UNSAFE_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("key allow-list pattern is valid"));
static DATA_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^data:(.+);base64,(.+)$").expect("data url pattern is valid"));
static EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[0-9a-zA-Z]+$").expect("extension pattern is valid"));

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvatarError {
    #[error("image data is not a base64 data URL")]
    InvalidDataUrl,

    #[error("storage upload failed: {0}")]
    Upload(DbError),
}

/// Decoded image ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarImage {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl AvatarImage {
    /// Decode a legacy `data:<mime>;base64,<payload>` upload.
    pub fn from_data_url(data_url: &str, filename: Option<String>) -> Result<Self, AvatarError> {
        let caps = DATA_URL
            .captures(data_url.trim())
            .ok_or(AvatarError::InvalidDataUrl)?;
        let bytes = STANDARD
            .decode(caps[2].trim())
            .map_err(|_| AvatarError::InvalidDataUrl)?;
        Ok(Self {
            bytes,
            filename,
            content_type: Some(caps[1].to_string()),
        })
    }
}

/// Replace every character outside `[a-zA-Z0-9._-]` with `_`.
pub fn sanitize_segment(segment: &str) -> String {
    UNSAFE_KEY_CHARS.replace_all(segment, "_").into_owned()
}

/// `<user>/<stem>-<millis><ext>`, every segment sanitised.
pub fn object_key(user_id: &str, filename: &str, millis: i64) -> String {
    let ext = EXTENSION
        .find(filename)
        .map(|m| m.as_str())
        .unwrap_or_default();
    let stem = EXTENSION.replace(filename, "");
    format!(
        "{}/{}-{}{}",
        sanitize_segment(user_id),
        sanitize_segment(&stem),
        millis,
        ext
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarOutcome {
    pub path: String,
    pub public_url: String,
    /// Set when the upload landed but `profiles.avatar_url` was not updated
    pub profile_update_error: Option<DbError>,
}

/// Store `image` as the user's only avatar and point the profile at it.
///
/// Clearing the old objects is best effort; only the upload itself can fail
/// the operation.
pub async fn replace_avatar(
    db: &Database,
    user_id: &str,
    image: AvatarImage,
    now_millis: i64,
) -> Result<AvatarOutcome, AvatarError> {
    let filename = image
        .filename
        .clone()
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| format!("avatar-{}", now_millis));
    let user_dir = sanitize_segment(user_id);
    let path = object_key(user_id, &filename, now_millis);
    debug!("Avatar upload path: {}", path);

    match db.storage.list(AVATAR_BUCKET, &user_dir).await {
        Ok(existing) if !existing.is_empty() => {
            let stale: Vec<String> = existing
                .iter()
                .map(|object| format!("{}/{}", user_dir, object.name))
                .collect();
            match db.storage.remove(AVATAR_BUCKET, &stale).await {
                Ok(()) => debug!("Removed previous avatar objects: {:?}", stale),
                Err(e) => warn!("Failed to remove existing avatar files (continuing): {}", e),
            }
        }
        Ok(_) => {}
        Err(e) => warn!("Failed to list existing avatar files (continuing): {}", e),
    }

    db.storage
        .upload(
            AVATAR_BUCKET,
            &path,
            image.bytes,
            image.content_type.as_deref(),
            true,
        )
        .await
        .map_err(AvatarError::Upload)?;

    let public_url = db.storage.public_url(AVATAR_BUCKET, &path);
    let profile_update_error = match ProfileStore::new(db.tables.clone())
        .set_avatar_url(user_id, &public_url)
        .await
    {
        Ok(()) => None,
        Err(e) => {
            warn!("Avatar stored but profiles.avatar_url was not updated: {}", e);
            Some(e)
        }
    };

    info!("Stored avatar for {} at {}", user_id, path);
    Ok(AvatarOutcome {
        path,
        public_url,
        profile_update_error,
    })
}
