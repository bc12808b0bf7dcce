use std::path::PathBuf;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use sha1::{Digest, Sha1};
use tokio::fs;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

pub const AVATAR_MAX_SIZE: usize = 1024 * 1024;

/// Extensions accepted for avatar uploads.
pub const AVATAR_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

/// Content id of an image: hex SHA-1 of the bytes plus the uploaded extension.
pub fn content_name(data: &[u8], ext: &str) -> String {
    format!("{}{}", hex::encode(Sha1::digest(data)), ext)
}

/// Extension of `file_name` including the dot, or "" when there is none.
pub fn extension(file_name: &str) -> &str {
    file_name.rfind('.').map_or("", |i| &file_name[i..])
}

pub fn mime_for(file_name: &str) -> Option<&'static str> {
    match extension(file_name) {
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".png" => Some("image/png"),
        ".gif" => Some("image/gif"),
        _ => None,
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// On-disk copy of image blobs, keyed by content name.
///
/// The database holds every image; this directory is a read-through cache
/// in front of it and can be deleted at any time.
pub struct IconStore {
    dir: PathBuf,
}

impl IconStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Icon cache directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn is_cached(&self, name: &str) -> bool {
        fs::try_exists(self.file_path(name)).await.unwrap_or(false)
    }

    /// Write through a temp file and rename, so readers never see a partial
    /// image.
    pub async fn write_cached(&self, name: &str, data: &[u8]) -> Result<()> {
        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, data).await?;
        if let Err(e) = fs::rename(&tmp, self.file_path(name)).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn read_cached(&self, name: &str) -> Option<Vec<u8>> {
        fs::read(self.file_path(name)).await.ok()
    }
}

/// Store an image and return its content name. Storing the same bytes again
/// yields the same name and leaves a single blob.
pub async fn put_image(state: &AppState, data: Vec<u8>, ext: &str) -> Result<String, ApiError> {
    let name = content_name(&data, ext);

    let key = name.clone();
    let blob = data.clone();
    run_blocking(&state.db, move |db| db.insert_image(&key, &blob)).await?;

    if let Err(e) = state.icons.write_cached(&name, &data).await {
        warn!("Icon {} stored but not cached on disk: {}", name, e);
    }
    Ok(name)
}

/// Fetch an image by content name, repopulating the disk cache on a miss.
pub async fn get_image(state: &AppState, name: &str) -> Result<Vec<u8>, ApiError> {
    if !is_safe_name(name) {
        return Err(ApiError::NotFound(name.to_string()));
    }
    if let Some(data) = state.icons.read_cached(name).await {
        return Ok(data);
    }

    let key = name.to_string();
    let data = run_blocking(&state.db, move |db| db.get_image(&key))
        .await?
        .ok_or_else(|| ApiError::NotFound(name.to_string()))?;

    if let Err(e) = state.icons.write_cached(name, &data).await {
        warn!("Failed to cache icon {}: {}", name, e);
    }
    Ok(data)
}

/// GET /icons/{file_name}
pub async fn get_icon(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let mime = mime_for(&file_name).ok_or_else(|| ApiError::NotFound(file_name.clone()))?;

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|tag| tag == file_name);
    if not_modified && is_safe_name(&file_name) && state.icons.is_cached(&file_name).await {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::CONTENT_TYPE, mime.to_string()), (header::ETAG, file_name)],
        )
            .into_response());
    }

    let data = get_image(&state, &file_name).await?;
    Ok((
        [(header::CONTENT_TYPE, mime.to_string()), (header::ETAG, file_name)],
        data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_name_is_sha1_plus_extension() {
        assert_eq!(
            content_name(b"abc", ".png"),
            "a9993e364706816aba3e25717850c26c9cd0d89d.png"
        );
    }

    #[test]
    fn extension_and_mime() {
        assert_eq!(extension("me.jpeg"), ".jpeg");
        assert_eq!(extension("noext"), "");
        assert_eq!(mime_for("x.gif"), Some("image/gif"));
        assert_eq!(mime_for("x.svg"), None);
    }

    #[test]
    fn unsafe_names_rejected() {
        assert!(is_safe_name("abc.png"));
        assert!(!is_safe_name("..png"));
        assert!(!is_safe_name("a/b.png"));
        assert!(!is_safe_name(""));
    }
}
