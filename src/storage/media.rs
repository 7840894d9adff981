//! Media storage on local disk
//!
//! Uploaded images and videos are written into the uploads directory and
//! referenced from posts as `/uploads/<file>`, which the router serves
//! statically.

use std::path::{Path, PathBuf};

use crate::data::{MediaType, new_id};
use crate::error::AppError;
use crate::metrics::{MEDIA_BYTES_UPLOADED, MEDIA_UPLOADS_TOTAL};

/// URL prefix under which stored files are served
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

fn media_file_extension_from_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/quicktime" => Some("mov"),
        _ => None,
    }
}

/// Extension of the client's file name, if it is short and alphanumeric
fn extension_from_file_name(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// An uploaded file
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

/// Where a stored file can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub url: String,
    pub media_type: MediaType,
}

/// Media storage service
pub struct MediaStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl MediaStorage {
    /// Create media storage rooted at `root`, creating the directory
    pub async fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Result<Self, AppError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root, max_bytes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store an upload
    ///
    /// Only image/* and video/* content types are accepted. The file is
    /// named `<ulid>.<ext>`.
    pub async fn store(&self, upload: MediaUpload) -> Result<StoredMedia, AppError> {
        let content_type = upload.content_type.trim().to_ascii_lowercase();
        let media_type = MediaType::from_content_type(&content_type).ok_or_else(|| {
            AppError::Validation("Only image and video files are allowed!".to_string())
        })?;

        if upload.data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if upload.data.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large: exceeds {} bytes",
                self.max_bytes
            )));
        }

        let extension = media_file_extension_from_content_type(&content_type)
            .map(str::to_string)
            .or_else(|| upload.file_name.as_deref().and_then(extension_from_file_name))
            .unwrap_or_else(|| "bin".to_string());
        let file_name = format!("{}.{}", new_id(), extension);
        let size = upload.data.len();

        tokio::fs::write(self.root.join(&file_name), upload.data).await?;

        MEDIA_UPLOADS_TOTAL.inc();
        MEDIA_BYTES_UPLOADED.inc_by(size as f64);
        tracing::info!(file = %file_name, size, media_type = media_type.as_str(), "Media stored");

        Ok(StoredMedia {
            url: format!("{}/{}", UPLOADS_URL_PREFIX, file_name),
            media_type,
        })
    }

    /// Delete the file behind a `/uploads/<file>` URL
    ///
    /// Returns `false` if the URL does not point into this storage or
    /// the file is already gone.
    pub async fn delete(&self, url: &str) -> Result<bool, AppError> {
        let Some(path) = self.resolve(url) else {
            tracing::debug!(%url, "Not a stored media URL; nothing to delete");
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Media deleted");
                Ok(true)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    /// Map a public URL to a file inside the root
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(UPLOADS_URL_PREFIX)?.strip_prefix('/')?;
        if name.is_empty() || name.starts_with('.') || name.contains(|c: char| c == '/' || c == '\\') {
            return None;
        }
        Some(self.root.join(name))
    }
}
