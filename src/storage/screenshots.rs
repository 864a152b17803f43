//! Screenshot blob storage.
//!
//! Metadata lives in the database; this module only moves bytes. The
//! trait keeps handlers testable without touching the filesystem.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// Errors from the screenshot store.
#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error("Screenshot blob not found: {0}")]
    #[diagnostic(code(docuflow::storage::not_found))]
    NotFound(String),

    #[error("Unsupported image type")]
    #[diagnostic(
        code(docuflow::storage::unsupported_type),
        help("Upload PNG, JPEG or WebP images")
    )]
    UnsupportedType,

    #[error("Invalid storage key: {0}")]
    #[diagnostic(code(docuflow::storage::invalid_key))]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(docuflow::storage::io))]
    Io(#[from] std::io::Error),
}

/// Image formats accepted for screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Webp,
}

impl ImageType {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageType::Png => "image/png",
            ImageType::Jpeg => "image/jpeg",
            ImageType::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageType::Png => "png",
            ImageType::Jpeg => "jpg",
            ImageType::Webp => "webp",
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/png" => Some(ImageType::Png),
            "image/jpeg" => Some(ImageType::Jpeg),
            "image/webp" => Some(ImageType::Webp),
            _ => None,
        }
    }
}

/// Sniff the image format from its magic number.
pub fn detect_image_type(bytes: &[u8]) -> Option<ImageType> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

    if bytes.starts_with(PNG) {
        Some(ImageType::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageType::Jpeg)
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageType::Webp)
    } else {
        None
    }
}

/// Trait for screenshot blob storage. Can be mocked in tests.
#[cfg_attr(test, automock)]
pub trait ScreenshotStore {
    /// Store the image bytes for a screenshot.
    fn put(&self, team_id: &str, id: &str, image: ImageType, bytes: &[u8]) -> Result<(), StoreError>;

    /// Read the image bytes back.
    fn get(&self, team_id: &str, id: &str, image: ImageType) -> Result<Vec<u8>, StoreError>;

    /// Remove the image. Missing blobs are not an error.
    fn delete(&self, team_id: &str, id: &str, image: ImageType) -> Result<(), StoreError>;
}

/// Filesystem store laid out as `<root>/<team_id>/<id>.<ext>`.
#[derive(Debug, Clone)]
pub struct FsScreenshotStore {
    root: PathBuf,
}

impl FsScreenshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, team_id: &str, id: &str, image: ImageType) -> Result<PathBuf, StoreError> {
        for key in [team_id, id] {
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(StoreError::InvalidKey(key.to_string()));
            }
        }
        Ok(self
            .root
            .join(team_id)
            .join(format!("{}.{}", id, image.extension())))
    }
}

impl ScreenshotStore for FsScreenshotStore {
    fn put(&self, team_id: &str, id: &str, image: ImageType, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.blob_path(team_id, id, image)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, bytes)?;
        Ok(())
    }

    fn get(&self, team_id: &str, id: &str, image: ImageType) -> Result<Vec<u8>, StoreError> {
        let path = self.blob_path(team_id, id, image)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(id.to_string()),
            _ => StoreError::Io(e),
        })
    }

    fn delete(&self, team_id: &str, id: &str, image: ImageType) -> Result<(), StoreError> {
        let path = self.blob_path(team_id, id, image)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
