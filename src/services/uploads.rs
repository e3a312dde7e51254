//! Image upload rules and storage
//!
//! Files are checked for size, extension and actual content (magic bytes)
//! before anything touches the disk. Accepted files are written under
//! `{uploads.dir}/{avatars|books}/` with a random name and exposed at
//! `/uploads/...`. Placeholders under `/assets/` are never deleted.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use uuid::Uuid;

use crate::{
    config::UploadsConfig,
    error::{AppError, AppResult},
};

/// Extensions accepted from the client file name
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extensions of files written by this service
const STORED_EXTENSIONS: &[&str] = &["jpg", "png", "gif", "webp"];

/// Public URL prefix of stored uploads
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// A file received from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Where an upload belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Avatar,
    BookCover,
}

impl UploadKind {
    fn directory(&self) -> &'static str {
        match self {
            UploadKind::Avatar => "avatars",
            UploadKind::BookCover => "books",
        }
    }
}

#[derive(Clone)]
pub struct UploadService {
    config: UploadsConfig,
}

impl UploadService {
    pub fn new(config: UploadsConfig) -> Self {
        Self { config }
    }

    pub fn max_bytes(&self) -> usize {
        self.config.max_bytes
    }

    /// Upload ceiling for display, e.g. "2 MB"
    pub fn max_size_label(&self) -> String {
        human_size(self.config.max_bytes)
    }

    /// Check an upload; returns the canonical extension of the sniffed format
    pub fn validate(&self, file: &UploadedFile) -> AppResult<&'static str> {
        if file.bytes.is_empty() {
            return Err(AppError::Upload("Please choose an image to upload.".to_string()));
        }

        if file.bytes.len() > self.config.max_bytes {
            return Err(AppError::Upload(format!(
                "The image is too large (maximum {}).",
                human_size(self.config.max_bytes)
            )));
        }

        let extension = Path::new(&file.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::Upload(
                "Only JPG, PNG, GIF and WEBP images are accepted.".to_string(),
            ));
        }

        match image::guess_format(&file.bytes) {
            Ok(ImageFormat::Jpeg) => Ok("jpg"),
            Ok(ImageFormat::Png) => Ok("png"),
            Ok(ImageFormat::Gif) => Ok("gif"),
            Ok(ImageFormat::WebP) => Ok("webp"),
            _ => Err(AppError::Upload(
                "The file is not a valid JPG, PNG, GIF or WEBP image.".to_string(),
            )),
        }
    }

    /// Validate and write an upload; returns its public path
    pub async fn store(&self, kind: UploadKind, file: &UploadedFile) -> AppResult<String> {
        let extension = self.validate(file)?;

        let dir = self.config.dir.join(kind.directory());
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(dir.join(&name), &file.bytes).await?;

        tracing::info!(kind = kind.directory(), file = %name, size = file.bytes.len(), "Stored upload");

        Ok(format!("{}{}/{}", PUBLIC_PREFIX, kind.directory(), name))
    }

    /// Delete a previously stored upload; placeholders and foreign paths are left alone
    pub async fn remove(&self, public_path: Option<&str>) {
        let Some(path) = public_path.and_then(|p| self.local_path(p)) else {
            return;
        };

        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove old upload {:?}: {}", path, e);
            }
        }
    }

    /// Map a public path back to disk, only for names this service generates
    fn local_path(&self, public_path: &str) -> Option<PathBuf> {
        let relative = public_path.strip_prefix(PUBLIC_PREFIX)?;
        let (dir, name) = relative.split_once('/')?;

        if dir != UploadKind::Avatar.directory() && dir != UploadKind::BookCover.directory() {
            return None;
        }
        let (stem, extension) = name.rsplit_once('.')?;
        let valid_stem = !stem.is_empty() && stem.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
        if !valid_stem || !STORED_EXTENSIONS.contains(&extension) {
            return None;
        }

        Some(self.config.dir.join(dir).join(name))
    }
}

fn human_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MB", bytes / (1024 * 1024))
    } else {
        format!("{} KB", bytes / 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    fn service(dir: &Path, max_bytes: usize) -> UploadService {
        UploadService::new(UploadsConfig {
            dir: dir.to_path_buf(),
            max_bytes,
        })
    }

    fn file(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_validate_accepts_sniffed_images() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path(), 1024);
        assert_eq!(uploads.validate(&file("cover.PNG", PNG_MAGIC)).unwrap(), "png");
        assert_eq!(uploads.validate(&file("me.jpeg", JPEG_MAGIC)).unwrap(), "jpg");
    }

    #[test]
    fn test_validate_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path(), 16);

        assert!(matches!(uploads.validate(&file("a.png", b"")), Err(AppError::Upload(_))));
        assert!(matches!(
            uploads.validate(&file("a.png", &[0u8; 17])),
            Err(AppError::Upload(_))
        ));
        assert!(matches!(
            uploads.validate(&file("script.php", PNG_MAGIC)),
            Err(AppError::Upload(_))
        ));
        assert!(matches!(
            uploads.validate(&file("fake.png", b"<?php echo 1;")),
            Err(AppError::Upload(_))
        ));
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path(), 1024);

        let public = uploads
            .store(UploadKind::BookCover, &file("cover.png", PNG_MAGIC))
            .await
            .unwrap();
        assert!(public.starts_with("/uploads/books/"));
        assert!(public.ends_with(".png"));

        let on_disk = uploads.local_path(&public).unwrap();
        assert!(on_disk.exists());

        uploads.remove(Some(&public)).await;
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_rejected_upload_leaves_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path(), 32);

        let previous = uploads
            .store(UploadKind::Avatar, &file("me.png", PNG_MAGIC))
            .await
            .unwrap();

        let too_big = file("me.png", &[0u8; 64]);
        assert!(uploads.store(UploadKind::Avatar, &too_big).await.is_err());
        let wrong_ext = file("me.exe", PNG_MAGIC);
        assert!(uploads.store(UploadKind::Avatar, &wrong_ext).await.is_err());

        assert!(uploads.local_path(&previous).unwrap().exists());
        let stored = std::fs::read_dir(dir.path().join("avatars")).unwrap().count();
        assert_eq!(stored, 1);
    }

    #[test]
    fn test_placeholders_and_foreign_paths_are_not_removable() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = service(dir.path(), 1024);

        assert!(uploads.local_path("/assets/default-avatar.svg").is_none());
        assert!(uploads.local_path("/uploads/../config/default.toml").is_none());
        assert!(uploads.local_path("/uploads/books/../../etc/passwd").is_none());
        assert!(uploads.local_path("/uploads/other/abc.png").is_none());
        assert!(uploads
            .local_path("/uploads/avatars/0f8fad5b-d9cb-469f-a165-70867728950e.png")
            .is_some());
    }
}
