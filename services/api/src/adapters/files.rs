//! services/api/src/adapters/files.rs
//!
//! Local-disk implementation of the `FileStore` port. Uploaded bytes land
//! under the configured root directory, one subdirectory per domain
//! (`records`, `vehicles`), and are served back under `/files`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use household_core::ports::{FileStore, PortError, PortResult};

pub const PUBLIC_PREFIX: &str = "/files";

#[derive(Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a public URL back to its on-disk location. Rejects anything
    /// that escapes the storage root.
    fn disk_path(&self, url: &str) -> PortResult<PathBuf> {
        let relative = url
            .strip_prefix(PUBLIC_PREFIX)
            .map(|rest| rest.trim_start_matches('/'))
            .ok_or_else(|| PortError::Validation(format!("not a stored file url: {url}")))?;
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(PortError::Validation(format!("invalid file url: {url}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, folder: &str, original_name: &str, bytes: &[u8]) -> PortResult<String> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        let file_name = format!("{}{}", Uuid::new_v4(), extension);

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(format!("{PUBLIC_PREFIX}/{folder}/{file_name}"))
    }

    async fn remove(&self, url: &str) -> PortResult<()> {
        let path = self.disk_path(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let url = store.save("records", "scan.PDF", b"report").await.unwrap();
        assert!(url.starts_with("/files/records/"));
        assert!(url.ends_with(".pdf"));

        let on_disk = dir
            .path()
            .join(url.strip_prefix("/files/").unwrap());
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"report");

        store.remove(&url).await.unwrap();
        assert!(!on_disk.exists());
        // Removing again is not an error.
        store.remove(&url).await.unwrap();
    }

    #[tokio::test]
    async fn remove_rejects_urls_outside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        assert!(store.remove("/files/../etc/passwd").await.is_err());
        assert!(store.remove("/elsewhere/a.txt").await.is_err());
    }
}
