//! Storage abstractions for the catalog.
//!
//! Every read and write of `slot_providers.json` goes through
//! [`CatalogStore`]. Writes are atomic: content lands in a sibling `.tmp`
//! file that is renamed over the target, so an interrupted run leaves the
//! last successfully saved catalog in place.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Scraper configuration
//! ├── slot_providers.json   # Catalog: image filename -> provider
//! └── public/images/        # One image per catalog key
//! ```

pub mod local;
pub mod merge;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::Catalog;

// Re-export for convenience
pub use local::LocalCatalog;
pub use merge::{merge, merge_into};

/// Trait for catalog storage backends.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Read the catalog. Missing or malformed data is `CatalogUnavailable`.
    async fn load(&self) -> Result<Catalog>;

    /// Persist the catalog deterministically and atomically.
    async fn save(&self, catalog: &Catalog) -> Result<()>;

    /// Whether a catalog has ever been saved.
    async fn exists(&self) -> bool;

    /// Human-readable location for log lines.
    fn location(&self) -> String;

    /// Bootstrap variant of [`CatalogStore::load`]: a missing catalog is
    /// empty, a malformed one is still an error.
    async fn load_or_empty(&self) -> Result<Catalog> {
        if !self.exists().await {
            log::info!("No catalog at {}, starting empty", self.location());
            return Ok(Catalog::new());
        }
        self.load().await
    }
}

/// Sibling temp path used while writing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.tmp"))
}

/// Write bytes atomically (write to temp, then rename).
///
/// The temp file is removed if any step fails.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = temp_path_for(path);
    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

/// Delete leftover `*.tmp` files in `dir` from interrupted writes.
///
/// Returns how many were removed. A missing directory counts as clean.
pub async fn remove_stale_temps(dir: &Path) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tmp") && entry.file_type().await?.is_file() {
            tokio::fs::remove_file(&path).await?;
            log::debug!("Removed stale temp file {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn temp_path_keeps_extension() {
        assert_eq!(
            temp_path_for(Path::new("/a/slot_providers.json")),
            PathBuf::from("/a/slot_providers.json.tmp")
        );
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_temp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/file.bin");

        write_atomic(&path, b"hello").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(!temp_path_for(&path).exists());
    }

    #[tokio::test]
    async fn remove_stale_temps_only_touches_tmp_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.jpg"), b"img").unwrap();
        std::fs::write(tmp.path().join("b.jpg.tmp"), b"half").unwrap();

        assert_eq!(remove_stale_temps(tmp.path()).await.unwrap(), 1);
        assert!(tmp.path().join("a.jpg").exists());
        assert!(!tmp.path().join("b.jpg.tmp").exists());
        assert_eq!(remove_stale_temps(&tmp.path().join("missing")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn write_atomic_failure_leaves_target_untouched() {
        let tmp = TempDir::new().unwrap();
        // A directory at the target path makes the final rename fail.
        let path = tmp.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        assert!(write_atomic(&path, b"data").await.is_err());
        assert!(path.join("keep").exists());
        assert!(!temp_path_for(&path).exists());
    }
}
