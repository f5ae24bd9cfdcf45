//! Local filesystem catalog.
//!
//! The catalog is a flat JSON object, keys sorted, two-space indentation and
//! a trailing newline, so consecutive saves diff cleanly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Catalog;
use crate::storage::{CatalogStore, write_atomic};

/// JSON file catalog backend.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    path: PathBuf,
}

impl LocalCatalog {
    /// Create a catalog backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize deterministically.
    fn encode(catalog: &Catalog) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(catalog)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[async_trait]
impl CatalogStore for LocalCatalog {
    async fn load(&self) -> Result<Catalog> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::catalog_unavailable(&self.path, "file not found"));
            }
            Err(e) => return Err(AppError::catalog_unavailable(&self.path, e)),
        };

        let catalog: Catalog = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::catalog_unavailable(&self.path, format!("malformed catalog: {e}"))
        })?;

        log::debug!(
            "Loaded {} catalog entries from {}",
            catalog.len(),
            self.path.display()
        );
        Ok(catalog)
    }

    async fn save(&self, catalog: &Catalog) -> Result<()> {
        let bytes = Self::encode(catalog)?;
        write_atomic(&self.path, &bytes)
            .await
            .map_err(|e| AppError::catalog_io(&self.path, e))?;

        log::info!(
            "Saved {} catalog entries to {}",
            catalog.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
