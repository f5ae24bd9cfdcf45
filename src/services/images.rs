// src/services/images.rs

//! Image download and normalization.
//!
//! Every stored image is opaque RGB and named after its catalog key. New keys
//! end in `.jpg`; legacy `.png`, `.webp` and `.gif` keys keep their format.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;

use crate::error::FetchError;
use crate::models::ImageConfig;
use crate::pipeline::RetryPolicy;
use crate::services::PageSource;
use crate::storage::write_atomic;

/// An image file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: PathBuf,
    /// File size in bytes
    pub bytes: u64,
    /// Pixel size, known only for freshly encoded images
    pub dimensions: Option<(u32, u32)>,
}

/// What [`ImageFetcher::fetch_and_store`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Downloaded(StoredImage),
    AlreadyPresent(StoredImage),
}

impl StoreOutcome {
    pub fn image(&self) -> &StoredImage {
        match self {
            StoreOutcome::Downloaded(image) | StoreOutcome::AlreadyPresent(image) => image,
        }
    }

    pub fn was_downloaded(&self) -> bool {
        matches!(self, StoreOutcome::Downloaded(_))
    }
}

/// Downloads, re-encodes and stores thumbnails.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    jpeg_quality: u8,
    min_bytes: usize,
    retry: RetryPolicy,
}

impl ImageFetcher {
    pub fn new(config: &ImageConfig, retry: RetryPolicy) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
            min_bytes: config.min_bytes,
            retry,
        }
    }

    /// Fetch `url` and store it at `dest` in the format its extension names.
    ///
    /// An existing `dest` is returned as-is without any request.
    pub async fn fetch_and_store<S>(
        &self,
        source: &S,
        url: &str,
        dest: &Path,
    ) -> Result<StoreOutcome, FetchError>
    where
        S: PageSource + ?Sized,
    {
        if let Ok(meta) = tokio::fs::metadata(dest).await {
            log::debug!("Image exists, skipping: {}", dest.display());
            return Ok(StoreOutcome::AlreadyPresent(StoredImage {
                path: dest.to_path_buf(),
                bytes: meta.len(),
                dimensions: None,
            }));
        }

        let body = self.retry.run(url, || source.fetch_bytes(url)).await?;
        if body.len() < self.min_bytes {
            return Err(FetchError::Decode(format!(
                "body too small ({} bytes < {})",
                body.len(),
                self.min_bytes
            )));
        }

        let quality = self.jpeg_quality;
        let format = output_format(dest);
        let (encoded, dimensions) =
            tokio::task::spawn_blocking(move || transcode(&body, format, quality))
                .await
                .map_err(|e| FetchError::Decode(format!("encoder task failed: {e}")))??;

        write_atomic(dest, &encoded).await.map_err(FetchError::Write)?;

        log::info!(
            "Stored {} ({}x{}, {} bytes)",
            dest.display(),
            dimensions.0,
            dimensions.1,
            encoded.len()
        );
        Ok(StoreOutcome::Downloaded(StoredImage {
            path: dest.to_path_buf(),
            bytes: encoded.len() as u64,
            dimensions: Some(dimensions),
        }))
    }
}

/// JPEG unless `dest` names one of the other stored formats.
fn output_format(dest: &Path) -> ImageFormat {
    match ImageFormat::from_path(dest) {
        Ok(format @ (ImageFormat::Png | ImageFormat::WebP | ImageFormat::Gif)) => format,
        _ => ImageFormat::Jpeg,
    }
}

/// Decode any supported format and re-encode as opaque RGB.
fn transcode(
    body: &[u8],
    format: ImageFormat,
    quality: u8,
) -> Result<(Vec<u8>, (u32, u32)), FetchError> {
    let decoded = image::load_from_memory(body)?;
    let rgb = decoded.into_rgb8();
    let dimensions = rgb.dimensions();

    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?
        }
        other => rgb.write_to(&mut out, other)?,
    }
    Ok((out.into_inner(), dimensions))
}
