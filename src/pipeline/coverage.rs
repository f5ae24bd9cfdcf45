//! Image coverage report.
//!
//! Checks both directions of the one-image-per-key invariant: catalog
//! entries without an image file and image files without a catalog entry.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::Result;
use crate::models::{Catalog, split_key};
use crate::utils::console;

/// Coverage of one provider's entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCoverage {
    pub provider: String,
    pub total: usize,
    pub with_image: usize,
    /// Keys without an image, sorted
    pub missing: Vec<String>,
}

impl ProviderCoverage {
    /// Fraction of entries that have an image, `0.0` when empty.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.with_image as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageReport {
    /// Ascending by coverage ratio, then by name
    pub providers: Vec<ProviderCoverage>,
    /// Image files no catalog entry points at
    pub orphans: Vec<String>,
}

impl CoverageReport {
    pub fn total(&self) -> usize {
        self.providers.iter().map(|p| p.total).sum()
    }

    pub fn with_image(&self) -> usize {
        self.providers.iter().map(|p| p.with_image).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.orphans.is_empty() && self.with_image() == self.total()
    }

    /// Print the per-provider table, listing up to `max_missing` keys each.
    pub fn print(&self, max_missing: usize) {
        console::header("Provider coverage");
        for p in &self.providers {
            let mark = if p.with_image == p.total { "✓" } else { "✗" };
            console::sub_item(&format!(
                "{} {:24} {:4}/{:<4} ({:5.1}%)",
                mark,
                p.provider,
                p.with_image,
                p.total,
                p.ratio() * 100.0
            ));
            for key in p.missing.iter().take(max_missing) {
                console::sub_item(&format!("    - {key}"));
            }
            if p.missing.len() > max_missing {
                console::sub_item(&format!(
                    "    ... and {} more",
                    p.missing.len() - max_missing
                ));
            }
        }
        console::separator();

        let total = self.total();
        let pct = if total == 0 {
            0.0
        } else {
            self.with_image() as f64 / total as f64 * 100.0
        };
        console::summary(
            "Coverage",
            &[
                ("Entries", total.to_string()),
                ("With image", format!("{} ({:.1}%)", self.with_image(), pct)),
                ("Orphan images", self.orphans.len().to_string()),
            ],
        );
    }
}

/// Image filename for a catalog key. Bare legacy keys map to `{key}.jpg`.
pub fn image_file_for(key: &str) -> String {
    match split_key(key) {
        (_, Some(_)) => key.to_string(),
        (_, None) => format!("{key}.jpg"),
    }
}

/// Compare `catalog` against the files in `images_dir`.
pub async fn analyze(catalog: &Catalog, images_dir: &Path) -> Result<CoverageReport> {
    let files = list_image_files(images_dir).await?;

    let mut by_provider: BTreeMap<&str, ProviderCoverage> = BTreeMap::new();
    let mut referenced = BTreeSet::new();

    for (key, provider) in catalog {
        let file = image_file_for(key);
        let entry = by_provider
            .entry(provider.as_str())
            .or_insert_with(|| ProviderCoverage {
                provider: provider.clone(),
                total: 0,
                with_image: 0,
                missing: Vec::new(),
            });
        entry.total += 1;
        if files.contains(&file) {
            entry.with_image += 1;
        } else {
            entry.missing.push(key.clone());
        }
        referenced.insert(file);
    }

    let mut providers: Vec<_> = by_provider.into_values().collect();
    providers.sort_by(|a, b| {
        a.ratio()
            .total_cmp(&b.ratio())
            .then_with(|| a.provider.cmp(&b.provider))
    });

    let orphans = files.difference(&referenced).cloned().collect();

    Ok(CoverageReport { providers, orphans })
}

async fn list_image_files(dir: &Path) -> Result<BTreeSet<String>> {
    let mut files = BTreeSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Images directory {} does not exist", dir.display());
            return Ok(files);
        }
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if split_key(&name).1.is_some() {
            files.insert(name);
        }
    }
    Ok(files)
}
