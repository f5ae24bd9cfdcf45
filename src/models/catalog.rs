// src/models/catalog.rs

//! Catalog data structures.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Provider;
use crate::utils::slug::{normalize_key, strip_slot_suffix};

/// Image filename to provider display name.
///
/// Ordered so that serialization is stable without an explicit sort.
pub type Catalog = BTreeMap<String, String>;

/// Extensions recognized on catalog keys and image files.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// A single `(key, provider)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Image filename, `{provider-slug}-{game-slug}.{ext}`
    pub key: String,
    /// Provider display name
    pub provider: String,
}

impl CatalogEntry {
    /// Build the conventional entry for a known provider.
    pub fn new(provider: Provider, game_name: &str, ext: &str) -> Self {
        Self {
            key: conventional_key(&provider.key_prefix(), game_name, ext),
            provider: provider.display_name().to_string(),
        }
    }

    /// Build an entry for any provider spelling.
    pub fn from_parts(provider_name: &str, game_name: &str, ext: &str) -> Self {
        Self {
            key: conventional_key(&normalize_key(provider_name), game_name, ext),
            provider: provider_name.to_string(),
        }
    }
}

fn conventional_key(prefix: &str, game_name: &str, ext: &str) -> String {
    let game_slug = normalize_key(game_name);
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    format!("{prefix}-{game_slug}.{ext}")
}

/// How to resolve keys present on both sides of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Existing value wins
    #[default]
    KeepExisting,
    /// Incoming value wins (last writer wins)
    PreferIncoming,
    /// Any disagreement fails the merge
    RejectConflicts,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergePolicy::KeepExisting => "keep-existing",
            MergePolicy::PreferIncoming => "prefer-incoming",
            MergePolicy::RejectConflicts => "reject-conflicts",
        };
        f.write_str(s)
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "keep-existing" | "keep" => Ok(MergePolicy::KeepExisting),
            "prefer-incoming" | "incoming" => Ok(MergePolicy::PreferIncoming),
            "reject-conflicts" | "reject" => Ok(MergePolicy::RejectConflicts),
            other => Err(format!("unknown merge policy '{other}'")),
        }
    }
}

/// A key whose value differs between the two sides of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    pub key: String,
    pub from: String,
    pub to: String,
    /// Whether the merged catalog carries `to`
    pub applied: bool,
}

/// Result of merging two catalogs.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub catalog: Catalog,
    /// Keys only present on the incoming side
    pub added: Vec<String>,
    /// Keys present on both sides with differing values
    pub changed: Vec<KeyChange>,
    /// Keys present on both sides with equal values
    pub unchanged: usize,
}

impl MergeOutcome {
    /// Number of keys whose stored value actually moved.
    pub fn applied_changes(&self) -> usize {
        self.changed.iter().filter(|c| c.applied).count()
    }
}

/// Split `name.ext` into stem and lowercase extension, if it has a known one.
pub fn split_key(key: &str) -> (&str, Option<String>) {
    if let Some((stem, ext)) = key.rsplit_once('.') {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return (stem, Some(ext));
        }
    }
    (key, None)
}

/// Derive the bare game slug from a key, dropping extension, provider prefix
/// (current or legacy spelling) and a trailing `-slot`.
pub fn game_slug_of(key: &str, provider_name: &str) -> String {
    let (stem, _) = split_key(key);
    let stem = normalize_key(stem);
    let prefixes = match Provider::resolve(provider_name) {
        Some(provider) => provider.key_prefixes(),
        None => {
            let prefix = normalize_key(provider_name);
            let compact = prefix.replace('-', "");
            vec![prefix, compact]
        }
    };

    let bare = prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .find_map(|p| stem.strip_prefix(p.as_str())?.strip_prefix('-'))
        .unwrap_or(&stem);
    strip_slot_suffix(bare).to_string()
}
