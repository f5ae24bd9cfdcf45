// src/pipeline/cleanup.rs

//! Catalog maintenance: provider canonicalization, duplicate detection and
//! key repair.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::Result;
use crate::models::{Catalog, Provider, game_slug_of, split_key};
use crate::pipeline::coverage::image_file_for;

/// Mis-decoded smart quotes and their straight replacements, longest first.
const QUOTE_REPAIRS: &[(&str, &str)] = &[
    ("â€™", "'"),
    ("â€˜", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("\u{2019}", "'"),
    ("\u{2018}", "'"),
    ("\u{201c}", "\""),
    ("\u{201d}", "\""),
];

/// Catalog with every provider name in its canonical spelling.
#[derive(Debug, Clone, Default)]
pub struct Canonicalized {
    pub catalog: Catalog,
    /// Entries whose value was rewritten
    pub rewritten: usize,
    /// Provider spellings with no known studio, kept verbatim
    pub unknown: BTreeSet<String>,
}

/// Rewrite every provider value to its canonical display name.
pub fn canonicalize_providers(catalog: &Catalog) -> Canonicalized {
    let mut out = Canonicalized::default();

    for (key, provider) in catalog {
        let value = match Provider::resolve(provider) {
            Some(p) if p.display_name() != provider => {
                log::info!("'{}': provider '{}' -> '{}'", key, provider, p);
                out.rewritten += 1;
                p.display_name().to_string()
            }
            Some(_) => provider.clone(),
            None => {
                out.unknown.insert(provider.clone());
                provider.clone()
            }
        };
        out.catalog.insert(key.clone(), value);
    }

    for name in &out.unknown {
        log::warn!("Unknown provider spelling '{}'", name);
    }
    out
}

/// Keys that describe the same game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub game_slug: String,
    /// `(key, provider)` pairs, sorted by key
    pub entries: Vec<(String, String)>,
}

impl DuplicateGroup {
    /// Whether the group spans more than one provider.
    pub fn is_cross_provider(&self) -> bool {
        let providers: BTreeSet<_> = self.entries.iter().map(|(_, p)| p).collect();
        providers.len() > 1
    }
}

/// Group keys whose bare game slug collides. Nothing is removed.
pub fn find_duplicates(catalog: &Catalog) -> Vec<DuplicateGroup> {
    let mut groups: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for (key, provider) in catalog {
        let slug = game_slug_of(key, provider);
        if slug.is_empty() {
            continue;
        }
        groups
            .entry(slug)
            .or_default()
            .push((key.clone(), provider.clone()));
    }

    groups
        .into_iter()
        .filter(|(_, entries)| entries.len() > 1)
        .map(|(game_slug, entries)| DuplicateGroup { game_slug, entries })
        .collect()
}

/// Replace smart and mis-decoded quotes with straight ones.
pub fn straighten_quotes(s: &str) -> String {
    QUOTE_REPAIRS
        .iter()
        .fold(s.to_string(), |acc, (from, to)| acc.replace(from, to))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// What [`repair_keys`] changed, or would change without `apply`.
#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    /// Catalog after repairs
    pub catalog: Catalog,
    pub key_renames: Vec<Rename>,
    pub file_renames: Vec<Rename>,
    /// Renames skipped because the target key already exists
    pub conflicts: Vec<Rename>,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.key_renames.is_empty() && self.file_renames.is_empty() && self.conflicts.is_empty()
    }
}

/// Straighten quotes in keys and bring image filenames in line with keys.
///
/// Image files are renamed only when `apply` is set and the target name is
/// free. A file stored without the `-slot`/` Slot` suffix its key carries is
/// relinked the same way.
pub async fn repair_keys(catalog: &Catalog, images_dir: &Path, apply: bool) -> Result<RepairReport> {
    let mut report = RepairReport {
        catalog: catalog.clone(),
        ..RepairReport::default()
    };

    for (key, provider) in catalog {
        let fixed = straighten_quotes(key);
        if fixed == *key {
            continue;
        }
        let rename = Rename {
            from: key.clone(),
            to: fixed.clone(),
        };
        if report.catalog.contains_key(&fixed) {
            log::warn!("Cannot rename '{}': '{}' already exists", key, fixed);
            report.conflicts.push(rename);
            continue;
        }

        report.catalog.remove(key);
        report.catalog.insert(fixed.clone(), provider.clone());
        report.key_renames.push(rename);

        let from = image_file_for(key);
        let to = image_file_for(&fixed);
        if move_image(images_dir, &from, &to, apply).await? {
            report.file_renames.push(Rename { from, to });
        }
    }

    for key in report.catalog.keys() {
        let expected = image_file_for(key);
        let Some(alt) = unsuffixed_file(&expected) else {
            continue;
        };
        if move_image(images_dir, &alt, &expected, apply).await? {
            report.file_renames.push(Rename {
                from: alt,
                to: expected,
            });
        }
    }

    Ok(report)
}

/// `foo-slot.jpg` -> `foo.jpg`, `Foo Slot.jpg` -> `Foo.jpg`.
fn unsuffixed_file(file: &str) -> Option<String> {
    let (stem, ext) = split_key(file);
    let ext = ext?;
    let bare = stem
        .strip_suffix("-slot")
        .or_else(|| stem.strip_suffix(" Slot"))?;
    Some(format!("{bare}.{ext}"))
}

/// Rename `from` to `to` inside `dir` when `from` exists and `to` does not.
/// Returns whether the rename applies.
async fn move_image(dir: &Path, from: &str, to: &str, apply: bool) -> Result<bool> {
    let src = dir.join(from);
    let dst = dir.join(to);
    if !tokio::fs::try_exists(&src).await? || tokio::fs::try_exists(&dst).await? {
        return Ok(false);
    }
    if apply {
        tokio::fs::rename(&src, &dst).await?;
        log::info!("Renamed image {} -> {}", from, to);
    } else {
        log::info!("Would rename image {} -> {}", from, to);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog(pairs: &[(&str, &str)]) -> Catalog {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonicalize_providers() {
        let input = catalog(&[
            ("a.jpg", "Playn GO"),
            ("b.jpg", "NetEnt"),
            ("c.jpg", "netent"),
            ("d.jpg", "Mystery Reels"),
        ]);

        let out = canonicalize_providers(&input);
        assert_eq!(out.catalog["a.jpg"], "Play'n GO");
        assert_eq!(out.catalog["c.jpg"], "NetEnt");
        assert_eq!(out.catalog["d.jpg"], "Mystery Reels");
        assert_eq!(out.rewritten, 2);
        assert_eq!(out.unknown.into_iter().collect::<Vec<_>>(), ["Mystery Reels"]);
    }

    #[test]
    fn test_find_duplicates_across_and_within_providers() {
        let input = catalog(&[
            ("pragmatic-play-alchemist-wonders.jpg", "Pragmatic Play"),
            ("hacksaw-gaming-alchemist-wonders.jpg", "Hacksaw Gaming"),
            ("red-tiger-pirates-plenty.jpg", "Red Tiger"),
            ("red-tiger-pirates-plenty-slot.jpg", "Red Tiger"),
            ("netent-starburst.jpg", "NetEnt"),
        ]);

        let groups = find_duplicates(&input);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].game_slug, "alchemist-wonders");
        assert!(groups[0].is_cross_provider());
        assert_eq!(groups[1].game_slug, "pirates-plenty");
        assert!(!groups[1].is_cross_provider());
    }

    #[test]
    fn test_straighten_quotes() {
        assert_eq!(straighten_quotes("Joker\u{2019}s Jewels"), "Joker's Jewels");
        assert_eq!(straighten_quotes("Gonzoâ€™s Quest"), "Gonzo's Quest");
        assert_eq!(straighten_quotes("plain"), "plain");
    }

    #[tokio::test]
    async fn test_repair_keys_dry_run_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Joker\u{2019}s Jewels.jpg"), b"x").unwrap();
        let input = catalog(&[("Joker\u{2019}s Jewels.jpg", "Pragmatic Play")]);

        let report = repair_keys(&input, tmp.path(), false).await.unwrap();
        assert_eq!(report.key_renames.len(), 1);
        assert_eq!(report.file_renames.len(), 1);
        assert!(report.catalog.contains_key("Joker's Jewels.jpg"));
        assert!(tmp.path().join("Joker\u{2019}s Jewels.jpg").exists());
    }

    #[tokio::test]
    async fn test_repair_keys_apply_and_conflicts() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Joker\u{2019}s Jewels.jpg"), b"x").unwrap();
        std::fs::write(tmp.path().join("Pirates Plenty.jpg"), b"y").unwrap();
        let input = catalog(&[
            ("Joker\u{2019}s Jewels.jpg", "Pragmatic Play"),
            ("Wolf\u{2019}s Gold.jpg", "Pragmatic Play"),
            ("Wolf's Gold.jpg", "Pragmatic Play"),
            ("Pirates Plenty Slot.jpg", "Red Tiger"),
        ]);

        let report = repair_keys(&input, tmp.path(), true).await.unwrap();

        assert!(tmp.path().join("Joker's Jewels.jpg").exists());
        assert!(tmp.path().join("Pirates Plenty Slot.jpg").exists());
        assert_eq!(
            report.conflicts,
            vec![Rename {
                from: "Wolf\u{2019}s Gold.jpg".into(),
                to: "Wolf's Gold.jpg".into(),
            }]
        );
        assert!(report.catalog.contains_key("Wolf\u{2019}s Gold.jpg"));
        assert_eq!(report.file_renames.len(), 2);
    }
}
