//! End-to-end catalog behavior through the public API.

use slotcat::error::AppError;
use slotcat::models::{Catalog, CatalogEntry, MergePolicy, Provider};
use slotcat::storage::{CatalogStore, LocalCatalog, merge, merge_into};
use slotcat::utils::slug::normalize_key;
use tempfile::TempDir;

fn catalog(pairs: &[(&str, &str)]) -> Catalog {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn normalize_key_examples() {
    assert_eq!(normalize_key("Gonzo's Quest"), "gonzos-quest");
    assert_eq!(normalize_key("Play'n GO's Slot"), "playn-gos-slot");
    for name in ["Gonzo's Quest", "  Peter & Sons ", "Wolf\u{2019}s Gold!!", "1x2"] {
        let once = normalize_key(name);
        assert_eq!(normalize_key(&once), once);
    }
}

#[tokio::test]
async fn merge_into_bootstraps_and_accumulates() {
    let tmp = TempDir::new().unwrap();
    let store = LocalCatalog::new(tmp.path().join("slot_providers.json"));

    let first = catalog(&[("netent-starburst.jpg", "NetEnt")]);
    let outcome = merge_into(&store, &first, MergePolicy::KeepExisting)
        .await
        .unwrap();
    assert_eq!(outcome.added.len(), 1);

    let entry = CatalogEntry::new(Provider::NetEnt, "Gonzo's Quest", "jpg");
    let second: Catalog = [(entry.key.clone(), entry.provider.clone())].into();
    merge_into(&store, &second, MergePolicy::KeepExisting)
        .await
        .unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded["netent-gonzos-quest.jpg"], "NetEnt");
}

#[tokio::test]
async fn rejected_merge_leaves_file_untouched() {
    let tmp = TempDir::new().unwrap();
    let store = LocalCatalog::new(tmp.path().join("slot_providers.json"));
    store
        .save(&catalog(&[("alchemist-wonders.jpg", "Pragmatic Play")]))
        .await
        .unwrap();
    let before = std::fs::read(store.path()).unwrap();

    let incoming = catalog(&[
        ("alchemist-wonders.jpg", "Hacksaw Gaming"),
        ("new.jpg", "Hacksaw Gaming"),
    ]);
    let err = merge_into(&store, &incoming, MergePolicy::RejectConflicts)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DuplicateKeyConflict { .. }));
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[test]
fn prefer_incoming_order_matters_only_on_overlap() {
    let a = catalog(&[("x.jpg", "NetEnt")]);
    let b = catalog(&[("x.jpg", "Red Tiger")]);
    let c = catalog(&[("y.jpg", "Playson")]);

    let ac = merge(&a, &c, MergePolicy::PreferIncoming).unwrap().catalog;
    let ca = merge(&c, &a, MergePolicy::PreferIncoming).unwrap().catalog;
    assert_eq!(ac, ca);

    let ab = merge(&a, &b, MergePolicy::PreferIncoming).unwrap().catalog;
    let ba = merge(&b, &a, MergePolicy::PreferIncoming).unwrap().catalog;
    assert_ne!(ab, ba);
}
