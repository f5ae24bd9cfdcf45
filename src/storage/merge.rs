// src/storage/merge.rs

//! Catalog union with an explicit conflict policy.

use crate::error::{AppError, Result};
use crate::models::{Catalog, KeyChange, MergeOutcome, MergePolicy};
use crate::storage::CatalogStore;

/// Merge `incoming` into `existing` under `policy`.
///
/// Every key whose value differs is recorded in [`MergeOutcome::changed`] and
/// logged, whether or not the policy applies the incoming value. With
/// [`MergePolicy::RejectConflicts`] the first such key fails the merge and
/// nothing is returned.
pub fn merge(existing: &Catalog, incoming: &Catalog, policy: MergePolicy) -> Result<MergeOutcome> {
    let mut outcome = MergeOutcome {
        catalog: existing.clone(),
        ..MergeOutcome::default()
    };

    for (key, value) in incoming {
        match existing.get(key) {
            None => {
                outcome.catalog.insert(key.clone(), value.clone());
                outcome.added.push(key.clone());
            }
            Some(current) if current == value => outcome.unchanged += 1,
            Some(current) => {
                let applied = match policy {
                    MergePolicy::KeepExisting => false,
                    MergePolicy::PreferIncoming => true,
                    MergePolicy::RejectConflicts => {
                        log::error!(
                            "Merge conflict on '{}': '{}' vs '{}'",
                            key,
                            current,
                            value
                        );
                        return Err(AppError::DuplicateKeyConflict {
                            key: key.clone(),
                            existing: current.clone(),
                            incoming: value.clone(),
                        });
                    }
                };

                if applied {
                    log::warn!("Catalog '{}': '{}' -> '{}'", key, current, value);
                    outcome.catalog.insert(key.clone(), value.clone());
                } else {
                    log::warn!(
                        "Catalog '{}': kept '{}', ignored incoming '{}'",
                        key,
                        current,
                        value
                    );
                }

                outcome.changed.push(KeyChange {
                    key: key.clone(),
                    from: current.clone(),
                    to: value.clone(),
                    applied,
                });
            }
        }
    }

    Ok(outcome)
}

/// Load the stored catalog (empty if missing), merge `incoming` and save.
///
/// Nothing is written when the merge fails or changes nothing.
pub async fn merge_into(
    store: &dyn CatalogStore,
    incoming: &Catalog,
    policy: MergePolicy,
) -> Result<MergeOutcome> {
    let existing = store.load_or_empty().await?;
    let outcome = merge(&existing, incoming, policy)?;

    if outcome.added.is_empty() && outcome.applied_changes() == 0 && store.exists().await {
        log::debug!("Catalog unchanged, not saving");
        return Ok(outcome);
    }
    store.save(&outcome.catalog).await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(pairs: &[(&str, &str)]) -> Catalog {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_disjoint_union() {
        let a = catalog(&[("netent-starburst.jpg", "NetEnt")]);
        let b = catalog(&[("playn-go-book-of-dead.jpg", "Play'n GO")]);

        let outcome = merge(&a, &b, MergePolicy::KeepExisting).unwrap();
        assert_eq!(outcome.catalog.len(), 2);
        assert_eq!(outcome.added, vec!["playn-go-book-of-dead.jpg"]);
        assert!(outcome.changed.is_empty());
    }

    #[test]
    fn test_prefer_incoming_commutes_on_disjoint_keys() {
        let a = catalog(&[("a.jpg", "NetEnt"), ("b.jpg", "NetEnt")]);
        let b = catalog(&[("c.jpg", "Red Tiger")]);

        let ab = merge(&a, &b, MergePolicy::PreferIncoming).unwrap().catalog;
        let ba = merge(&b, &a, MergePolicy::PreferIncoming).unwrap().catalog;
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_prefer_incoming_is_order_dependent_on_overlap() {
        let a = catalog(&[("alchemist-wonders.jpg", "Pragmatic Play")]);
        let b = catalog(&[("alchemist-wonders.jpg", "Hacksaw Gaming")]);

        let ab = merge(&a, &b, MergePolicy::PreferIncoming).unwrap();
        let ba = merge(&b, &a, MergePolicy::PreferIncoming).unwrap();

        assert_eq!(ab.catalog["alchemist-wonders.jpg"], "Hacksaw Gaming");
        assert_eq!(ba.catalog["alchemist-wonders.jpg"], "Pragmatic Play");
        assert_ne!(ab.catalog, ba.catalog);
        assert_eq!(ab.applied_changes(), 1);
    }

    #[test]
    fn test_keep_existing_records_but_ignores_change() {
        let a = catalog(&[("x.jpg", "NetEnt")]);
        let b = catalog(&[("x.jpg", "Red Tiger"), ("y.jpg", "Red Tiger")]);

        let outcome = merge(&a, &b, MergePolicy::KeepExisting).unwrap();
        assert_eq!(outcome.catalog["x.jpg"], "NetEnt");
        assert_eq!(outcome.catalog["y.jpg"], "Red Tiger");
        assert_eq!(
            outcome.changed,
            vec![KeyChange {
                key: "x.jpg".into(),
                from: "NetEnt".into(),
                to: "Red Tiger".into(),
                applied: false,
            }]
        );
        assert_eq!(outcome.applied_changes(), 0);
    }

    #[test]
    fn test_reject_conflicts() {
        let a = catalog(&[("x.jpg", "NetEnt")]);
        let b = catalog(&[("x.jpg", "Red Tiger")]);

        let err = merge(&a, &b, MergePolicy::RejectConflicts).unwrap_err();
        assert!(matches!(err, AppError::DuplicateKeyConflict { ref key, .. } if key == "x.jpg"));
    }

    #[test]
    fn test_reject_conflicts_allows_equal_values() {
        let a = catalog(&[("x.jpg", "NetEnt")]);
        let b = catalog(&[("x.jpg", "NetEnt"), ("z.jpg", "Playson")]);

        let outcome = merge(&a, &b, MergePolicy::RejectConflicts).unwrap();
        assert_eq!(outcome.unchanged, 1);
        assert_eq!(outcome.added, vec!["z.jpg"]);
    }
}
