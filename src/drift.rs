use std::collections::BTreeSet;

use crate::models::{ConfigDiff, Field, FieldChange, PlatformId, PlatformSelectors, SelectorValue, SiteConfig};

/// Structural diff between two selector configurations.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriftDetector;

impl DriftDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn compare(&self, previous: Option<&SiteConfig>, current: &SiteConfig) -> ConfigDiff {
        let Some(previous) = previous else {
            return ConfigDiff::no_baseline();
        };

        // BTreeSet keeps platforms in declared order
        let platforms: BTreeSet<PlatformId> = previous
            .platforms
            .keys()
            .chain(current.platforms.keys())
            .copied()
            .collect();

        let empty = PlatformSelectors::default();
        let mut changes = Vec::new();

        for platform in platforms {
            let old = previous.selectors(platform).unwrap_or(&empty);
            let new = current.selectors(platform).unwrap_or(&empty);

            for field in Field::ALL {
                let old_value = old.get(field);
                let new_value = new.get(field);

                if !same_selector(old_value.as_ref(), new_value.as_ref()) {
                    changes.push(FieldChange {
                        platform,
                        field,
                        old: old_value,
                        new: new_value,
                    });
                }
            }
        }

        ConfigDiff::from_changes(changes)
    }
}

/// Only the selector string matters; container counts and samples
/// fluctuate between runs without meaning drift.
fn same_selector(old: Option<&SelectorValue>, new: Option<&SelectorValue>) -> bool {
    match (old, new) {
        (None, None) => true,
        (Some(old), Some(new)) => old.selector() == new.selector(),
        _ => false,
    }
}
