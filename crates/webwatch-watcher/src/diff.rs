use webwatch_core::{DiffEntry, Snapshot};

/// Items of `new` worth reporting against the stored `old` snapshot.
///
/// With `change_only` an item is skipped when it existed before with the same
/// non-empty value; otherwise every item of `new` is reported. Items that only
/// exist in `old` are never reported. Entries come back sorted by item.
pub fn diff(new: &Snapshot, old: &Snapshot, change_only: bool) -> Vec<DiffEntry> {
    new.iter()
        .filter_map(|(item, new_value)| {
            let old_value = old.get(item);
            let unchanged = old_value.is_some_and(|v| !v.is_empty() && v == new_value);
            if change_only && unchanged {
                return None;
            }
            Some(DiffEntry::new(
                item.clone(),
                old_value.cloned().unwrap_or_default(),
                new_value.clone(),
            ))
        })
        .collect()
}
