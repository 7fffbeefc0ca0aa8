//! Label and annotation helpers

use std::collections::BTreeMap;

/// Merge label layers, later layers overriding earlier ones on key collision
///
/// The renderer passes the topology-kind label first, then the selector
/// labels, then the operator-wide labels.
pub fn merge_metadata<'a, I>(layers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a BTreeMap<String, String>>,
{
    let mut merged = BTreeMap::new();

    for layer in layers {
        for (k, v) in layer {
            merged.insert(k.clone(), v.clone());
        }
    }

    merged
}

/// Check that `existing` holds every key/value pair in `expected`
///
/// Keys present only on `existing` are ignored; something other than this
/// operator is allowed to label or annotate the object.
pub fn existing_map_contains_all_expected(
    existing: Option<&BTreeMap<String, String>>,
    expected: Option<&BTreeMap<String, String>>,
) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    if expected.is_empty() {
        return true;
    }

    let Some(existing) = existing else {
        return false;
    };

    expected
        .iter()
        .all(|(k, v)| existing.get(k).is_some_and(|existing_v| existing_v == v))
}
