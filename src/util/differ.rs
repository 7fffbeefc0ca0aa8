//! Set differ for topology-owned child objects
//!
//! Every child kind a topology owns (claims today, services and deployments
//! in the wider operator) is keyed by node name. [`ObjectDiffer`] holds the
//! objects that exist right now and derives which node names still need an
//! object and which objects no longer belong to any node.

use std::collections::{BTreeMap, BTreeSet};

/// Current/missing/extra partition of child objects keyed by node name
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDiffer<T> {
    /// Objects that exist, keyed by node name
    pub current: BTreeMap<String, T>,
    /// Node names that need an object but have none (sorted)
    pub missing: Vec<String>,
    /// Node names whose object should be removed (sorted)
    pub extra: Vec<String>,
}

impl<T> Default for ObjectDiffer<T> {
    fn default() -> Self {
        Self {
            current: BTreeMap::new(),
            missing: Vec::new(),
            extra: Vec::new(),
        }
    }
}

impl<T> ObjectDiffer<T> {
    /// Create a differ from the objects that currently exist
    pub fn new(current: BTreeMap<String, T>) -> Self {
        Self {
            current,
            ..Default::default()
        }
    }

    /// Node names of the current objects
    pub fn current_object_names(&self) -> Vec<String> {
        self.current.keys().cloned().collect()
    }

    /// Record every name in `all` that has no current object as missing
    pub fn set_missing<S: AsRef<str>>(&mut self, all: &[S]) {
        let missing: BTreeSet<&str> = all
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.current.contains_key(*name))
            .collect();

        self.missing = missing.into_iter().map(str::to_string).collect();
    }

    /// Record every current object whose name is not in `all` as extra
    ///
    /// `None` means no object is wanted at all, so every current object is
    /// extra.
    pub fn set_extra<S: AsRef<str>>(&mut self, all: Option<&[S]>) {
        let wanted: BTreeSet<&str> = all
            .unwrap_or_default()
            .iter()
            .map(AsRef::as_ref)
            .collect();

        self.extra = self
            .current
            .keys()
            .filter(|name| !wanted.contains(name.as_str()))
            .cloned()
            .collect();
    }

    /// Current objects that are not scheduled for removal
    pub fn retained(&self) -> impl Iterator<Item = (&String, &T)> {
        self.current
            .iter()
            .filter(|(name, _)| self.extra.binary_search(*name).is_err())
    }

    /// Whether nothing needs to be created or removed
    pub fn is_settled(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}
