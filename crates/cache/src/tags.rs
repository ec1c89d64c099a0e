//! Bipartite mapping from tags to the cached queries that provide them.

use std::collections::{BTreeSet, HashMap};

use shelf_kernel::Tag;

use crate::key::QueryKey;

#[derive(Debug, Default)]
pub struct TagIndex {
    dependents: HashMap<Tag, BTreeSet<QueryKey>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` provides each of `tags`.
    pub fn provide(&mut self, key: &QueryKey, tags: &[Tag]) {
        for tag in tags {
            self.dependents.entry(*tag).or_default().insert(key.clone());
        }
    }

    /// Drop `key` from each of `tags`.
    pub fn forget(&mut self, key: &QueryKey, tags: &[Tag]) {
        for tag in tags {
            if let Some(keys) = self.dependents.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.dependents.remove(tag);
                }
            }
        }
    }

    pub fn dependents(&self, tag: Tag) -> impl Iterator<Item = &QueryKey> {
        self.dependents.get(&tag).into_iter().flatten()
    }

    /// Query keys made stale by a mutation invalidating `tags`.
    pub fn invalidated_by(&self, tags: &[Tag]) -> BTreeSet<QueryKey> {
        tags.iter()
            .flat_map(|tag| self.dependents(*tag))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
    }
}
