//! Inverse tag index
//!
//! Derived structure mapping tag -> key set, kept in lockstep with the
//! entry map so invalidation is proportional to the number of affected
//! entries rather than the total cache size.
//!
//! Invariant, both directions: for every entry `e` and tag `t` in
//! `e.tags`, `index[t]` contains `e.key`; and every key listed under a tag
//! belongs to a live entry carrying that tag.

use std::collections::{HashMap, HashSet};

/// Mapping from tag to the set of cache keys carrying it.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    by_tag: HashMap<String, HashSet<String>>,
}

impl TagIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` under each of `tags`.
    pub fn insert<'a>(&mut self, key: &str, tags: impl IntoIterator<Item = &'a String>) {
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Remove `key` from each of `tags`, dropping tag buckets that empty out.
    pub fn remove<'a>(&mut self, key: &str, tags: impl IntoIterator<Item = &'a String>) {
        for tag in tags {
            if let Some(keys) = self.by_tag.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }

    /// Union of keys registered under any of the given tags.
    pub fn keys_for_any<S: AsRef<str>>(&self, tags: &[S]) -> HashSet<String> {
        let mut keys = HashSet::new();
        for tag in tags {
            if let Some(bucket) = self.by_tag.get(tag.as_ref()) {
                keys.extend(bucket.iter().cloned());
            }
        }
        keys
    }

    /// Number of distinct tags currently indexed.
    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.by_tag.clear();
    }

    /// Whether `key` is registered under `tag`.
    pub fn contains(&self, tag: &str, key: &str) -> bool {
        self.by_tag.get(tag).is_some_and(|keys| keys.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn test_insert_and_lookup() {
        let mut index = TagIndex::new();
        let tags = vec!["user:1".to_string(), "analytics".to_string()];
        index.insert("k1", &tags);

        assert!(index.contains("user:1", "k1"));
        assert!(index.contains("analytics", "k1"));
        assert_eq!(index.keys_for_any(&["user:1"]).len(), 1);
    }

    #[test]
    fn test_remove_drops_empty_buckets() {
        let mut index = TagIndex::new();
        let tags = vec!["user:1".to_string()];
        index.insert("k1", &tags);
        index.remove("k1", &tags);

        assert_eq!(index.tag_count(), 0);
        assert!(index.keys_for_any(&["user:1"]).is_empty());
    }

    #[test]
    fn test_union_across_tags() {
        let mut index = TagIndex::new();
        index.insert("a", &vec!["user:1".to_string()]);
        index.insert("b", &vec!["user:1".to_string(), "analytics".to_string()]);
        index.insert("c", &vec!["analytics".to_string()]);

        let keys = index.keys_for_any(&["user:1", "analytics"]);
        assert_eq!(keys.len(), 3);
    }

    proptest! {
        /// Inserting a set of (key, tags) pairs and then removing an
        /// arbitrary subset leaves the index exactly consistent with the
        /// surviving pairs, in both directions.
        #[test]
        fn prop_index_stays_consistent(
            entries in proptest::collection::hash_map(
                "[a-z]{1,8}",
                proptest::collection::hash_set("[a-z]{1,4}", 1..4),
                1..16,
            ),
            remove_mask in proptest::collection::vec(any::<bool>(), 16),
        ) {
            let entries: HashMap<String, Vec<String>> = entries
                .into_iter()
                .map(|(k, tags)| (k, tags.into_iter().collect()))
                .collect();

            let mut index = TagIndex::new();
            for (key, tags) in &entries {
                index.insert(key, tags);
            }

            let mut survivors: HashMap<&String, &Vec<String>> = HashMap::new();
            for (i, (key, tags)) in entries.iter().enumerate() {
                if remove_mask.get(i).copied().unwrap_or(false) {
                    index.remove(key, tags);
                } else {
                    survivors.insert(key, tags);
                }
            }

            // Forward: every surviving (key, tag) pair is indexed.
            for (key, tags) in &survivors {
                for tag in tags.iter() {
                    prop_assert!(index.contains(tag, key));
                }
            }

            // Reverse: every indexed key belongs to a survivor with that tag.
            let all_tags: Vec<String> = entries
                .values()
                .flat_map(|tags| tags.iter().cloned())
                .collect();
            for tag in &all_tags {
                for key in index.keys_for_any(std::slice::from_ref(tag)) {
                    let tags = survivors.get(&key);
                    prop_assert!(tags.is_some_and(|tags| tags.contains(tag)));
                }
            }
        }
    }
}
