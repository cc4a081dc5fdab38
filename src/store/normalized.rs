//! An entity collection kept as an ordered list plus an id-keyed map.
//!
//! Every mutation updates both views before returning, so a reader never sees
//! one updated and the other stale. The list is the enumeration order; the map
//! serves by-id lookups and is never rebuilt from a scan on a miss.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// An entity addressable by a stringified identifier.
pub trait Entity: Clone {
    fn key(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct NormalizedCollection<T: Entity> {
    list: Vec<T>,
    by_id: HashMap<String, T>,
}

impl<T: Entity> Default for NormalizedCollection<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T: Entity> NormalizedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered list. Later duplicates of an id are dropped.
    pub fn from_vec(items: Vec<T>) -> Self {
        let mut out = Self::new();
        out.replace_all(items);
        out
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// O(1) lookup by stringified id.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.by_id.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_id.contains_key(key)
    }

    /// Entities in list order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.list.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.list
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.list.clone()
    }

    /// Insert at the head of the list. An existing entity with the same id is
    /// replaced and moved to the head.
    pub fn insert_front(&mut self, item: T) {
        let key = item.key();
        if self.by_id.contains_key(&key) {
            self.list.retain(|x| x.key() != key);
        }
        self.by_id.insert(key, item.clone());
        self.list.insert(0, item);
    }

    /// Replace the entity in place, or append it when absent.
    pub fn upsert(&mut self, item: T) {
        let key = item.key();
        match self.position(&key) {
            Some(ix) => self.list[ix] = item.clone(),
            None => self.list.push(item.clone()),
        }
        self.by_id.insert(key, item);
    }

    /// Patch the entity addressed by `key` in both views.
    ///
    /// Returns `false` when no such entity exists. The closure must not change
    /// the entity's id.
    pub fn update<F>(&mut self, key: &str, patch: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let Some(ix) = self.position(key) else {
            return false;
        };
        patch(&mut self.list[ix]);
        let updated = self.list[ix].clone();
        debug_assert_eq!(updated.key(), key, "patch must not change the id");
        self.by_id.insert(key.to_string(), updated);
        true
    }

    /// Remove from both views.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let removed = self.by_id.remove(key)?;
        self.list.retain(|x| x.key() != key);
        Some(removed)
    }

    /// Swap in a new ordered list and rebuild the map from it.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.list.clear();
        self.by_id.clear();
        for item in items {
            let key = item.key();
            if self.by_id.contains_key(&key) {
                tracing::warn!("dropping duplicate entity id {key}");
                continue;
            }
            self.by_id.insert(key, item.clone());
            self.list.push(item);
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        if !self.by_id.contains_key(key) {
            return None;
        }
        self.list.iter().position(|x| x.key() == key)
    }
}

impl<T: Entity + PartialEq> NormalizedCollection<T> {
    /// Both views hold the same set of ids with identical field values.
    pub fn is_consistent(&self) -> bool {
        self.list.len() == self.by_id.len()
            && self
                .list
                .iter()
                .all(|item| self.by_id.get(&item.key()) == Some(item))
    }
}

impl<'a, T: Entity> IntoIterator for &'a NormalizedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Entity + PartialEq> PartialEq for NormalizedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.list == other.list
    }
}

// Only the list is persisted; the map is a derived view.
impl<T: Entity + Serialize> Serialize for NormalizedCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.list.serialize(serializer)
    }
}

impl<'de, T: Entity + Deserialize<'de>> Deserialize<'de> for NormalizedCollection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u32,
        label: String,
    }

    impl Entity for Item {
        fn key(&self) -> String {
            self.id.to_string()
        }
    }

    fn item(id: u32, label: &str) -> Item {
        Item {
            id,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_insert_front_prepends_and_indexes() {
        let mut c = NormalizedCollection::new();
        c.insert_front(item(1, "a"));
        c.insert_front(item(2, "b"));

        let ids: Vec<u32> = c.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(c.get("1").unwrap().label, "a");
        assert!(c.is_consistent());
    }

    #[test]
    fn test_insert_front_with_existing_id_moves_it() {
        let mut c = NormalizedCollection::from_vec(vec![item(1, "a"), item(2, "b")]);
        c.insert_front(item(2, "b2"));

        let ids: Vec<u32> = c.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(c.get("2").unwrap().label, "b2");
        assert!(c.is_consistent());
    }

    #[test]
    fn test_update_patches_both_views() {
        let mut c = NormalizedCollection::from_vec(vec![item(1, "a"), item(2, "b")]);
        assert!(c.update("2", |i| i.label = "patched".to_string()));

        assert_eq!(c.as_slice()[1].label, "patched");
        assert_eq!(c.get("2").unwrap().label, "patched");
        assert!(c.is_consistent());
    }

    #[test]
    fn test_update_missing_is_a_no_op() {
        let mut c = NormalizedCollection::from_vec(vec![item(1, "a")]);
        assert!(!c.update("9", |i| i.label = "x".to_string()));
        assert_eq!(c, NormalizedCollection::from_vec(vec![item(1, "a")]));
    }

    #[test]
    fn test_upsert_replaces_in_place_or_appends() {
        let mut c = NormalizedCollection::from_vec(vec![item(1, "a"), item(2, "b")]);
        c.upsert(item(1, "a2"));
        c.upsert(item(3, "c"));

        let labels: Vec<&str> = c.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["a2", "b", "c"]);
        assert!(c.is_consistent());
    }

    #[test]
    fn test_remove_drops_from_both_views() {
        let mut c = NormalizedCollection::from_vec(vec![item(1, "a"), item(2, "b")]);
        assert_eq!(c.remove("1"), Some(item(1, "a")));
        assert_eq!(c.remove("1"), None);
        assert!(c.get("1").is_none());
        assert_eq!(c.len(), 1);
        assert!(c.is_consistent());
    }

    #[test]
    fn test_replace_all_rebuilds_map_without_orphans() {
        let mut c = NormalizedCollection::from_vec(vec![item(1, "a"), item(2, "b")]);
        c.replace_all(vec![item(3, "c")]);
        assert!(c.get("1").is_none());
        assert!(c.get("3").is_some());
        assert!(c.is_consistent());
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let c = NormalizedCollection::from_vec(vec![item(1, "a"), item(1, "dup")]);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("1").unwrap().label, "a");
        assert!(c.is_consistent());
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let c = NormalizedCollection::from_vec(vec![item(2, "b"), item(1, "a")]);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"[{"id":2,"label":"b"},{"id":1,"label":"a"}]"#);

        let back: NormalizedCollection<Item> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert!(back.is_consistent());
    }
}
