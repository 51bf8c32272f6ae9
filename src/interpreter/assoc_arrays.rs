//! Array Storage
//!
//! Indexed and associative arrays. Both keep their entries in an
//! `IndexMap` so `${!assoc[@]}` reports keys in insertion order; indexed
//! arrays are read back sorted by numeric index.

use std::collections::HashMap;

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Indexed,
    Associative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShellArray {
    pub kind: ArrayKind,
    entries: IndexMap<String, String>,
}

impl ShellArray {
    pub fn new(kind: ArrayKind) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    /// Indexed array holding `values` at 0..n
    pub fn from_values(values: Vec<String>) -> Self {
        let mut array = Self::new(ArrayKind::Indexed);
        for (i, v) in values.into_iter().enumerate() {
            array.entries.insert(i.to_string(), v);
        }
        array
    }

    pub fn is_associative(&self) -> bool {
        self.kind == ArrayKind::Associative
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalise an indexed key (`"+03"` -> `"3"`); negative indices count
    /// back from one past the highest index.
    fn indexed_key(&self, key: &str) -> Option<String> {
        let idx: i64 = key.trim().parse().ok()?;
        if idx >= 0 {
            return Some(idx.to_string());
        }
        let next = self.next_index();
        let resolved = next + idx;
        if resolved < 0 {
            None
        } else {
            Some(resolved.to_string())
        }
    }

    fn key_for(&self, key: &str) -> Option<String> {
        match self.kind {
            ArrayKind::Associative => Some(key.to_string()),
            ArrayKind::Indexed => self.indexed_key(key),
        }
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        let key = self.key_for(key)?;
        self.entries.get(&key)
    }

    /// Set an element; returns false when an indexed key is not a valid index
    pub fn set(&mut self, key: &str, value: String) -> bool {
        match self.key_for(key) {
            Some(key) => {
                self.entries.insert(key, value);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let key = self.key_for(key)?;
        self.entries.shift_remove(&key)
    }

    /// One past the highest index of an indexed array
    pub fn next_index(&self) -> i64 {
        self.entries
            .keys()
            .filter_map(|k| k.parse::<i64>().ok())
            .max()
            .map_or(0, |m| m + 1)
    }

    /// Append at the next free index (`arr+=(x)`)
    pub fn push(&mut self, value: String) {
        let idx = self.next_index();
        self.entries.insert(idx.to_string(), value);
    }

    /// Keys in presentation order
    pub fn keys(&self) -> Vec<String> {
        match self.kind {
            ArrayKind::Associative => self.entries.keys().cloned().collect(),
            ArrayKind::Indexed => {
                let mut keys: Vec<i64> = self.entries.keys().filter_map(|k| k.parse().ok()).collect();
                keys.sort_unstable();
                keys.into_iter().map(|k| k.to_string()).collect()
            }
        }
    }

    /// Values in presentation order
    pub fn values(&self) -> Vec<String> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.entries.get(&k).cloned())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// All arrays of one shell, by name
#[derive(Debug, Clone, Default)]
pub struct AssocArrayManager {
    arrays: HashMap<String, ShellArray>,
}

impl AssocArrayManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ShellArray> {
        self.arrays.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ShellArray> {
        self.arrays.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    pub fn is_associative(&self, name: &str) -> bool {
        self.arrays.get(name).map_or(false, |a| a.is_associative())
    }

    /// Declare an array, keeping existing contents when the kind matches
    pub fn declare(&mut self, name: &str, kind: ArrayKind) -> &mut ShellArray {
        let replace = self.arrays.get(name).map_or(true, |a| a.kind != kind);
        if replace {
            self.arrays.insert(name.to_string(), ShellArray::new(kind));
        }
        self.arrays
            .entry(name.to_string())
            .or_insert_with(|| ShellArray::new(kind))
    }

    /// Get an array, creating an indexed one on first element assignment
    pub fn get_or_create(&mut self, name: &str) -> &mut ShellArray {
        self.arrays
            .entry(name.to_string())
            .or_insert_with(|| ShellArray::new(ArrayKind::Indexed))
    }

    pub fn insert(&mut self, name: &str, array: ShellArray) {
        self.arrays.insert(name.to_string(), array);
    }

    pub fn remove(&mut self, name: &str) -> Option<ShellArray> {
        self.arrays.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.arrays.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_sparse_order() {
        let mut a = ShellArray::new(ArrayKind::Indexed);
        a.set("5", "five".into());
        a.set("1", "one".into());
        a.push("six".into());
        assert_eq!(a.keys(), vec!["1", "5", "6"]);
        assert_eq!(a.values(), vec!["one", "five", "six"]);
        assert_eq!(a.get("-1").map(String::as_str), Some("six"));
        assert!(!a.set("abc", "x".into()));
    }

    #[test]
    fn test_associative_insertion_order() {
        let mut a = ShellArray::new(ArrayKind::Associative);
        a.set("zebra", "1".into());
        a.set("apple", "2".into());
        a.set("mango", "3".into());
        assert_eq!(a.keys(), vec!["zebra", "apple", "mango"]);
        a.remove("apple");
        assert_eq!(a.keys(), vec!["zebra", "mango"]);
    }

    #[test]
    fn test_manager_declare_replaces_kind() {
        let mut m = AssocArrayManager::new();
        m.get_or_create("a").set("0", "x".into());
        m.declare("a", ArrayKind::Indexed);
        assert_eq!(m.get("a").map(|a| a.len()), Some(1));
        m.declare("a", ArrayKind::Associative);
        assert!(m.is_associative("a"));
        assert!(m.get("a").map_or(false, |a| a.is_empty()));
    }
}
