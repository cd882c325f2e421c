//! Defines the [`Collection`] trait, the registry that index views are added
//! to, and [`Views`], a simple keyed implementation.

use std::collections::btree_map::{self, BTreeMap};

/// A registry of views keyed by path. Inserting under an existing key
/// replaces the previous entry.
pub trait Collection<V> {
    fn insert(&mut self, key: String, view: V);
}

/// A [`Collection`] backed by a [`BTreeMap`], so iteration is ordered by key.
#[derive(Clone, Debug)]
pub struct Views<V> {
    views: BTreeMap<String, V>,
}

impl<V> Views<V> {
    pub fn new() -> Views<V> {
        Views {
            views: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.views.get(key)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, V> {
        self.views.iter()
    }
}

impl<V> Default for Views<V> {
    fn default() -> Self {
        Views::new()
    }
}

impl<V> Collection<V> for Views<V> {
    fn insert(&mut self, key: String, view: V) {
        self.views.insert(key, view);
    }
}

impl<'a, V> IntoIterator for &'a Views<V> {
    type Item = (&'a String, &'a V);
    type IntoIter = btree_map::Iter<'a, String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.views.iter()
    }
}
