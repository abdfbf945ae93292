use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::CanonicalKey;

/// Insertion-ordered set whose members are identified by a canonical string.
///
/// Membership, insertion and removal all go through `key_fn`; two values with
/// the same key are the same member no matter how they were built.
pub struct StringySet<T, F = fn(&T) -> String> {
    key_fn: F,
    next_seq: u64,
    entries: BTreeMap<u64, (String, T)>,
    index: HashMap<String, u64>,
}

impl<T: CanonicalKey> StringySet<T> {
    pub fn new() -> Self {
        Self::with_key_fn(<T as CanonicalKey>::canonical_key as fn(&T) -> String)
    }
}

impl<T: CanonicalKey> Default for StringySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, F> StringySet<T, F>
where
    F: Fn(&T) -> String,
{
    pub fn with_key_fn(key_fn: F) -> Self {
        Self {
            key_fn,
            next_seq: 0,
            entries: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Insert `value` unless a member with the same key exists.
    /// Returns `false` (and keeps the existing member) on a duplicate.
    pub fn add(&mut self, value: T) -> bool {
        let key = (self.key_fn)(&value);
        if self.index.contains_key(&key) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(key.clone(), seq);
        self.entries.insert(seq, (key, value));
        true
    }

    pub fn has(&self, value: &T) -> bool {
        self.has_key(&(self.key_fn)(value))
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Remove the member sharing `value`'s key. Returns whether one was removed.
    pub fn delete(&mut self, value: &T) -> bool {
        let key = (self.key_fn)(value);
        self.delete_key(&key)
    }

    pub fn delete_key(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(seq) => {
                self.entries.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Number of members (the set's size).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.values().map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.values().map(|(key, _)| key.as_str())
    }

    /// New set holding the members for which `predicate` is true.
    pub fn filter<P>(&self, mut predicate: P) -> StringySet<T, F>
    where
        T: Clone,
        F: Clone,
        P: FnMut(&T) -> bool,
    {
        let mut out = StringySet::with_key_fn(self.key_fn.clone());
        for value in self.iter().filter(|v| predicate(*v)) {
            out.add(value.clone());
        }
        out
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T, F> Extend<T> for StringySet<T, F>
where
    F: Fn(&T) -> String,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<T: CanonicalKey> FromIterator<T> for StringySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = StringySet::new();
        set.extend(iter);
        set
    }
}

impl<T, F> IntoIterator for StringySet<T, F> {
    type Item = T;
    type IntoIter = std::iter::Map<
        std::collections::btree_map::IntoValues<u64, (String, T)>,
        fn((String, T)) -> T,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .into_values()
            .map((|(_, value)| value) as fn((String, T)) -> T)
    }
}

impl<T: fmt::Debug, F> fmt::Debug for StringySet<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.entries.values().map(|(_, value)| value))
            .finish()
    }
}
