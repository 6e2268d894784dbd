use indexmap::IndexMap;
use indexmap::map::Entry;

/// Ordered map whose keys compare ASCII-case-insensitively.
///
/// The spelling used the first time a key is inserted is the one reported by
/// iteration. Re-inserting an existing key replaces the value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Mash<V> {
    inner: IndexMap<String, (String, V)>,
}

impl<V> Default for Mash<V> {
    fn default() -> Self {
        Mash {
            inner: IndexMap::new(),
        }
    }
}

fn fold(key: &str) -> String {
    key.to_ascii_lowercase()
}

impl<V> Mash<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.inner.entry(fold(&key)) {
            Entry::Occupied(mut e) => Some(std::mem::replace(&mut e.get_mut().1, value)),
            Entry::Vacant(e) => {
                e.insert((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.inner.get(&fold(key)).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.inner.get_mut(&fold(key)).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(&fold(key))
    }

    /// Removes a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.inner.shift_remove(&fold(key)).map(|(_, v)| v)
    }

    pub fn get_or_insert_with<F>(&mut self, key: impl Into<String>, f: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let key = key.into();
        let (_, v) = self
            .inner
            .entry(fold(&key))
            .or_insert_with(|| (key, f()));
        v
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.inner.values().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.values().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<V: Clone> Mash<V> {
    /// Returns a copy of `self` overlaid with `other`; values from `other` win.
    pub fn merge(&self, other: &Mash<V>) -> Mash<V> {
        let mut merged = self.clone();
        for (k, v) in other.iter() {
            merged.insert(k, v.clone());
        }
        merged
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Mash<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mash = Mash::new();
        mash.extend(iter);
        mash
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for Mash<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<V> IntoIterator for Mash<V> {
    type Item = (String, V);
    type IntoIter = indexmap::map::IntoValues<String, (String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_values()
    }
}
