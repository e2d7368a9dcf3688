//! KeyedMap: public façade that canonicalizes keys and hands back originals.

use crate::canonicalize::Canonicalize;
use crate::ordered_hash_map::{self, OrderedHashMap};
use core::convert::Infallible;
use core::fmt;
use core::hash::BuildHasher;
use core::iter::FusedIterator;
use std::collections::hash_map::RandomState;

// Stored pair: the original key as last supplied, and its value.
#[derive(Clone)]
struct Slot<K, V> {
    key: K,
    value: V,
}

/// An insertion-ordered map whose keys are compared by canonical string.
///
/// Every operation runs its key argument through the canonicalizer `C` and
/// looks the result up in an internal table. The entry remembers the
/// original key object from the most recent insert, and every read path
/// (`get_key_value`, iteration, `for_each`) reports that original key, not
/// the canonical string.
///
/// Iteration follows the order in which canonical keys were first inserted;
/// overwriting an existing key does not move it.
#[derive(Clone)]
pub struct KeyedMap<K, V, C, S = RandomState> {
    canonicalizer: C,
    store: OrderedHashMap<String, Slot<K, V>, S>,
}

#[inline]
fn infallible<T>(r: Result<T, Infallible>) -> T {
    match r {
        Ok(v) => v,
        Err(never) => match never {},
    }
}

impl<K, V, C> KeyedMap<K, V, C>
where
    C: Canonicalize<K>,
{
    pub fn new(canonicalizer: C) -> Self {
        Self::with_capacity_and_hasher(canonicalizer, 0, RandomState::new())
    }

    pub fn with_capacity(canonicalizer: C, capacity: usize) -> Self {
        Self::with_capacity_and_hasher(canonicalizer, capacity, RandomState::new())
    }

    /// Builds a map from `pairs`, inserting them in order.
    ///
    /// Pairs whose keys share a canonical form collapse into one entry
    /// holding the last pair's key and value. Stops at the first key the
    /// canonicalizer rejects and returns that error.
    pub fn try_from_pairs<I>(canonicalizer: C, pairs: I) -> Result<Self, C::Error>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new(canonicalizer);
        map.try_extend(pairs)?;
        Ok(map)
    }
}

impl<K, V, C> KeyedMap<K, V, C>
where
    C: Canonicalize<K, Error = Infallible>,
{
    /// Infallible form of [`try_from_pairs`](Self::try_from_pairs).
    pub fn from_pairs<I>(canonicalizer: C, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        infallible(Self::try_from_pairs(canonicalizer, pairs))
    }
}

impl<K, V, C, S> KeyedMap<K, V, C, S>
where
    C: Canonicalize<K>,
{
    pub fn with_hasher(canonicalizer: C, hasher: S) -> Self {
        Self::with_capacity_and_hasher(canonicalizer, 0, hasher)
    }

    pub fn with_capacity_and_hasher(canonicalizer: C, capacity: usize, hasher: S) -> Self {
        tracing::trace!(capacity, "keyed map created");
        Self {
            canonicalizer,
            store: OrderedHashMap::with_capacity_and_hasher(capacity, hasher),
        }
    }
}

impl<K, V, C, S> KeyedMap<K, V, C, S> {
    /// Number of distinct canonical keys stored.
    pub fn len(&self) -> usize {
        self.store.len()
    }
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn canonicalizer(&self) -> &C {
        &self.canonicalizer
    }

    /// Entries as `(original key, value)` in insertion order.
    ///
    /// Each call starts a fresh traversal of the current contents.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.store.iter(),
        }
    }

    /// Original keys in insertion order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Values in insertion order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// The oldest entry.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.store.front().map(|(_, slot)| (&slot.key, &slot.value))
    }

    /// The most recently added entry. Overwrites do not count as additions.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.store.back().map(|(_, slot)| (&slot.key, &slot.value))
    }

    /// Calls `f(value, original_key, map)` for each entry in order.
    ///
    /// The map is passed back so the callback can consult other entries;
    /// any extra context is captured by the closure.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&V, &K, &Self),
    {
        for (key, value) in self.iter() {
            f(value, key, self);
        }
    }

    pub fn clear(&mut self) {
        tracing::trace!(dropped = self.store.len(), "keyed map cleared");
        self.store.clear();
    }

    /// Keeps only the entries for which `keep(original_key, value)` is true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.store.retain(|_, slot| keep(&slot.key, &mut slot.value));
    }
}

impl<K, V, C, S> KeyedMap<K, V, C, S>
where
    C: Canonicalize<K>,
    S: BuildHasher,
{
    /// Inserts `value` under the canonical form of `key`.
    ///
    /// When the canonical key is already present, both the value and the
    /// retained original key are replaced and the displaced pair is
    /// returned; the entry keeps its position. Canonicalizer errors are
    /// returned unchanged and leave the map untouched.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<(K, V)>, C::Error> {
        let canonical = self.canonicalizer.canonicalize(&key)?;
        Ok(self
            .store
            .insert_or_replace(canonical, Slot { key, value })
            .map(|old| (old.key, old.value)))
    }

    pub fn try_get(&self, key: &K) -> Result<Option<&V>, C::Error> {
        Ok(self.try_get_key_value(key)?.map(|(_, v)| v))
    }

    /// Looks up `key` and returns the retained original key with its value.
    pub fn try_get_key_value(&self, key: &K) -> Result<Option<(&K, &V)>, C::Error> {
        let canonical = self.canonicalizer.canonicalize(key)?;
        Ok(self
            .store
            .get(canonical.as_str())
            .map(|slot| (&slot.key, &slot.value)))
    }

    pub fn try_get_mut(&mut self, key: &K) -> Result<Option<&mut V>, C::Error> {
        let canonical = self.canonicalizer.canonicalize(key)?;
        Ok(self
            .store
            .get_mut(canonical.as_str())
            .map(|slot| &mut slot.value))
    }

    pub fn try_contains_key(&self, key: &K) -> Result<bool, C::Error> {
        let canonical = self.canonicalizer.canonicalize(key)?;
        Ok(self.store.contains_key(canonical.as_str()))
    }

    pub fn try_remove(&mut self, key: &K) -> Result<Option<V>, C::Error> {
        Ok(self.try_remove_entry(key)?.map(|(_, v)| v))
    }

    /// Removes `key` and returns the retained original key with its value.
    pub fn try_remove_entry(&mut self, key: &K) -> Result<Option<(K, V)>, C::Error> {
        let canonical = self.canonicalizer.canonicalize(key)?;
        Ok(self
            .store
            .remove_key(canonical.as_str())
            .map(|(_, slot)| (slot.key, slot.value)))
    }

    /// Inserts every pair in order, stopping at the first canonicalizer
    /// error. Pairs before the failing one stay inserted.
    pub fn try_extend<I>(&mut self, pairs: I) -> Result<(), C::Error>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let before = self.len();
        let mut seen = 0usize;
        for (key, value) in pairs {
            self.try_insert(key, value)?;
            seen += 1;
        }
        let added = self.len() - before;
        tracing::debug!(
            pairs = seen,
            added,
            collapsed = seen - added,
            "keyed map extended"
        );
        Ok(())
    }
}

impl<K, V, C, S> KeyedMap<K, V, C, S>
where
    C: Canonicalize<K, Error = Infallible>,
    S: BuildHasher,
{
    /// Inserts `value` under the canonical form of `key`; see
    /// [`try_insert`](Self::try_insert).
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        infallible(self.try_insert(key, value))
    }

    /// Returns the value stored under `key`'s canonical form, or `None`.
    pub fn get(&self, key: &K) -> Option<&V> {
        infallible(self.try_get(key))
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        infallible(self.try_get_key_value(key))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        infallible(self.try_get_mut(key))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        infallible(self.try_contains_key(key))
    }

    /// Removes `key`'s entry; `Some` exactly when an entry was removed.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        infallible(self.try_remove(key))
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        infallible(self.try_remove_entry(key))
    }
}

impl<K, V, C, S> Extend<(K, V)> for KeyedMap<K, V, C, S>
where
    C: Canonicalize<K, Error = Infallible>,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        infallible(self.try_extend(iter))
    }
}

impl<K, V, C, S> FromIterator<(K, V)> for KeyedMap<K, V, C, S>
where
    C: Canonicalize<K, Error = Infallible> + Default,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(C::default(), S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, C, S> fmt::Debug for KeyedMap<K, V, C, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, C, S> IntoIterator for &'a KeyedMap<K, V, C, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, C, S> IntoIterator for KeyedMap<K, V, C, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.store.into_iter(),
        }
    }
}

/// Iterator over `(original key, value)` pairs in insertion order.
pub struct Iter<'a, K, V> {
    inner: ordered_hash_map::Iter<'a, String, Slot<K, V>>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, slot)| (&slot.key, &slot.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner
            .next_back()
            .map(|(_, slot)| (&slot.key, &slot.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over original keys in insertion order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over values in insertion order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Owning iterator over `(original key, value)` pairs in insertion order.
pub struct IntoIter<K, V> {
    inner: ordered_hash_map::IntoIter<String, Slot<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);
    #[inline]
    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next().map(|(_, slot)| (slot.key, slot.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<(K, V)> {
        self.inner.next_back().map(|(_, slot)| (slot.key, slot.value))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonicalize::{DebugRepr, TryFn};
    use std::cell::Cell;
    use std::rc::Rc;

    fn pair_key(k: &(i32, i32)) -> String {
        format!("{},{}", k.0, k.1)
    }

    /// Invariant: Distinct key values with the same canonical form address the
    /// same entry; size counts canonical keys only.
    #[test]
    fn structurally_equal_keys_share_an_entry() {
        let mut m = KeyedMap::new(pair_key as fn(&(i32, i32)) -> String);
        assert_eq!(m.insert((1, 1), "water"), None);
        assert_eq!(m.insert((4, 20), "grass"), None);
        assert_eq!(m.len(), 2);

        let again = (4, 20);
        assert_eq!(m.get(&again), Some(&"grass"));
        assert!(m.contains_key(&(1, 1)));
        assert!(!m.contains_key(&(20, 4)));
        assert_eq!(m.get(&(0, 0)), None);
    }

    /// Invariant: Overwriting replaces both the value and the retained original
    /// key, returns the displaced pair, and keeps the entry's position.
    #[test]
    fn overwrite_replaces_original_key_in_place() {
        // Canonical form ignores the label, so labelled keys collide.
        let canon = |k: &(u8, &'static str)| k.0.to_string();
        let mut m = KeyedMap::new(canon);
        m.insert((1, "first"), 'a');
        m.insert((2, "second"), 'b');

        let displaced = m.insert((1, "replacement"), 'c');
        assert_eq!(displaced, Some(((1, "first"), 'a')));
        assert_eq!(m.len(), 2);
        assert_eq!(m.get_key_value(&(1, "anything")), Some((&(1, "replacement"), &'c')));

        let keys: Vec<_> = m.keys().map(|k| k.1).collect();
        assert_eq!(keys, ["replacement", "second"]);
    }

    /// Invariant: The entry holds the very key object supplied by the last
    /// insert, not a copy rebuilt from the canonical string.
    #[test]
    fn retains_original_key_object() {
        let canon = |k: &Rc<Vec<i32>>| format!("{:?}", k);
        let mut m = KeyedMap::new(canon);
        let first = Rc::new(vec![1, 2]);
        let second = Rc::new(vec![1, 2]);
        m.insert(first.clone(), 1);
        assert!(Rc::ptr_eq(m.keys().next().unwrap(), &first));

        m.insert(second.clone(), 2);
        let (stored, v) = m.get_key_value(&first).unwrap();
        assert!(Rc::ptr_eq(stored, &second));
        assert_eq!(*v, 2);
    }

    /// Invariant: `remove` succeeds once per present key and decrements size.
    #[test]
    fn remove_is_single_shot() {
        let mut m = KeyedMap::new(DebugRepr);
        m.insert(vec![13, 37], "sword");
        m.insert(vec![4, 20], "plant");
        assert_eq!(m.remove(&vec![13, 37]), Some("sword"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.remove(&vec![13, 37]), None);
        assert!(!m.contains_key(&vec![13, 37]));
        assert_eq!(m.remove_entry(&vec![4, 20]), Some((vec![4, 20], "plant")));
        assert!(m.is_empty());
    }

    /// Invariant: `get_mut` edits the stored value in place.
    #[test]
    fn get_mut_updates_value() {
        let mut m = KeyedMap::new(DebugRepr);
        m.insert((0, 0), 1);
        *m.get_mut(&(0, 0)).unwrap() += 41;
        assert_eq!(m.get(&(0, 0)), Some(&42));
        assert!(m.get_mut(&(9, 9)).is_none());
    }

    /// Invariant: `for_each` sees value, original key and the map itself,
    /// in insertion order.
    #[test]
    fn for_each_passes_value_key_and_map() {
        let m = KeyedMap::from_pairs(DebugRepr, [((1, 2), 'x'), ((3, 4), 'y')]);
        let mut seen = Vec::new();
        m.for_each(|v, k, map| {
            assert_eq!(map.len(), 2);
            assert_eq!(map.get(k), Some(v));
            seen.push((*k, *v));
        });
        assert_eq!(seen, [((1, 2), 'x'), ((3, 4), 'y')]);
    }

    /// Invariant: Each traversal reflects the state at the time it starts.
    #[test]
    fn traversals_are_fresh() {
        let mut m = KeyedMap::new(DebugRepr);
        m.insert(1u8, "a");
        assert_eq!(m.iter().count(), 1);
        m.insert(2u8, "b");
        m.remove(&1u8);
        let now: Vec<_> = m.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(now, [(2u8, "b")]);
        let via_ref: Vec<_> = (&m).into_iter().map(|(k, _)| *k).collect();
        assert_eq!(via_ref, [2u8]);
    }

    /// Invariant: `first`/`last` track insertion order, not overwrite order.
    #[test]
    fn first_and_last_follow_insertion() {
        let mut m = KeyedMap::new(DebugRepr);
        assert!(m.first().is_none());
        m.insert('a', 1);
        m.insert('b', 2);
        m.insert('a', 3);
        assert_eq!(m.first(), Some((&'a', &3)));
        assert_eq!(m.last(), Some((&'b', &2)));
    }

    /// Invariant: `retain` filters by original key and value and keeps order.
    #[test]
    fn retain_sees_original_keys() {
        let mut m = KeyedMap::from_pairs(DebugRepr, (0..6).map(|i| ((i, -i), i)));
        m.retain(|k, v| {
            *v += 100;
            k.0 % 2 == 0
        });
        let kept: Vec<_> = m.iter().map(|(k, v)| (k.0, *v)).collect();
        assert_eq!(kept, [(0, 100), (2, 102), (4, 104)]);
    }

    /// Invariant: Canonicalizer errors propagate unchanged and leave the map
    /// untouched.
    #[test]
    fn canonicalizer_errors_propagate() {
        #[derive(Debug, PartialEq)]
        struct Rejected(i32);

        let calls = Cell::new(0);
        let mut m = KeyedMap::new(TryFn::new(|k: &i32| {
            calls.set(calls.get() + 1);
            if *k < 0 {
                Err(Rejected(*k))
            } else {
                Ok(k.to_string())
            }
        }));
        assert_eq!(m.try_insert(1, "one"), Ok(None));
        assert_eq!(m.try_insert(-1, "neg").unwrap_err(), Rejected(-1));
        assert_eq!(m.len(), 1);
        assert_eq!(m.try_get(&-5), Err(Rejected(-5)));
        assert_eq!(m.try_contains_key(&-5), Err(Rejected(-5)));
        assert_eq!(m.try_remove(&-5), Err(Rejected(-5)));
        assert_eq!(m.try_get(&1), Ok(Some(&"one")));
        assert_eq!(m.try_remove(&1), Ok(Some("one")));
        assert_eq!(calls.get(), 7);
    }

    /// Invariant: Bulk construction stops at the first rejected key; earlier
    /// pairs stay applied.
    #[test]
    fn try_extend_stops_at_first_error() {
        let mut m = KeyedMap::new(TryFn::new(|k: &i32| {
            if *k == 3 {
                Err("three")
            } else {
                Ok(k.to_string())
            }
        }));
        let res = m.try_extend([(1, 'a'), (2, 'b'), (3, 'c'), (4, 'd')]);
        assert_eq!(res, Err("three"));
        let keys: Vec<_> = m.keys().copied().collect();
        assert_eq!(keys, [1, 2]);
    }

    /// Invariant: `Debug` renders original keys, not canonical strings.
    #[test]
    fn debug_shows_original_keys() {
        let m = KeyedMap::from_pairs(|k: &(i32, i32)| pair_key(k), [((1, 2), "a")]);
        assert_eq!(format!("{m:?}"), "{(1, 2): \"a\"}");
    }

    /// Invariant: `clear` drops every entry; the map stays usable.
    #[test]
    fn clear_empties_map() {
        let mut m: KeyedMap<_, _, DebugRepr> = [((1, 1), 'a'), ((2, 2), 'b')].into_iter().collect();
        assert_eq!(m.len(), 2);
        m.clear();
        assert!(m.is_empty());
        assert!(m.iter().next().is_none());
        m.insert((3, 3), 'c');
        assert_eq!(m.get(&(3, 3)), Some(&'c'));
    }
}
