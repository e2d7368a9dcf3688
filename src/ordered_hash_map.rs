//! OrderedHashMap: structural layer that keeps entries in first-insertion order.
//!
//! Storage is a `SlotMap` of entries threaded on an intrusive doubly-linked
//! list; a `HashTable` of slot keys indexes them by the precomputed hash.
//! Unlinking is O(1), so removal never disturbs the order of survivors.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use hashbrown::{hash_table, HashTable};
use slotmap::{DefaultKey, SlotMap};

#[derive(Debug, Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

#[derive(Clone)]
pub(crate) struct OrderedHashMap<K, V, S> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>, // storage using generational keys
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

/// Iterator over entries in insertion order.
pub(crate) struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    front: Option<DefaultKey>,
    back: Option<DefaultKey>,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let e = self.slots.get(self.front?)?;
        self.front = e.next;
        self.remaining -= 1;
        Some((&e.key, &e.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let e = self.slots.get(self.back?)?;
        self.back = e.prev;
        self.remaining -= 1;
        Some((&e.key, &e.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Owning iterator in insertion order.
///
/// Entries are detached from storage as they are yielded; once storage is
/// empty both cursors are dead, so stale neighbour links are never followed.
pub(crate) struct IntoIter<K, V> {
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    front: Option<DefaultKey>,
    back: Option<DefaultKey>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.slots.is_empty() {
            return None;
        }
        let e = self.slots.remove(self.front?)?;
        self.front = e.next;
        Some((e.key, e.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.slots.len(), Some(self.slots.len()))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.slots.is_empty() {
            return None;
        }
        let e = self.slots.remove(self.back?)?;
        self.back = e.prev;
        Some((e.key, e.value))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K, V, S> IntoIterator for OrderedHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            slots: self.slots,
            front: self.head,
            back: self.tail,
        }
    }
}

impl<K, V, S> OrderedHashMap<K, V, S> {
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            slots: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn front(&self) -> Option<(&K, &V)> {
        self.head
            .and_then(|k| self.slots.get(k))
            .map(|e| (&e.key, &e.value))
    }

    pub(crate) fn back(&self) -> Option<(&K, &V)> {
        self.tail
            .and_then(|k| self.slots.get(k))
            .map(|e| (&e.key, &e.value))
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            front: self.head,
            back: self.tail,
            remaining: self.slots.len(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keeps only the entries for which `keep` returns true. Survivors keep
    /// their relative order.
    pub(crate) fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut cursor = self.head;
        while let Some(k) = cursor {
            let Some(e) = self.slots.get_mut(k) else {
                break;
            };
            cursor = e.next;
            if !keep(&e.key, &mut e.value) {
                let _ = self.remove_slot(k);
            }
        }
    }

    fn remove_slot(&mut self, k: DefaultKey) -> Option<(K, V)> {
        // Remove slot
        let entry = self.slots.remove(k)?;

        // Unlink from index via occupied entry removal
        if let Ok(found) = self.index.find_entry(entry.hash, |&kk| kk == k) {
            found.remove();
        }

        // Stitch neighbours together
        match entry.prev {
            Some(p) => {
                if let Some(pe) = self.slots.get_mut(p) {
                    pe.next = entry.next;
                }
            }
            None => self.head = entry.next,
        }
        match entry.next {
            Some(n) => {
                if let Some(ne) = self.slots.get_mut(n) {
                    ne.prev = entry.prev;
                }
            }
            None => self.tail = entry.prev,
        }

        Some((entry.key, entry.value))
    }
}

impl<K, V, S> OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn find_slot<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.key.borrow() == q)
                    .unwrap_or(false)
            })
            .copied()
    }

    pub(crate) fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_slot(q).is_some()
    }

    pub(crate) fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let k = self.find_slot(q)?;
        self.slots.get(k).map(|e| &e.value)
    }

    pub(crate) fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let k = self.find_slot(q)?;
        self.slots.get_mut(k).map(|e| &mut e.value)
    }

    /// Inserts `value` under `key`, or replaces the value of an existing
    /// entry in place. A replaced entry keeps its stored key and its
    /// position; the previous value is returned.
    pub(crate) fn insert_or_replace(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hash_table::Entry::Occupied(o) => {
                let k = *o.get();
                self.slots
                    .get_mut(k)
                    .map(|e| core::mem::replace(&mut e.value, value))
            }
            hash_table::Entry::Vacant(v) => {
                let tail = self.tail;
                let k = self.slots.insert(Entry {
                    key,
                    value,
                    hash,
                    prev: tail,
                    next: None,
                });
                let _ = v.insert(k);
                match tail.and_then(|t| self.slots.get_mut(t)) {
                    Some(te) => te.next = Some(k),
                    None => self.head = Some(k),
                }
                self.tail = Some(k);
                None
            }
        }
    }

    pub(crate) fn remove_key<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let k = self.find_slot(q)?;
        self.remove_slot(k)
    }
}
