//! Builder for configuring a `KeyedMap` before construction.

use crate::canonicalize::Canonicalize;
use crate::error::KeyedMapError;
use crate::keyed_map::KeyedMap;
use core::fmt;
use core::marker::PhantomData;
use std::collections::hash_map::RandomState;

/// Builder for [`KeyedMap`].
///
/// The canonicalizer is mandatory; `build` reports its absence as
/// [`KeyedMapError::InvalidArgument`] instead of deferring the failure to
/// the first lookup. Capacity and hasher are optional.
pub struct KeyedMapBuilder<K, V, C, S = RandomState> {
    canonicalizer: Option<C>,
    capacity: usize,
    hasher: S,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, C> KeyedMapBuilder<K, V, C> {
    pub fn new() -> Self {
        Self {
            canonicalizer: None,
            capacity: 0,
            hasher: RandomState::new(),
            _marker: PhantomData,
        }
    }
}

impl<K, V, C> Default for KeyedMapBuilder<K, V, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C, S> KeyedMapBuilder<K, V, C, S> {
    /// Sets the function that maps keys to their canonical string.
    pub fn canonicalizer(mut self, canonicalizer: C) -> Self {
        self.canonicalizer = Some(canonicalizer);
        self
    }

    /// Reserves room for at least `capacity` entries up front.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Replaces the hasher used for canonical strings.
    pub fn hasher<S2>(self, hasher: S2) -> KeyedMapBuilder<K, V, C, S2> {
        KeyedMapBuilder {
            canonicalizer: self.canonicalizer,
            capacity: self.capacity,
            hasher,
            _marker: PhantomData,
        }
    }

    pub fn build(self) -> Result<KeyedMap<K, V, C, S>, KeyedMapError>
    where
        C: Canonicalize<K>,
    {
        let Some(canonicalizer) = self.canonicalizer else {
            tracing::debug!(capacity = self.capacity, "keyed map builder has no canonicalizer");
            return Err(KeyedMapError::InvalidArgument(
                "a canonicalization function is required",
            ));
        };
        Ok(KeyedMap::with_capacity_and_hasher(
            canonicalizer,
            self.capacity,
            self.hasher,
        ))
    }
}

impl<K, V, C, S> fmt::Debug for KeyedMapBuilder<K, V, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedMapBuilder")
            .field("has_canonicalizer", &self.canonicalizer.is_some())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
