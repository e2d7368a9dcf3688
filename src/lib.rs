//! keyed-map: an insertion-ordered map that treats structurally equal keys
//! as the same key by comparing a caller-supplied canonical string form.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: let composite keys (tuples, vectors, structs) that are distinct
//!   values but "the same key" share one entry, while every read path still
//!   reports the original key object rather than its canonical string.
//! - Layers:
//!   - OrderedHashMap<K, V, S>: structural map over `SlotMap` storage with
//!     a `HashTable` index; entries form an intrusive linked list so
//!     iteration follows first-insertion order and removal is O(1).
//!   - KeyedMap<K, V, C, S>: public façade. Canonicalizes each key argument
//!     with `C`, stores `(original key, value)` under the canonical string,
//!     and unwraps that pair on the way out.
//!
//! Constraints
//! - Composition, not inheritance: the table is a private field, so no
//!   method can reach it with a raw canonical key.
//! - Overwrites replace the value and the retained original key, and keep
//!   the entry's position.
//! - A missing key is `None`; a duplicate key is an overwrite. Neither is
//!   an error.
//! - Canonicalizer failures propagate untouched from the `try_*` method
//!   that triggered them; infallible methods exist only for canonicalizers
//!   whose error type is `Infallible`.
//!
//! Hasher and rehashing invariants
//! - Each entry stores a precomputed `u64` hash of its canonical string and
//!   the index always uses the stored hash; nothing is rehashed on growth.
//!
//! Notes and non-goals
//! - No check that the canonicalizer is injective or deterministic;
//!   colliding keys merge.
//! - A key whose canonical form changes after insertion (through interior
//!   mutability) leaves an entry reachable only by its old form.
//! - No internal synchronization; share across threads behind a lock.
//! - Public API surface is `KeyedMap`, its iterators, `Canonicalize` and
//!   its stock implementations, `KeyedMapBuilder` and `KeyedMapError`.

mod builder;
mod canonicalize;
mod error;
mod keyed_map;
mod ordered_hash_map;
mod ordered_hash_map_proptest;

// Public surface
pub use builder::KeyedMapBuilder;
#[cfg(feature = "json")]
pub use canonicalize::Json;
pub use canonicalize::{Canonicalize, DebugRepr, TryFn};
pub use error::KeyedMapError;
pub use keyed_map::{IntoIter, Iter, KeyedMap, Keys, Values};
