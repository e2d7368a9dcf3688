//! Canonicalization: turning a key into the string a `KeyedMap` looks up by.
//!
//! Two keys are the same map key exactly when their canonical strings are
//! equal. The map never checks that a canonicalizer is injective or
//! deterministic; keys that collide merge into one entry, and a
//! canonicalizer that answers differently for equal input leaves entries
//! that can no longer be found.

use core::convert::Infallible;
use core::fmt;
use core::marker::PhantomData;

/// Maps a key to its canonical string form.
///
/// Any `Fn(&K) -> String` is a canonicalizer with `Error = Infallible`.
/// Fallible functions go through [`TryFn`].
pub trait Canonicalize<K: ?Sized> {
    /// Error reported for keys that have no canonical form.
    type Error;

    fn canonicalize(&self, key: &K) -> Result<String, Self::Error>;
}

impl<K, F> Canonicalize<K> for F
where
    K: ?Sized,
    F: Fn(&K) -> String,
{
    type Error = Infallible;

    #[inline]
    fn canonicalize(&self, key: &K) -> Result<String, Infallible> {
        Ok(self(key))
    }
}

/// Adapts a fallible `Fn(&K) -> Result<String, E>` into a canonicalizer.
///
/// Errors reach the caller of the map operation untouched.
pub struct TryFn<F, E> {
    f: F,
    _err: PhantomData<fn() -> E>,
}

impl<F, E> TryFn<F, E> {
    pub fn new<K>(f: F) -> Self
    where
        K: ?Sized,
        F: Fn(&K) -> Result<String, E>,
    {
        Self {
            f,
            _err: PhantomData,
        }
    }
}

impl<F: Clone, E> Clone for TryFn<F, E> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _err: PhantomData,
        }
    }
}

impl<F, E> fmt::Debug for TryFn<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryFn").finish_non_exhaustive()
    }
}

impl<K, F, E> Canonicalize<K> for TryFn<F, E>
where
    K: ?Sized,
    F: Fn(&K) -> Result<String, E>,
{
    type Error = E;

    #[inline]
    fn canonicalize(&self, key: &K) -> Result<String, E> {
        (self.f)(key)
    }
}

/// Canonical form is the key's `Debug` rendering.
///
/// Handy for tuples and derived types; two keys with the same `Debug`
/// output are one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugRepr;

impl<K> Canonicalize<K> for DebugRepr
where
    K: fmt::Debug + ?Sized,
{
    type Error = Infallible;

    fn canonicalize(&self, key: &K) -> Result<String, Infallible> {
        Ok(format!("{key:?}"))
    }
}

/// Canonical form is the key's compact JSON encoding (`serde_json`).
///
/// Sequences of numbers encode as `[4,20]`; struct fields encode in
/// declaration order. Serialization errors (e.g. maps with non-string
/// keys) are returned as `serde_json::Error`.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json;

#[cfg(feature = "json")]
impl<K> Canonicalize<K> for Json
where
    K: serde::Serialize + ?Sized,
{
    type Error = serde_json::Error;

    fn canonicalize(&self, key: &K) -> Result<String, serde_json::Error> {
        serde_json::to_string(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: Any `Fn(&K) -> String` canonicalizes without error.
    #[test]
    fn closures_are_infallible_canonicalizers() {
        let c = |k: &(i32, i32)| format!("{}:{}", k.0, k.1);
        assert_eq!(c.canonicalize(&(4, 20)), Ok("4:20".to_string()));
    }

    /// Invariant: `DebugRepr` yields exactly the `Debug` rendering.
    #[test]
    fn debug_repr_uses_debug_output() {
        assert_eq!(DebugRepr.canonicalize(&(1, -2)), Ok("(1, -2)".to_string()));
        assert_eq!(DebugRepr.canonicalize("a"), Ok("\"a\"".to_string()));
    }

    /// Invariant: `TryFn` returns the wrapped function's error unchanged.
    #[test]
    fn try_fn_passes_errors_through() {
        #[derive(Debug, PartialEq)]
        struct Negative(i64);

        let c = TryFn::new(|k: &i64| {
            if *k < 0 {
                Err(Negative(*k))
            } else {
                Ok(k.to_string())
            }
        });
        assert_eq!(c.canonicalize(&7i64), Ok("7".to_string()));
        assert_eq!(c.canonicalize(&-3i64), Err(Negative(-3)));
    }

    /// Invariant: `Json` produces compact encodings and reports keys JSON
    /// cannot represent.
    #[cfg(feature = "json")]
    #[test]
    fn json_matches_compact_encoding() {
        assert_eq!(Json.canonicalize(&[4, 20]).unwrap(), "[4,20]");
        assert_eq!(Json.canonicalize(&vec![900, 1]).unwrap(), "[900,1]");
        assert_eq!(Json.canonicalize(&(2, -1)).unwrap(), "[2,-1]");

        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), 3);
        assert!(Json.canonicalize(&bad).is_err());
    }
}
