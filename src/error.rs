//! Error types.

/// Errors raised while configuring a [`KeyedMap`](crate::KeyedMap).
///
/// Lookups never fail with this type: a missing key is `None`, and
/// canonicalizer failures surface as the canonicalizer's own error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeyedMapError {
    /// A required constructor argument was missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
