//! Error types for citydex.
//!
//! All user-facing failures are ordinary result values so callers can
//! branch on them. A divergence between the two indexes is never reported
//! through this enum; that is a broken internal invariant and panics.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CitydexError>;

/// Recoverable, expected failure kinds of normal operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CitydexError {
    /// A city with the same name already exists.
    #[error("a city named '{0}' already exists")]
    DuplicateName(String),

    /// A city with the same coordinate already exists.
    #[error("a city already exists at ({0}, {1})")]
    DuplicateCoordinate(f64, f64),

    /// No city matched the given key.
    #[error("city not found: {0}")]
    NotFound(String),

    /// A query that requires at least one city ran against an empty map.
    #[error("the map contains no cities")]
    EmptyIndex,

    /// The coordinate lies outside the configured map bounds.
    #[error("coordinate ({0}, {1}) lies outside the map bounds")]
    OutOfBounds(f64, f64),

    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
