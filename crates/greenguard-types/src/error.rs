//! Error types for data parsing in greenguard-types.

use thiserror::Error;

/// Errors that can occur when parsing or validating environmental data.
///
/// This error type is transport-agnostic and does not include network
/// errors (those belong in greenguard-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A field holds a value outside its valid range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A user type string did not match any known rider category.
    #[error("Unknown user type '{0}' (expected child, elderly, sensitive or normal)")]
    UnknownUserType(String),

    /// A pollutant name did not match any classified pollutant.
    #[error("Unknown pollutant '{0}'")]
    UnknownPollutant(String),
}

/// Result type alias using greenguard-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
