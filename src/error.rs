//! Error types for the autocompleter engine

use thiserror::Error;

/// Main error type for the autocompleter engine
#[derive(Debug, Error)]
pub enum Error {
    /// Any Redis I/O failure. Never retried internally; the caller drives retries.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Payload or cache-entry (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// store()/remove() addressed at a provider name with no registration.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// suggest()/exact_suggest() addressed at an autocompleter name with no registration.
    #[error("Unknown autocompleter: {0}")]
    UnknownAutocompleter(String),

    /// A facet expression failed shape validation (see `facet::validate`).
    #[error("Invalid facet expression: {0}")]
    InvalidFacetExpression(String),

    /// Missing or invalid required setting, detected at registration/build time.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Escape hatch for conditions that don't fit the other variants.
    #[error("{0}")]
    Other(String),
}

/// Result type alias for autocompleter operations
pub type Result<T> = std::result::Result<T, Error>;
