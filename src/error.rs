//! # Error Types
//!
//! This module defines error types used throughout the memesmith library.
//!
//! Only some of these ever reach a caller of the matching pipeline. Transport,
//! malformed-response and unknown-template errors are absorbed by the cascade
//! and image errors are absorbed by the renderer; see [`crate::matching`] and
//! [`crate::render`].

use thiserror::Error;

/// Main error type for memesmith operations
#[derive(Debug, Error)]
pub enum MemeError {
    /// Network or service failure talking to a remote collaborator
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body that is not JSON or does not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A template id that does not resolve against the catalog
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// The template catalog could not be fetched
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Image download, decode or encode failure
    #[error("Image error: {0}")]
    Image(String),

    /// Caller supplied input that violates a precondition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote captioning endpoint rejected the request
    #[error("Captioning error: {0}")]
    Captioning(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
