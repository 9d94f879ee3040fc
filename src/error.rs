//! Error types for binding operations.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur during binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A required configuration value is missing or inconsistent.
    ///
    /// Always fatal to the invocation and never retried. The message names
    /// the offending property.
    Configuration,
    /// A binding invariant was violated by caller-produced data.
    InvariantViolation,
    /// The store reported that a database, container or item does not exist.
    NotFound,
    /// An item could not be converted to or from its document form.
    Serialization,
    /// Any other failure reported by the store.
    Store,
}

/// A structured error type for binding operations.
#[derive(Debug, Error)]
#[error("{}: {message}", .kind.as_ref())]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    /// Creates a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Adds a source error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true for the store's "resource not found" signal.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = Error::configuration("the connection string must be set");
        assert_eq!(
            err.to_string(),
            "configuration: the connection string must be set"
        );
    }

    #[test]
    fn test_not_found_classification() {
        assert!(Error::not_found("missing").is_not_found());
        assert!(!Error::store("boom").is_not_found());
    }

    #[test]
    fn test_source_is_preserved() {
        let inner = std::io::Error::other("socket closed");
        let err = Error::store("upsert failed").with_source(inner);
        assert!(std::error::Error::source(&err).is_some());
    }
}
