//! Error types for the dispatch engine.
//!
//! # Design
//! Every failure surfaces as one `DispatchError` variant. The variants follow
//! the failure classes a caller actually branches on: bad configuration, bad
//! routing metadata or resource state, an illegal verb/payload pairing caught
//! before any I/O, and a network failure that survived the retry budget.
//! Only `Transport` is ever retried, and only inside the transport layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors returned by the registry, path resolver, codec, transport and
/// dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A locked setting was reassigned, or required configuration is absent.
    #[error("{0}")]
    Configuration(String),

    /// Routing metadata missing or malformed, an unresolved path
    /// placeholder, or a field copy that failed during hydration.
    #[error("{0}")]
    Resource(String),

    /// Verb and payload do not agree. Raised before any network attempt.
    #[error("{0}")]
    Protocol(String),

    /// The network call failed on every attempt.
    #[error("transport failed after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    /// The outgoing payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Coarse classification of a `DispatchError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resource,
    Protocol,
    Transport,
    Serialization,
}

impl DispatchError {
    pub(crate) fn resource(message: impl Into<String>) -> Self {
        DispatchError::Resource(message.into())
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        DispatchError::Protocol(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Configuration(_) => ErrorKind::Configuration,
            DispatchError::Resource(_) => ErrorKind::Resource,
            DispatchError::Protocol(_) => ErrorKind::Protocol,
            DispatchError::Transport { .. } => ErrorKind::Transport,
            DispatchError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// True only for network failures; everything else is fatal to the call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_passed_through_verbatim() {
        let err = DispatchError::resource("no annotated method found");
        assert_eq!(err.to_string(), "no annotated method found");

        let err = DispatchError::protocol("Payload not supported for this method.");
        assert_eq!(err.to_string(), "Payload not supported for this method.");
    }

    #[test]
    fn transport_error_reports_attempts() {
        let err = DispatchError::Transport {
            attempts: 3,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "transport failed after 3 attempt(s): connection refused"
        );
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(!DispatchError::Configuration("x".into()).is_retryable());
        assert!(!DispatchError::resource("x").is_retryable());
        assert!(!DispatchError::protocol("x").is_retryable());
        assert!(!DispatchError::Serialization("x".into()).is_retryable());
    }
}
