//! Client error taxonomy.
//!
//! Every failure surfaced by the monitoring client, and by the aggregates built
//! on top of it, is a [`ClientError`].

use thiserror::Error;

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be sent or its response could not be decoded.
    Transport,
    /// The server answered with a non-success status.
    Http,
    /// One or more fetches behind an aggregate failed.
    Aggregation,
    /// The request was rejected locally before any I/O.
    InvalidInput,
}

/// Errors that can occur while talking to the monitoring API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure, timeout, or malformed response body.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server was reachable but returned a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body, or the canonical reason phrase when the body is empty.
        message: String,
    },

    /// At least one of the parallel fetches behind an aggregate failed.
    #[error("Aggregation failed: {}", describe_failures(.failures))]
    Aggregation {
        /// Every source that failed, with its cause.
        failures: Vec<SourceFailure>,
    },

    /// A write payload failed local validation.
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] validator::ValidationErrors),

    /// The configured base URL cannot be used.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ClientError {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Http { .. } => ErrorKind::Http,
            Self::Aggregation { .. } => ErrorKind::Aggregation,
            Self::InvalidRecord(_) | Self::InvalidBaseUrl { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Returns the HTTP status for [`ClientError::Http`] errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A failed source within an aggregate fetch.
#[derive(Debug, Error)]
#[error("{resource}: {error}")]
pub struct SourceFailure {
    /// Name of the resource that failed (e.g. "logs").
    pub resource: &'static str,
    /// The underlying failure.
    #[source]
    pub error: ClientError,
}

fn describe_failures(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
