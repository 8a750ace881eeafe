//! Observable state of a cached query.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Lifecycle status of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// Nothing has been fetched (the query is disabled, or not started yet).
    Idle,
    /// The first fetch is in flight and there is no result yet.
    Loading,
    /// The latest applied fetch succeeded.
    Success,
    /// The latest applied fetch failed.
    Error,
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of a cached query as seen by subscribers.
///
/// After a failed refresh, `data` still holds the last successful value while
/// `error` carries the cause. Callers decide whether to show the stale value.
#[derive(Debug)]
pub struct QueryState<T, E> {
    /// Last successfully fetched value.
    pub data: Option<Arc<T>>,
    /// Current status.
    pub status: QueryStatus,
    /// Cause of the latest failure, cleared by the next success.
    pub error: Option<Arc<E>>,
    /// Whether a fetch is currently in flight.
    pub is_refreshing: bool,
    /// When a fetch last completed and was applied.
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T, E> QueryState<T, E> {
    /// Returns the initial state of a new entry.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            is_refreshing: false,
            updated_at: None,
        }
    }

    /// Returns true once a fetch has completed (successfully or not) and none is pending.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self.status, QueryStatus::Success | QueryStatus::Error) && !self.is_refreshing
    }

    /// Returns true if the latest applied fetch succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// Returns true if the latest applied fetch failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Returns true if the data shown predates a failed refresh.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.is_error() && self.data.is_some()
    }
}

impl<T, E> Clone for QueryState<T, E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            is_refreshing: self.is_refreshing,
            updated_at: self.updated_at,
        }
    }
}

impl<T, E> Default for QueryState<T, E> {
    fn default() -> Self {
        Self::idle()
    }
}
