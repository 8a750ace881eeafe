//! Lookout Shared Library
//!
//! This crate contains the wire models, list filters, and derived dashboard
//! signals used across the Lookout observability dashboard.
//!
//! # Modules
//!
//! - [`models`] - Records returned by the monitoring API and write payloads
//! - [`filter`] - Query filters for the list endpoints
//! - [`aggregation`] - Service health classification and dashboard statistics
//!
//! # Example
//!
//! ```
//! use shared::filter::{MetricFilter, QueryParams};
//!
//! let filter = MetricFilter::new().with_service("checkout").with_limit(100);
//! assert_eq!(filter.query_pairs().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod aggregation;
pub mod filter;
pub mod models;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
