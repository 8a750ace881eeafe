//! Cache keys.

use std::fmt;

/// Identity of a cacheable unit of work: a resource kind plus its parameters.
///
/// Parameters are kept sorted, so the same pairs given in any order produce
/// equal keys.
///
/// # Example
///
/// ```
/// use client::cache::QueryKey;
///
/// let a = QueryKey::with_params("logs", [("service", "api"), ("limit", "5")]);
/// let b = QueryKey::with_params("logs", [("limit", "5"), ("service", "api")]);
///
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "logs?limit=5&service=api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: String,
    params: Vec<(String, String)>,
}

impl QueryKey {
    /// Creates a key without parameters.
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            params: Vec::new(),
        }
    }

    /// Creates a key from a resource and a set of parameters.
    #[must_use]
    pub fn with_params<K, V>(
        resource: impl Into<String>,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        params.sort();
        Self {
            resource: resource.into(),
            params,
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let pair = (key.into(), value.into());
        let index = self.params.partition_point(|p| *p <= pair);
        self.params.insert(index, pair);
        self
    }

    /// Returns the resource kind.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the parameters in canonical order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}
