//! A resource wrapper for plain serializable values.

use std::time::Duration;

use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName};
use serde::{Serialize, Serializer};

use crate::headers::append_header;
use crate::resource::Resource;

/// Attaches cache metadata and extra headers to any serializable value.
///
/// Only the wrapped value is encoded in the response body.
///
/// ```
/// use std::time::Duration;
///
/// use rested_core::{Envelope, Resource};
///
/// let envelope = Envelope::new(vec![1, 2, 3])
///     .with_etag("v3")
///     .with_ttl(Duration::from_secs(60));
/// assert_eq!(envelope.etag(), "v3");
/// ```
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    value: T,
    etag: String,
    last_modified: DateTime<Utc>,
    ttl: Duration,
    headers: HeaderMap,
}

impl<T> Envelope<T> {
    /// Wrap `value` with an empty ETag, the current time as last
    /// modification, and no caching.
    pub fn new(value: T) -> Self {
        Self {
            value,
            etag: String::new(),
            last_modified: Utc::now(),
            ttl: Duration::ZERO,
            headers: HeaderMap::new(),
        }
    }

    /// Set the ETag.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = etag.into();
        self
    }

    /// Set the last modification time.
    #[must_use]
    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Set the caching lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Add a response header. Invalid values are skipped.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        append_header(&mut self.headers, name, value);
        self
    }

    /// The wrapped value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<T: Serialize + Send + Sync> Resource for Envelope<T> {
    fn etag(&self) -> String {
        self.etag.clone()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }
}
