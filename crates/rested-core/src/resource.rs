//! The resource capability model.
//!
//! A [`Resource`] is any serializable domain object carrying cache metadata.
//! Optional capabilities are discovered at runtime through the `as_*`
//! accessors and default methods, so a plain resource only has to provide its
//! ETag, last-modified time and TTL:
//!
//! ```
//! use std::time::Duration;
//!
//! use chrono::{DateTime, TimeZone, Utc};
//! use rested_core::Resource;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Person {
//!     id: u32,
//!     name: String,
//! }
//!
//! impl Resource for Person {
//!     fn etag(&self) -> String {
//!         format!("p{}", self.id)
//!     }
//!
//!     fn last_modified(&self) -> DateTime<Utc> {
//!         Utc.with_ymd_and_hms(2014, 4, 14, 10, 0, 0).unwrap()
//!     }
//!
//!     fn ttl(&self) -> Duration {
//!         Duration::from_secs(30)
//!     }
//! }
//! ```

use std::fmt;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use http::HeaderMap;
use serde::Serialize;

use crate::error::Fault;
use crate::range::{ContentRange, Range, RangeError};

/// Errors raised by the structured encoders.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// JSON encoding failed.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// XML encoding failed.
    #[error("XML encoding failed: {0}")]
    Xml(#[from] rested_xml::XmlError),
}

impl From<EncodeError> for Fault {
    fn from(err: EncodeError) -> Self {
        Fault::internal_server_error("Resource could not be encoded", err.to_string(), false)
            .redacted()
    }
}

/// Structured encodings of a value.
///
/// Implemented for every `Serialize + Send + Sync` type, which makes the
/// generic encoders reachable through `dyn Resource`.
pub trait Payload: Send + Sync {
    /// Encode as JSON.
    fn to_json(&self) -> Result<Vec<u8>, EncodeError>;

    /// Encode as a complete XML document.
    fn to_xml(&self) -> Result<Vec<u8>, EncodeError>;
}

impl<T: Serialize + Send + Sync> Payload for T {
    fn to_json(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn to_xml(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(rested_xml::to_xml(self)?)
    }
}

/// A domain object exposed over HTTP.
///
/// `etag` and `last_modified` must be stable for a given version of the
/// underlying data. The dispatcher never mutates a resource.
pub trait Resource: Payload {
    /// Opaque version tag written to `ETag`.
    fn etag(&self) -> String;

    /// Time of the last modification, written to `Last-Modified`.
    fn last_modified(&self) -> DateTime<Utc>;

    /// Caching lifetime; `Expires` is set to now + TTL.
    fn ttl(&self) -> Duration;

    /// Plain-text representation, used when `text/plain` is negotiated.
    /// Without one, `text/plain` is not acceptable.
    fn text(&self) -> Option<String> {
        None
    }

    /// Custom encoding that bypasses negotiation entirely. Returns the content
    /// type and encoded bytes.
    fn marshal(&self, _request: &http::request::Parts) -> Option<Result<Encoded, Fault>> {
        None
    }

    /// Range capability.
    fn as_ranger(&self) -> Option<&dyn Ranger> {
        None
    }

    /// Raw-handler capability. When present, the resource writes its own
    /// response body and negotiation and compression are skipped.
    fn as_raw_handler(&self) -> Option<&dyn RawHandler> {
        None
    }

    /// Extra headers added to successful responses carrying this resource.
    fn headers(&self) -> HeaderMap {
        HeaderMap::new()
    }
}

/// Implemented by resources that can serve partial content.
pub trait Ranger {
    /// Range units this resource understands, e.g. `["bytes"]`.
    fn units(&self) -> &[&str];

    /// Total number of units available.
    fn count(&self) -> u64;

    /// Return the slice covering an already adjusted range.
    ///
    /// Returning [`RangeError::UnsupportedUnit`] cancels the partial response
    /// and the full resource is served instead.
    fn range(&self, range: &Range) -> Result<(ContentRange, Box<dyn Resource>), RangeError>;
}

/// A response body produced by a raw handler.
pub enum RawBody {
    /// The whole body at once.
    Full(Bytes),
    /// A body delivered in chunks.
    Stream(BoxStream<'static, Result<Bytes, io::Error>>),
}

impl fmt::Debug for RawBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Implemented by resources that write their response themselves.
///
/// `response` already carries the status and the cache headers computed by
/// the dispatcher; the handler may change both.
pub trait RawHandler: Send + Sync {
    /// Produce the response body.
    fn serve_raw(
        &self,
        request: &http::request::Parts,
        response: &mut http::response::Parts,
    ) -> Result<RawBody, Fault>;
}

/// An encoded representation: content type plus body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Value for the `Content-Type` header.
    pub content_type: String,
    /// The encoded body.
    pub body: Bytes,
}

impl Encoded {
    /// Create an encoded representation.
    #[must_use]
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}
