//! Per-request context handed to every endpoint operation.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use rested_core::Fault;
use rested_core::headers::header_str;

/// Path variables captured by the router, keyed by name.
pub type RouteVars = BTreeMap<String, String>;

/// Everything an operation may need about the request it serves.
///
/// The context lives exactly as long as the request is handled; nothing about
/// a request is stored outside of it.
#[derive(Debug)]
pub struct RequestContext {
    /// Method, URI, version and headers.
    pub parts: Parts,
    /// The collected request body.
    pub body: Bytes,
    /// Variables captured from the route pattern.
    pub vars: RouteVars,
}

impl RequestContext {
    /// Create a context from request parts, the collected body and the route
    /// variables.
    #[must_use]
    pub fn new(parts: Parts, body: Bytes, vars: RouteVars) -> Self {
        Self { parts, body, vars }
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// A route variable by name.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Ensure the request `Content-Type` is one of `accepted` (compared on
    /// the essence, ignoring parameters such as `charset`).
    ///
    /// # Errors
    ///
    /// A 415 [`Fault`] listing `accepted` when the header is missing,
    /// unparsable, or not in the list.
    pub fn require_content_type(&self, accepted: &[&str]) -> Result<mime::Mime, Fault> {
        let parsed = header_str(self.headers(), &CONTENT_TYPE)
            .and_then(|raw| raw.parse::<mime::Mime>().ok());

        match parsed {
            Some(mime)
                if accepted
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(mime.essence_str())) =>
            {
                Ok(mime)
            }
            _ => Err(Fault::unsupported_media_type(accepted)),
        }
    }
}
