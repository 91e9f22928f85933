//! Default resource encoders, selected through `Accept` negotiation.

use http::request::Parts;
use tracing::debug;

use crate::error::Fault;
use crate::negotiate::Accept;
use crate::resource::{Encoded, Resource};

/// Content types a resource can be negotiated into, in server preference
/// order. Also advertised as the `Content-Type` of OPTIONS responses.
pub const ALTERNATIVES: &[&str] = &[
    "application/json",
    "text/javascript",
    "application/xml",
    "text/xml",
    "text/plain",
    "*/*",
];

/// `Content-Type` of JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// `Content-Type` of XML bodies.
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// `Content-Type` of plain text bodies.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Encode `resource` for the client that sent `request`.
///
/// A resource-provided [`Resource::marshal`] wins over negotiation. Otherwise
/// the `Accept` header selects among [`ALTERNATIVES`]:
///
/// - `application/json`, `text/javascript` and `*/*` produce JSON;
/// - `application/xml` and `text/xml` produce an XML document;
/// - `text/plain` uses [`Resource::text`].
///
/// # Errors
///
/// A 406 [`Fault`] when nothing acceptable can be produced, including
/// `text/plain` for a resource without a text form. Encoder failures become a
/// redacted 500.
pub fn marshal(resource: &dyn Resource, request: &Parts) -> Result<Encoded, Fault> {
    if let Some(custom) = resource.marshal(request) {
        return custom;
    }

    let accept = Accept::from_headers(&request.headers);
    let chosen = accept.negotiate(ALTERNATIVES);
    debug!(content_type = ?chosen, "negotiated resource encoding");

    match chosen {
        Some("application/json" | "text/javascript" | "*/*") => {
            Ok(Encoded::new(JSON_CONTENT_TYPE, resource.to_json()?))
        }
        Some("application/xml" | "text/xml") => {
            Ok(Encoded::new(XML_CONTENT_TYPE, resource.to_xml()?))
        }
        Some("text/plain") => resource
            .text()
            .map(|text| Encoded::new(TEXT_CONTENT_TYPE, text))
            .ok_or_else(Fault::not_acceptable),
        _ => Err(Fault::not_acceptable()),
    }
}
