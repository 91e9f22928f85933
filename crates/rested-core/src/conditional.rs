//! Conditional request evaluation.
//!
//! Read requests (GET/HEAD) may be short-circuited with 304 Not Modified.
//! Write requests (PUT/PATCH) use [`validate_conditions`] to detect that the
//! client worked from a stale version of the resource.
//!
//! Timestamps are compared at second granularity, the resolution of HTTP
//! dates.

use http::HeaderMap;
use http::header::{IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE, IF_UNMODIFIED_SINCE};

use crate::headers::{header_str, parse_http_date};
use crate::resource::Resource;

/// Check whether a read request can be answered with 304 Not Modified.
///
/// True when `If-Modified-Since` parses and is not earlier than the
/// resource's last modification, or when any entry of `If-None-Match`
/// matches the resource's ETag.
#[must_use]
pub fn is_not_modified(resource: &dyn Resource, headers: &HeaderMap) -> bool {
    if let Some(since) = header_str(headers, &IF_MODIFIED_SINCE).and_then(parse_http_date) {
        if since.timestamp() >= resource.last_modified().timestamp() {
            return true;
        }
    }

    header_str(headers, &IF_NONE_MATCH)
        .is_some_and(|raw| etag_list_matches(raw, &resource.etag()))
}

/// Check whether a write request conflicts with the current resource.
///
/// A conflict exists when `If-Unmodified-Since` parses and is strictly earlier
/// than the resource's last modification, or when `If-Match` is present and
/// does not match the resource's ETag. Callers typically answer a conflict
/// with [`Fault::precondition_failed`](crate::Fault::precondition_failed) or
/// [`Fault::conflict`](crate::Fault::conflict).
///
/// # Examples
///
/// ```no_run
/// use rested_core::{Fault, Resource, validate_conditions};
///
/// fn check(resource: &dyn Resource, headers: &http::HeaderMap) -> Result<(), Fault> {
///     if validate_conditions(resource, headers) {
///         return Err(Fault::precondition_failed());
///     }
///     Ok(())
/// }
/// ```
#[must_use]
pub fn validate_conditions(resource: &dyn Resource, headers: &HeaderMap) -> bool {
    if let Some(since) = header_str(headers, &IF_UNMODIFIED_SINCE).and_then(parse_http_date) {
        if since.timestamp() < resource.last_modified().timestamp() {
            return true;
        }
    }

    header_str(headers, &IF_MATCH).is_some_and(|raw| !etag_list_matches(raw, &resource.etag()))
}

/// Check the `If-Range` precondition of a range request.
///
/// An absent header passes. Otherwise the value must equal either the
/// resource's ETag or, as an HTTP date, its last modification time.
#[must_use]
pub fn if_range_matches(resource: &dyn Resource, headers: &HeaderMap) -> bool {
    let Some(raw) = header_str(headers, &IF_RANGE) else {
        return true;
    };
    let etag = resource.etag();
    if !normalize_etag(&etag).is_empty() && normalize_etag(raw) == normalize_etag(&etag) {
        return true;
    }
    parse_http_date(raw)
        .is_some_and(|date| date.timestamp() == resource.last_modified().timestamp())
}

/// Check whether an ETag list (`;` or `,` separated, optionally quoted, or
/// `*`) contains `etag`. A resource without an ETag matches nothing.
fn etag_list_matches(raw: &str, etag: &str) -> bool {
    let etag = normalize_etag(etag);
    if etag.is_empty() {
        return false;
    }
    raw.split([';', ','])
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .any(|candidate| candidate == "*" || normalize_etag(candidate) == etag)
}

/// Normalize an ETag by stripping a weak prefix and surrounding double quotes.
fn normalize_etag(etag: &str) -> &str {
    let etag = etag.trim();
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    etag.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(etag)
}
