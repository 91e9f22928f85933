//! Header helpers shared by every component.
//!
//! Provides HTTP-date formatting and parsing, `Vary` accumulation without
//! duplicates, header-name canonicalization, and checked header insertion.

use chrono::{DateTime, NaiveDateTime, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue, VARY};
use tracing::warn;

/// RFC 1123 date format with a literal `GMT` zone, as used on the wire.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP date.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rested_core::headers::format_http_date;
///
/// let t = Utc.with_ymd_and_hms(2014, 4, 14, 10, 0, 0).unwrap();
/// assert_eq!(format_http_date(t), "Mon, 14 Apr 2014 10:00:00 GMT");
/// ```
#[must_use]
pub fn format_http_date(t: DateTime<Utc>) -> String {
    t.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date. Returns `None` for anything that is not in the
/// RFC 1123 `GMT` format.
#[must_use]
pub fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Canonicalize a header name: the first letter and every letter following a
/// hyphen are upper-cased, the rest lower-cased.
///
/// Names containing characters other than ASCII alphanumerics and `-` are
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use rested_core::headers::canonical_header_key;
///
/// assert_eq!(canonical_header_key("x-requested-with"), "X-Requested-With");
/// assert_eq!(canonical_header_key("ACCEPT-ENCODING"), "Accept-Encoding");
/// ```
#[must_use]
pub fn canonical_header_key(name: &str) -> String {
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return name.to_owned();
    }

    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// Add a token to the `Vary` header unless it is already listed.
///
/// Existing `Vary` values may hold comma-separated tokens; the comparison is
/// case-insensitive.
pub fn add_vary(headers: &mut HeaderMap, token: &str) {
    let token = canonical_header_key(token.trim());
    let present = headers.get_all(VARY).iter().any(|value| {
        value.to_str().is_ok_and(|v| {
            v.split(',')
                .any(|existing| existing.trim().eq_ignore_ascii_case(&token))
        })
    });
    if !present {
        append_header(headers, VARY, &token);
    }
}

/// Return the trimmed value of a header, or `None` if it is absent, empty,
/// or not visible ASCII.
#[must_use]
pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Replace a header, skipping values that are not valid header text.
pub fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => warn!(header = %name, value, "skipping invalid header value"),
    }
}

/// Append a header value, skipping values that are not valid header text.
pub fn append_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.append(name, v);
        }
        Err(_) => warn!(header = %name, value, "skipping invalid header value"),
    }
}
