//! Fault responses.
//!
//! A fault supersedes whatever the pipeline prepared before it failed: cache
//! validators are dropped, caching is disabled (except for 404/410), and the
//! fault is rendered in the representation the client prefers. HTML wins
//! whenever the client accepts it or states no preference.

use std::fmt::Write as _;

use http::header::{
    CACHE_CONTROL, CONTENT_ENCODING, CONTENT_RANGE, CONTENT_TYPE, ETAG, EXPIRES, LAST_MODIFIED,
    VARY,
};
use http::{Method, StatusCode, request, response};
use rested_core::Fault;
use rested_core::encoding::{JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE, XML_CONTENT_TYPE};
use rested_core::headers::{add_vary, insert_header};
use rested_core::negotiate::Accept;
use tracing::{debug, error};

use crate::body::ResponseBody;

/// Media ranges that select the HTML fault page. Tried before any other
/// representation, whatever their position in `Accept`.
pub const HTML_ALTERNATIVES: &[&str] = &["text/html", "*/*"];

/// Encoded representations a fault can be rendered in when HTML is not
/// acceptable, in server preference order.
pub const FAULT_ALTERNATIVES: &[&str] = &[
    "application/json",
    "text/javascript",
    "application/xml",
    "text/xml",
    "text/plain",
];

/// `Content-Type` of HTML fault pages.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Write `fault` into `response` and return the body to send.
///
/// Headers already present on `response` are kept except the cache
/// validators and the content metadata of the abandoned success body. The
/// fault's own headers are added, `Vary` values merged.
pub fn write_fault(
    fault: &Fault,
    request: &request::Parts,
    debug_mode: bool,
    response: &mut response::Parts,
) -> ResponseBody {
    if fault.status.is_server_error() {
        error!(
            status = fault.status.as_u16(),
            reason = %fault.reason,
            description = %fault.description,
            frames = fault.stack.len(),
            method = %request.method,
            uri = %request.uri,
            "request failed"
        );
    } else {
        debug!(status = fault.status.as_u16(), reason = %fault.reason, "request fault");
    }

    let mut client = fault.for_client(debug_mode);
    if !debug_mode {
        client.stack.clear();
    }

    let headers = &mut response.headers;
    for name in [LAST_MODIFIED, ETAG, EXPIRES, CONTENT_RANGE, CONTENT_ENCODING, CONTENT_TYPE] {
        headers.remove(name);
    }
    if client.status != StatusCode::NOT_FOUND && client.status != StatusCode::GONE {
        insert_header(headers, CACHE_CONTROL, NO_CACHE);
    }

    for name in client.headers.keys() {
        if *name == VARY {
            for value in client.headers.get_all(name) {
                let tokens = value.to_str().unwrap_or_default().split(',');
                for token in tokens.map(str::trim).filter(|t| !t.is_empty()) {
                    add_vary(headers, token);
                }
            }
        } else {
            headers.remove(name);
            for value in client.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
    }
    add_vary(headers, "Accept");

    let (content_type, body) = render(&client, request);
    insert_header(headers, CONTENT_TYPE, content_type);
    response.status = client.status;

    if request.method == Method::HEAD {
        ResponseBody::empty()
    } else {
        ResponseBody::from_bytes(body)
    }
}

/// Build a complete response for `fault`, as used when no endpoint was
/// reached.
#[must_use]
pub fn fault_response(
    fault: &Fault,
    request: &request::Parts,
    debug_mode: bool,
) -> http::Response<ResponseBody> {
    let (mut parts, ()) = http::Response::new(()).into_parts();
    let body = write_fault(fault, request, debug_mode, &mut parts);
    http::Response::from_parts(parts, body)
}

/// Encode a client-visible fault as negotiated with the request's `Accept`.
fn render(fault: &Fault, request: &request::Parts) -> (&'static str, Vec<u8>) {
    let accept = Accept::from_headers(&request.headers);
    if accept.negotiate(HTML_ALTERNATIVES).is_some() {
        return (HTML_CONTENT_TYPE, render_html(fault, request).into_bytes());
    }

    let text = || (TEXT_CONTENT_TYPE, fault.to_text().into_bytes());
    match accept.negotiate(FAULT_ALTERNATIVES) {
        Some("application/json" | "text/javascript") => match serde_json::to_vec(fault) {
            Ok(json) => (JSON_CONTENT_TYPE, json),
            Err(e) => {
                error!(error = %e, "failed to encode fault as JSON");
                text()
            }
        },
        Some("application/xml" | "text/xml") => (
            XML_CONTENT_TYPE,
            rested_xml::fault_to_xml(&fault.reason, &fault.description, &fault.stack),
        ),
        Some(_) => text(),
        None => (TEXT_CONTENT_TYPE, fault.to_string().into_bytes()),
    }
}

fn render_html(fault: &Fault, request: &request::Parts) -> String {
    let code = fault.status.as_u16();
    let status_text = escape_html(fault.status_text());

    let mut page = String::with_capacity(1024);
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(page, "<title>{code} {status_text}</title>");
    page.push_str(
        "<style>body{font-family:sans-serif;margin:2em;color:#333}\
         h1{font-size:1.6em}pre{background:#f4f4f4;padding:1em;overflow:auto}\
         .request{color:#888}</style>\n</head>\n<body>\n",
    );
    let _ = writeln!(page, "<h1>{code} {status_text}</h1>");
    let _ = writeln!(page, "<h2>{}</h2>", escape_html(&fault.reason));
    if !fault.description.is_empty() {
        let _ = writeln!(page, "<p>{}</p>", escape_html(&fault.description));
    }
    let _ = writeln!(
        page,
        "<p class=\"request\">{} {}</p>",
        escape_html(request.method.as_str()),
        escape_html(&request.uri.to_string())
    );
    if !fault.stack.is_empty() {
        page.push_str("<pre>");
        for frame in &fault.stack {
            page.push_str(&escape_html(frame));
            page.push('\n');
        }
        page.push_str("</pre>\n");
    }
    page.push_str("</body>\n</html>\n");
    page
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
