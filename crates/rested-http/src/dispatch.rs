//! Per-verb dispatch.
//!
//! The [`Dispatcher`] turns a routed request into a response by calling the
//! endpoint operation matching the verb, then writing the returned resource:
//!
//! ```text
//! verb lookup -> 404 | 405 | operation
//!   -> range adjust (GET/HEAD on rangers)
//!   -> validators + conditional 304
//!   -> raw handler | negotiate + encode -> compress
//!   -> status (200/201/204/206) -> body (none for HEAD)
//! ```
//!
//! Every failure is returned as a [`Fault`]; the caller writes it with
//! [`write_fault`](crate::response::write_fault) over the same response parts,
//! so headers set before the failure (CORS, custom headers) survive.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{
    ACCEPT_RANGES, ALLOW, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG,
    EXPIRES, LAST_MODIFIED, LOCATION, RANGE,
};
use http::{Method, StatusCode, response};
use rested_core::compression::{CompressorPool, DEFAULT_COMPRESSION_THRESHOLD, select_codec};
use rested_core::encoding::{ALTERNATIVES, marshal};
use rested_core::headers::{add_vary, format_http_date, header_str, insert_header};
use rested_core::{
    Fault, Range, RangeError, Ranger, Resource, if_range_matches, is_not_modified,
};
use tracing::{debug, warn};

use crate::body::ResponseBody;
use crate::context::RequestContext;
use crate::endpoint::{Endpoint, Getter, ResourceResult};

/// The verbs the dispatcher knows, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other,
}

impl Verb {
    fn of(method: &Method) -> Self {
        match method.as_str().to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            _ => Self::Other,
        }
    }
}

/// How a resource body is being written, which fixes its success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// GET/HEAD: 200, 204 for an empty body, 206 for a partial body.
    Read,
    /// PUT/PATCH: always 200.
    Update,
    /// POST: always 201.
    Create,
}

/// Dispatches requests to endpoint operations and writes their results.
#[derive(Debug)]
pub struct Dispatcher {
    compressors: CompressorPool,
    threshold: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_THRESHOLD)
    }
}

impl Dispatcher {
    /// Create a dispatcher compressing bodies of at least `threshold` bytes.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            compressors: CompressorPool::default(),
            threshold,
        }
    }

    /// Serve `ctx` with `endpoint`, writing status and headers into
    /// `response` and returning the body.
    ///
    /// # Errors
    ///
    /// The [`Fault`] to answer with: a 404/405 for verbs the endpoint does not
    /// serve, any fault returned by the operation, or one raised while
    /// writing the resource (406, 416, 500).
    pub fn dispatch(
        &self,
        endpoint: &Endpoint,
        ctx: &RequestContext,
        response: &mut response::Parts,
    ) -> Result<ResponseBody, Fault> {
        let verb = Verb::of(ctx.method());
        debug!(method = %ctx.method(), path = ctx.uri().path(), "dispatching request");

        match verb {
            Verb::Options => Ok(options(endpoint, response)),
            Verb::Get | Verb::Head => {
                let getter = endpoint
                    .getter()
                    .ok_or_else(|| not_allowed(endpoint, ctx.method()))?;
                self.serve_get(getter, ctx, response)
            }
            Verb::Put => {
                let putter = endpoint
                    .putter()
                    .ok_or_else(|| not_allowed(endpoint, ctx.method()))?;
                self.serve_update(putter.put(ctx), ctx, response)
            }
            Verb::Patch => {
                let patcher = endpoint
                    .patcher()
                    .ok_or_else(|| not_allowed(endpoint, ctx.method()))?;
                self.serve_update(patcher.patch(ctx), ctx, response)
            }
            Verb::Post => {
                let poster = endpoint
                    .poster()
                    .ok_or_else(|| not_allowed(endpoint, ctx.method()))?;
                let created = poster.post(ctx)?;
                if let Some(location) = &created.location {
                    insert_header(&mut response.headers, LOCATION, location);
                }
                match created.resource {
                    Some(resource) => {
                        self.write_resource(resource.as_ref(), ctx, response, WriteMode::Create)
                    }
                    None => {
                        response.status = StatusCode::CREATED;
                        Ok(ResponseBody::empty())
                    }
                }
            }
            Verb::Delete => {
                let deleter = endpoint
                    .deleter()
                    .ok_or_else(|| not_allowed(endpoint, ctx.method()))?;
                deleter.delete(ctx)?;
                response.status = StatusCode::NO_CONTENT;
                Ok(ResponseBody::empty())
            }
            Verb::Other => Err(not_allowed(endpoint, ctx.method())),
        }
    }

    fn serve_get(
        &self,
        getter: &dyn Getter,
        ctx: &RequestContext,
        response: &mut response::Parts,
    ) -> Result<ResponseBody, Fault> {
        let Some(resource) = getter.get(ctx)? else {
            response.status = StatusCode::NO_CONTENT;
            return Ok(ResponseBody::empty());
        };

        let partial = match resource.as_ranger() {
            Some(ranger) => {
                insert_header(&mut response.headers, ACCEPT_RANGES, &ranger.units().join(", "));
                partial_resource(resource.as_ref(), ranger, ctx, response)?
            }
            None => None,
        };
        let target = partial.as_deref().unwrap_or(resource.as_ref());

        self.write_resource(target, ctx, response, WriteMode::Read)
    }

    fn serve_update(
        &self,
        result: ResourceResult,
        ctx: &RequestContext,
        response: &mut response::Parts,
    ) -> Result<ResponseBody, Fault> {
        match result? {
            Some(resource) => self.write_resource(resource.as_ref(), ctx, response, WriteMode::Update),
            None => {
                response.status = StatusCode::OK;
                Ok(ResponseBody::empty())
            }
        }
    }

    /// Write validators, cache headers and the encoded body of `resource`.
    fn write_resource(
        &self,
        resource: &dyn Resource,
        ctx: &RequestContext,
        response: &mut response::Parts,
        mode: WriteMode,
    ) -> Result<ResponseBody, Fault> {
        let head = Verb::of(ctx.method()) == Verb::Head;
        let headers = &mut response.headers;

        insert_header(headers, LAST_MODIFIED, &format_http_date(resource.last_modified()));
        let etag = resource.etag();
        if !etag.is_empty() {
            insert_header(headers, ETAG, &etag);
        }
        insert_header(headers, EXPIRES, &format_http_date(expires_at(resource)));
        for name in resource.headers().keys() {
            headers.remove(name);
        }
        for (name, value) in &resource.headers() {
            headers.append(name.clone(), value.clone());
        }
        add_vary(headers, "Accept");

        if mode == WriteMode::Read && is_not_modified(resource, ctx.headers()) {
            debug!(etag = %etag, "resource not modified");
            headers.remove(CONTENT_RANGE);
            response.status = StatusCode::NOT_MODIFIED;
            return Ok(ResponseBody::empty());
        }

        if let Some(raw) = resource.as_raw_handler() {
            response.status = match mode {
                WriteMode::Create => StatusCode::CREATED,
                WriteMode::Update => StatusCode::OK,
                WriteMode::Read if response.headers.contains_key(CONTENT_RANGE) => {
                    StatusCode::PARTIAL_CONTENT
                }
                WriteMode::Read => StatusCode::OK,
            };
            let body = raw.serve_raw(&ctx.parts, response)?;
            return Ok(if head {
                ResponseBody::empty()
            } else {
                body.into()
            });
        }

        let encoded = marshal(resource, &ctx.parts)?;
        insert_header(headers, CONTENT_TYPE, &encoded.content_type);
        let body = self.compress(encoded.body, ctx, &mut response.headers)?;

        response.status = match mode {
            WriteMode::Create => StatusCode::CREATED,
            WriteMode::Update => StatusCode::OK,
            WriteMode::Read if body.is_empty() => StatusCode::NO_CONTENT,
            WriteMode::Read if response.headers.contains_key(CONTENT_RANGE) => {
                StatusCode::PARTIAL_CONTENT
            }
            WriteMode::Read => StatusCode::OK,
        };

        if head {
            insert_header(&mut response.headers, CONTENT_LENGTH, &body.len().to_string());
            return Ok(ResponseBody::empty());
        }
        Ok(ResponseBody::from_bytes(body))
    }

    /// Compress `body` when the client accepts it and the body is large
    /// enough.
    fn compress(
        &self,
        body: Bytes,
        ctx: &RequestContext,
        headers: &mut http::HeaderMap,
    ) -> Result<Bytes, Fault> {
        let Some(codec) = select_codec(body.len(), self.threshold, ctx.headers()) else {
            return Ok(body);
        };
        let compressed = self.compressors.compress(codec, &body).map_err(|e| {
            Fault::internal_server_error("Response could not be compressed", e.to_string(), false)
                .redacted()
        })?;
        debug!(%codec, from = body.len(), to = compressed.len(), "compressed response body");
        insert_header(headers, CONTENT_ENCODING, codec.as_str());
        add_vary(headers, "Accept-Encoding");
        Ok(compressed)
    }
}

/// Answer OPTIONS with the endpoint's methods and the negotiable types.
fn options(endpoint: &Endpoint, response: &mut response::Parts) -> ResponseBody {
    insert_header(&mut response.headers, ALLOW, &endpoint.allowed_methods().join(", "));
    insert_header(&mut response.headers, CONTENT_TYPE, &ALTERNATIVES.join(", "));
    response.status = StatusCode::NO_CONTENT;
    ResponseBody::empty()
}

/// 405 listing the allowed methods, or 404 when the endpoint serves none.
fn not_allowed(endpoint: &Endpoint, method: &Method) -> Fault {
    let allowed = endpoint.allowed_methods();
    if allowed.is_empty() {
        Fault::not_found()
    } else {
        Fault::method_not_allowed(method.as_str(), &allowed)
    }
}

/// Resolve the partial resource requested through `Range`, if any.
///
/// Malformed ranges, unsupported units and a failing `If-Range` fall back to
/// the full resource. A range starting past the extent is a 416.
fn partial_resource(
    resource: &dyn Resource,
    ranger: &dyn Ranger,
    ctx: &RequestContext,
    response: &mut response::Parts,
) -> Result<Option<Box<dyn Resource>>, Fault> {
    let headers = ctx.headers();
    let Some(raw) = header_str(headers, &RANGE) else {
        return Ok(None);
    };
    if !if_range_matches(resource, headers) {
        debug!("If-Range does not match, serving the full resource");
        return Ok(None);
    }

    let mut range = match Range::parse(raw) {
        Ok(range) => range,
        Err(e) => {
            warn!(error = %e, "ignoring Range header");
            return Ok(None);
        }
    };
    if let Err(e) = range.validate(ranger) {
        warn!(error = %e, "ignoring Range header");
        return Ok(None);
    }
    range.adjust(ranger)?;

    match ranger.range(&range) {
        Ok((content_range, slice)) => {
            add_vary(&mut response.headers, "Range");
            if !content_range.is_complete() {
                insert_header(&mut response.headers, CONTENT_RANGE, &content_range.to_string());
            }
            Ok(Some(slice))
        }
        Err(RangeError::UnsupportedUnit(unit)) => {
            warn!(unit = %unit, "resource declined the range unit, serving the full resource");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn expires_at(resource: &dyn Resource) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(resource.ttl()).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
