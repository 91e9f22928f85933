//! CORS policy types and header computation.
//!
//! A policy ([`AccessControlResponse`]) is usually process-wide. Endpoints may
//! compute a per-request policy for preflight requests from the parsed
//! [`AccessControlRequest`]. [`write_cors_headers`] turns a policy into
//! `Access-Control-*` response headers.

use std::time::Duration;

use http::HeaderMap;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::headers::{add_vary, canonical_header_key, header_str, insert_header};

/// Default preflight cache lifetime.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// An allow-list with three distinct states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessList {
    /// Nothing is allowed; the header is omitted.
    #[default]
    Deny,
    /// Anything is allowed.
    AllowAny,
    /// Exactly these values are allowed.
    AllowList(Vec<String>),
}

impl AccessList {
    /// Build an explicit allow-list.
    #[must_use]
    pub fn of<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllowList(items.into_iter().map(Into::into).collect())
    }
}

/// The CORS headers of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlRequest {
    /// Value of `Origin`.
    pub origin: String,
    /// Value of `Access-Control-Request-Method`, if any.
    pub method: Option<String>,
    /// Names listed in `Access-Control-Request-Headers`, without duplicates.
    pub headers: Vec<String>,
}

impl AccessControlRequest {
    /// Parse the CORS headers of a request.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut requested: Vec<String> = Vec::new();
        if let Some(raw) = header_str(headers, &ACCESS_CONTROL_REQUEST_HEADERS) {
            for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                if !requested.iter().any(|r| r.eq_ignore_ascii_case(name)) {
                    requested.push(name.to_owned());
                }
            }
        }

        Self {
            origin: header_str(headers, &ORIGIN).unwrap_or_default().to_owned(),
            method: header_str(headers, &ACCESS_CONTROL_REQUEST_METHOD).map(ToOwned::to_owned),
            headers: requested,
        }
    }

    /// Whether the request carries no CORS information at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.origin.is_empty() && self.method.is_none() && self.headers.is_empty()
    }
}

/// A CORS policy: the `Access-Control-*` values to answer with.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct AccessControlResponse {
    /// Value of `Access-Control-Allow-Origin`; omitted when empty.
    #[builder(default = String::from("*"), setter(into))]
    pub origin: String,
    /// Methods allowed on preflight.
    #[builder(default)]
    pub methods: AccessList,
    /// Request headers allowed on preflight.
    #[builder(default)]
    pub headers: AccessList,
    /// Response headers exposed to scripts.
    #[builder(default)]
    pub expose_headers: Vec<String>,
    /// Value of `Access-Control-Allow-Credentials`.
    #[builder(default = true)]
    pub credentials: bool,
    /// Value of `Access-Control-Max-Age`.
    #[builder(default = DEFAULT_MAX_AGE)]
    pub max_age: Duration,
}

impl Default for AccessControlResponse {
    /// A limited policy: any origin, credentials allowed, only simple
    /// cross-origin requests (no preflighted methods or headers).
    fn default() -> Self {
        Self {
            origin: "*".to_owned(),
            methods: AccessList::Deny,
            headers: AccessList::Deny,
            expose_headers: Vec::new(),
            credentials: true,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl AccessControlResponse {
    /// A permissive policy: any origin, any method, any header.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            methods: AccessList::AllowAny,
            headers: AccessList::AllowAny,
            ..Self::default()
        }
    }
}

/// Named policies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorsPreset {
    /// [`AccessControlResponse::default`]
    Default,
    /// [`AccessControlResponse::permissive`]
    Permissive,
}

impl CorsPreset {
    /// Parse a preset name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "permissive" => Some(Self::Permissive),
            _ => None,
        }
    }

    /// The policy this preset stands for.
    #[must_use]
    pub fn policy(self) -> AccessControlResponse {
        match self {
            Self::Default => AccessControlResponse::default(),
            Self::Permissive => AccessControlResponse::permissive(),
        }
    }
}

/// Write the CORS headers of `policy` into `out`.
///
/// Every cross-origin response gets the origin, credentials and exposed
/// headers, plus `Vary: Origin` unless the origin is `*`. Preflight responses
/// (`preflight == true`) also get the max age, allowed methods (when a method
/// was requested and the policy does not deny) and allowed headers (when
/// headers were requested and the policy does not deny). `AllowAny` resolves
/// to `endpoint_methods` for methods and to an echo of the requested headers
/// for headers.
pub fn write_cors_headers(
    policy: &AccessControlResponse,
    request: &AccessControlRequest,
    preflight: bool,
    endpoint_methods: &[&str],
    out: &mut HeaderMap,
) {
    if !policy.origin.is_empty() {
        insert_header(out, ACCESS_CONTROL_ALLOW_ORIGIN, &policy.origin);
    }
    if policy.origin != "*" {
        add_vary(out, "Origin");
    }
    insert_header(
        out,
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        if policy.credentials { "true" } else { "false" },
    );
    if !policy.expose_headers.is_empty() {
        insert_header(
            out,
            ACCESS_CONTROL_EXPOSE_HEADERS,
            &policy.expose_headers.join(", "),
        );
    }

    if !preflight {
        return;
    }

    insert_header(
        out,
        ACCESS_CONTROL_MAX_AGE,
        &policy.max_age.as_secs().to_string(),
    );

    if request.method.is_some() {
        let methods = match &policy.methods {
            AccessList::Deny => None,
            AccessList::AllowAny => Some(endpoint_methods.join(", ")),
            AccessList::AllowList(list) => Some(list.join(", ")),
        };
        if let Some(methods) = methods {
            insert_header(out, ACCESS_CONTROL_ALLOW_METHODS, &methods);
        }
    }

    if !request.headers.is_empty() {
        let names: Option<&[String]> = match &policy.headers {
            AccessList::Deny => None,
            AccessList::AllowAny => Some(&request.headers),
            AccessList::AllowList(list) => Some(list),
        };
        if let Some(names) = names {
            let canonical: Vec<String> = names.iter().map(|n| canonical_header_key(n)).collect();
            insert_header(out, ACCESS_CONTROL_ALLOW_HEADERS, &canonical.join(", "));
        }
    }
}
