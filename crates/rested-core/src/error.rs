//! The fault model: HTTP-level failures as first-class values.
//!
//! A [`Fault`] carries a status code (always 4xx or 5xx), a short reason, a
//! longer description, headers to add to the response, and an optional
//! captured call stack. Handlers return faults deliberately; the dispatcher
//! synthesizes them for negotiation failures, unsatisfiable ranges, and
//! recovered panics.
//!
//! # Usage
//!
//! ```
//! use rested_core::Fault;
//!
//! let fault = Fault::not_found();
//! assert_eq!(fault.status.as_u16(), 404);
//! assert_eq!(fault.reason, "Not Found");
//! ```

use std::backtrace::Backtrace;
use std::cell::Cell;
use std::sync::Once;

use http::StatusCode;
use http::header::{ALLOW, CONTENT_RANGE, HeaderMap, HeaderName};
use serde::Serialize;
use tracing::warn;

use crate::headers::{add_vary, append_header, insert_header};
use crate::range::ContentRange;

/// Reason shown to clients in place of the real cause of a redacted fault.
pub const REDACTED_REASON: &str = "Internal Server Error";

/// Description shown to clients in place of the real cause of a redacted fault.
pub const REDACTED_DESCRIPTION: &str =
    "The server encountered an unexpected condition which prevented it from fulfilling the request.";

/// An HTTP error with status code, reason, description and headers.
///
/// Serializes as `{"message": ..., "description": ..., "stack": [...]}` with
/// `description` and `stack` omitted when empty.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{} ({}) - {}", .status.as_u16(), .status.canonical_reason().unwrap_or("Unknown"), .reason)]
pub struct Fault {
    /// The HTTP status code, always >= 400.
    #[serde(skip)]
    pub status: StatusCode,
    /// Headers written with the fault response.
    #[serde(skip)]
    pub headers: HeaderMap,
    /// A short, human-readable reason.
    #[serde(rename = "message")]
    pub reason: String,
    /// A longer explanation of the failure.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Captured call stack frames, populated only in debug mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,
    /// Whether the reason and description must be hidden from clients unless
    /// debug mode is on.
    #[serde(skip)]
    redacted: bool,
}

impl Fault {
    /// Create a fault with the given status, reason and description.
    ///
    /// A status below 400 is not an error; it is replaced by 500 and a
    /// warning is logged.
    #[must_use]
    pub fn new(
        status: StatusCode,
        reason: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let status = if status.as_u16() < 400 {
            warn!(
                status = status.as_u16(),
                "fault created with a non-error status, using 500"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            status
        };
        Self {
            status,
            headers: HeaderMap::new(),
            reason: reason.into(),
            description: description.into(),
            stack: Vec::new(),
            redacted: false,
        }
    }

    /// Create a fault with the canonical reason phrase of `status`.
    #[must_use]
    pub fn from_status(status: StatusCode, description: impl Into<String>) -> Self {
        Self::new(
            status,
            status.canonical_reason().unwrap_or("Error"),
            description,
        )
    }

    /// Add a header to the fault response.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        append_header(&mut self.headers, name, value);
        self
    }

    /// Replace the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach captured stack frames.
    #[must_use]
    pub fn with_stack(mut self, stack: Vec<String>) -> Self {
        self.stack = stack;
        self
    }

    /// Mark the fault as carrying server-side detail that clients only see in
    /// debug mode.
    #[must_use]
    pub fn redacted(mut self) -> Self {
        self.redacted = true;
        self
    }

    /// Whether the fault hides its detail outside debug mode.
    #[must_use]
    pub fn is_redacted(&self) -> bool {
        self.redacted
    }

    /// Return the client-visible form of this fault.
    ///
    /// Outside debug mode a redacted fault loses its reason, description and
    /// stack; headers and status are kept. In debug mode the fault is
    /// returned unchanged.
    #[must_use]
    pub fn for_client(&self, debug: bool) -> Self {
        if debug || !self.redacted {
            return self.clone();
        }
        Self {
            status: self.status,
            headers: self.headers.clone(),
            reason: REDACTED_REASON.to_owned(),
            description: REDACTED_DESCRIPTION.to_owned(),
            stack: Vec::new(),
            redacted: true,
        }
    }

    /// The canonical reason phrase of the status code.
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// Render the fault as plain text, including description and stack.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut s = self.to_string();
        if !self.description.is_empty() {
            s.push('\n');
            s.push_str(&self.description);
        }
        if !self.stack.is_empty() {
            s.push('\n');
            for frame in &self.stack {
                s.push_str("\n- ");
                s.push_str(frame);
            }
        }
        s
    }

    // -----------------------------------------------------------------------
    // Canonical constructors
    // -----------------------------------------------------------------------

    /// 400: the request could not be understood due to malformed syntax.
    ///
    /// Empty arguments fall back to the standard reason and description.
    #[must_use]
    pub fn bad_request(reason: &str, description: &str) -> Self {
        let reason = if reason.is_empty() {
            "Bad Request"
        } else {
            reason
        };
        let description = if description.is_empty() {
            "Request could not be understood due to malformed syntax."
        } else {
            description
        };
        Self::new(StatusCode::BAD_REQUEST, reason, description)
    }

    /// 401: authentication is required.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Authentication is required",
            "Authentication is required and has failed or has not yet been provided.",
        )
    }

    /// 403: the resource is protected and inaccessible.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "Request will not be fulfilled",
            "The request was a valid request, but the server is refusing to respond to it. Authenticating will make no difference.",
        )
    }

    /// 404: nothing matches the request URI.
    #[must_use]
    pub fn not_found() -> Self {
        Self::from_status(
            StatusCode::NOT_FOUND,
            "No resource could be found at the requested URI.",
        )
    }

    /// 405: `method` is not allowed; `allowed` is written to `Allow`.
    #[must_use]
    pub fn method_not_allowed(method: &str, allowed: &[&str]) -> Self {
        let methods = allowed.join(", ");
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("{method} method is not allowed for this resource"),
            format!("This resource only allows the following methods: {methods}."),
        )
        .with_header(ALLOW, &methods)
    }

    /// 406: no representation acceptable to the client can be produced.
    #[must_use]
    pub fn not_acceptable() -> Self {
        Self::from_status(
            StatusCode::NOT_ACCEPTABLE,
            "Resource is only capable of generating content not acceptable according to the accept headers sent in the request.",
        )
    }

    /// 409: the request conflicts with the current state of the resource.
    #[must_use]
    pub fn conflict() -> Self {
        Self::new(
            StatusCode::CONFLICT,
            "Resource could not be modified",
            "The request could not be processed due to a conflict with the current state of the resource.",
        )
    }

    /// 412: a precondition header did not match.
    #[must_use]
    pub fn precondition_failed() -> Self {
        Self::new(
            StatusCode::PRECONDITION_FAILED,
            "Resource could not be modified",
            "A condition set in the headers of the request could not be matched.",
        )
    }

    /// 415: the request entity is in an unsupported format. `supported`
    /// lists the accepted MIME types, if any.
    #[must_use]
    pub fn unsupported_media_type(supported: &[&str]) -> Self {
        let mut description =
            "The entity in the request is in a format not supported by this resource.".to_owned();
        if !supported.is_empty() {
            description.push_str(" Supported types: ");
            description.push_str(&supported.join(", "));
        }
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Entity inside request could not be processed",
            description,
        )
    }

    /// 416: the requested range does not overlap the resource extent.
    #[must_use]
    pub fn range_not_satisfiable(content_range: &ContentRange) -> Self {
        let mut fault = Self::from_status(
            StatusCode::RANGE_NOT_SATISFIABLE,
            "The requested range is not available and cannot be served.",
        );
        insert_header(&mut fault.headers, CONTENT_RANGE, &content_range.to_string());
        add_vary(&mut fault.headers, "Range");
        fault
    }

    /// 500: an unexpected condition. When `capture_stack` is true the
    /// current call stack is recorded.
    #[must_use]
    pub fn internal_server_error(
        reason: impl Into<String>,
        description: impl Into<String>,
        capture_stack: bool,
    ) -> Self {
        let fault = Self::new(StatusCode::INTERNAL_SERVER_ERROR, reason, description);
        if capture_stack {
            fault.with_stack(capture_stack_frames())
        } else {
            fault
        }
    }
}

impl From<anyhow::Error> for Fault {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Fault>() {
            Ok(fault) => fault,
            Err(err) => {
                Self::internal_server_error(REDACTED_REASON, format!("{err:#}"), false).redacted()
            }
        }
    }
}

/// Capture the current call stack as one string per line of the rendered
/// backtrace.
#[must_use]
pub fn capture_stack_frames() -> Vec<String> {
    Backtrace::force_capture()
        .to_string()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

thread_local! {
    static PANIC_STACK: Cell<Option<Vec<String>>> = const { Cell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Install, once per process, a panic hook that records the panicking
/// thread's call stack before unwinding starts. The previous hook still runs
/// afterwards.
///
/// A stack captured after `catch_unwind` returns only shows the recovery
/// site; [`take_panic_stack`] hands out the one recorded here instead.
pub fn install_panic_stack_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            PANIC_STACK.with(|slot| slot.set(Some(capture_stack_frames())));
            previous(info);
        }));
    });
}

/// Take the stack recorded by the last panic on this thread, if any.
#[must_use]
pub fn take_panic_stack() -> Option<Vec<String>> {
    PANIC_STACK.with(Cell::take)
}
