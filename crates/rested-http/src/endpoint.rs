//! Endpoints: the per-route record of verb operations.
//!
//! Each HTTP verb maps to one capability trait. An [`Endpoint`] holds an
//! optional implementation of each; which verbs a route supports is known at
//! registration time, not discovered per request.
//!
//! ```
//! use rested_http::endpoint::Endpoint;
//!
//! let endpoint = Endpoint::new()
//!     .get_fn(|_ctx| Ok(None))
//!     .delete_fn(|_ctx| Ok(()));
//! assert_eq!(endpoint.allowed_methods(), vec!["HEAD", "GET", "DELETE"]);
//! ```

use std::fmt;
use std::sync::Arc;

use rested_core::{AccessControlRequest, AccessControlResponse, Fault, Resource};

use crate::context::RequestContext;

/// Result of operations that may produce a resource.
pub type ResourceResult = Result<Option<Box<dyn Resource>>, Fault>;

/// Outcome of a successful POST.
#[derive(Default)]
pub struct Created {
    /// The created resource, encoded into the response when present.
    pub resource: Option<Box<dyn Resource>>,
    /// URI of the created resource, written to `Location`.
    pub location: Option<String>,
}

impl fmt::Debug for Created {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Created")
            .field("resource", &self.resource.as_ref().map(|r| r.etag()))
            .field("location", &self.location)
            .finish()
    }
}

impl Created {
    /// A created resource without a location.
    #[must_use]
    pub fn new(resource: impl Resource + 'static) -> Self {
        Self {
            resource: Some(Box::new(resource)),
            location: None,
        }
    }

    /// Set the `Location` of the created resource.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Serves GET and HEAD.
pub trait Getter: Send + Sync {
    /// Load the resource; `Ok(None)` answers 204.
    fn get(&self, ctx: &RequestContext) -> ResourceResult;
}

/// Serves POST.
pub trait Poster: Send + Sync {
    /// Create a resource.
    fn post(&self, ctx: &RequestContext) -> Result<Created, Fault>;
}

/// Serves PUT.
pub trait Putter: Send + Sync {
    /// Replace the resource.
    fn put(&self, ctx: &RequestContext) -> ResourceResult;
}

/// Serves PATCH.
pub trait Patcher: Send + Sync {
    /// Partially update the resource.
    fn patch(&self, ctx: &RequestContext) -> ResourceResult;
}

/// Serves DELETE.
pub trait Deleter: Send + Sync {
    /// Remove the resource; success answers 204.
    fn delete(&self, ctx: &RequestContext) -> Result<(), Fault>;
}

/// Computes a per-request CORS policy for preflight requests.
pub trait Preflighter: Send + Sync {
    /// Return the policy answering `request`.
    fn preflight(&self, request: &AccessControlRequest, ctx: &RequestContext)
    -> AccessControlResponse;
}

macro_rules! fn_adapter {
    ($adapter:ident, $trait:ident, $method:ident, $output:ty) => {
        #[doc = concat!("Adapts a closure to [`", stringify!($trait), "`].")]
        pub struct $adapter<F>(pub F);

        impl<F> fmt::Debug for $adapter<F> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($adapter))
            }
        }

        impl<F> $trait for $adapter<F>
        where
            F: Fn(&RequestContext) -> $output + Send + Sync,
        {
            fn $method(&self, ctx: &RequestContext) -> $output {
                (self.0)(ctx)
            }
        }
    };
}

fn_adapter!(GetFn, Getter, get, ResourceResult);
fn_adapter!(PostFn, Poster, post, Result<Created, Fault>);
fn_adapter!(PutFn, Putter, put, ResourceResult);
fn_adapter!(PatchFn, Patcher, patch, ResourceResult);
fn_adapter!(DeleteFn, Deleter, delete, Result<(), Fault>);

/// The operations registered for one route.
#[derive(Default, Clone)]
pub struct Endpoint {
    getter: Option<Arc<dyn Getter>>,
    poster: Option<Arc<dyn Poster>>,
    putter: Option<Arc<dyn Putter>>,
    patcher: Option<Arc<dyn Patcher>>,
    deleter: Option<Arc<dyn Deleter>>,
    preflighter: Option<Arc<dyn Preflighter>>,
    allowed: Option<Vec<String>>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("methods", &self.allowed_methods())
            .field("preflight", &self.preflighter.is_some())
            .finish()
    }
}

impl Endpoint {
    /// An endpoint without operations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the GET/HEAD operation.
    #[must_use]
    pub fn get(mut self, getter: impl Getter + 'static) -> Self {
        self.getter = Some(Arc::new(getter));
        self
    }

    /// Register the POST operation.
    #[must_use]
    pub fn post(mut self, poster: impl Poster + 'static) -> Self {
        self.poster = Some(Arc::new(poster));
        self
    }

    /// Register the PUT operation.
    #[must_use]
    pub fn put(mut self, putter: impl Putter + 'static) -> Self {
        self.putter = Some(Arc::new(putter));
        self
    }

    /// Register the PATCH operation.
    #[must_use]
    pub fn patch(mut self, patcher: impl Patcher + 'static) -> Self {
        self.patcher = Some(Arc::new(patcher));
        self
    }

    /// Register the DELETE operation.
    #[must_use]
    pub fn delete(mut self, deleter: impl Deleter + 'static) -> Self {
        self.deleter = Some(Arc::new(deleter));
        self
    }

    /// Register a per-request CORS preflight policy.
    #[must_use]
    pub fn preflight(mut self, preflighter: impl Preflighter + 'static) -> Self {
        self.preflighter = Some(Arc::new(preflighter));
        self
    }

    /// Register a closure as the GET/HEAD operation.
    #[must_use]
    pub fn get_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> ResourceResult + Send + Sync + 'static,
    {
        self.get(GetFn(f))
    }

    /// Register a closure as the POST operation.
    #[must_use]
    pub fn post_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<Created, Fault> + Send + Sync + 'static,
    {
        self.post(PostFn(f))
    }

    /// Register a closure as the PUT operation.
    #[must_use]
    pub fn put_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> ResourceResult + Send + Sync + 'static,
    {
        self.put(PutFn(f))
    }

    /// Register a closure as the PATCH operation.
    #[must_use]
    pub fn patch_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> ResourceResult + Send + Sync + 'static,
    {
        self.patch(PatchFn(f))
    }

    /// Register a closure as the DELETE operation.
    #[must_use]
    pub fn delete_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.delete(DeleteFn(f))
    }

    /// Replace the derived method list advertised in `Allow`.
    #[must_use]
    pub fn with_allowed_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    /// Methods this endpoint answers, in the order HEAD, GET, PATCH, PUT,
    /// POST, DELETE, unless overridden with
    /// [`with_allowed_methods`](Self::with_allowed_methods).
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<&str> {
        if let Some(allowed) = &self.allowed {
            return allowed.iter().map(String::as_str).collect();
        }

        let mut methods = Vec::with_capacity(6);
        if self.getter.is_some() {
            methods.extend(["HEAD", "GET"]);
        }
        if self.patcher.is_some() {
            methods.push("PATCH");
        }
        if self.putter.is_some() {
            methods.push("PUT");
        }
        if self.poster.is_some() {
            methods.push("POST");
        }
        if self.deleter.is_some() {
            methods.push("DELETE");
        }
        methods
    }

    pub(crate) fn getter(&self) -> Option<&dyn Getter> {
        self.getter.as_deref()
    }

    pub(crate) fn poster(&self) -> Option<&dyn Poster> {
        self.poster.as_deref()
    }

    pub(crate) fn putter(&self) -> Option<&dyn Putter> {
        self.putter.as_deref()
    }

    pub(crate) fn patcher(&self) -> Option<&dyn Patcher> {
        self.patcher.as_deref()
    }

    pub(crate) fn deleter(&self) -> Option<&dyn Deleter> {
        self.deleter.as_deref()
    }

    pub(crate) fn preflighter(&self) -> Option<&dyn Preflighter> {
        self.preflighter.as_deref()
    }
}
