//! The [`Mux`]: a hyper `Service` serving routed endpoints.
//!
//! Every request goes through the same pipeline:
//!
//! 1. Request body collection
//! 2. Route resolution via the [`Router`] (a miss answers 404)
//! 3. Custom response headers from [`MuxConfig::headers`]
//! 4. CORS headers, when a policy is configured and `Origin` is present
//! 5. Per-verb dispatch through the [`Dispatcher`]
//! 6. Fault rendering over the same response
//!
//! Steps 4 and 5 run inside a recovery boundary: a panic in application code
//! becomes a 500 fault whose detail is only shown in debug mode.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::ORIGIN;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response, request, response};
use http_body_util::BodyExt;
use hyper::service::Service;
use rested_core::cors::write_cors_headers;
use rested_core::error::{capture_stack_frames, install_panic_stack_hook, take_panic_stack};
use rested_core::{AccessControlRequest, AccessControlResponse, Fault, MuxConfig};
use tracing::{debug, error, warn};

use crate::body::ResponseBody;
use crate::context::RequestContext;
use crate::dispatch::Dispatcher;
use crate::endpoint::Endpoint;
use crate::response::write_fault;
use crate::router::{RouteMatch, Router};

/// Serves requests by routing them to endpoints and dispatching per verb.
///
/// Cloning is cheap; clones share the router, configuration and compressor
/// pool.
#[derive(Clone)]
pub struct Mux {
    router: Arc<dyn Router>,
    config: Arc<MuxConfig>,
    cors: Option<Arc<AccessControlResponse>>,
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
    dispatcher: Arc<Dispatcher>,
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mux")
            .field("config", &self.config)
            .field("cors", &self.cors)
            .field("headers", &self.headers)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl Mux {
    /// Create a mux serving `router` with `config`.
    ///
    /// The CORS policy is taken from the configured preset, if any. Custom
    /// headers whose name or value is not a valid HTTP header are skipped
    /// with a warning.
    ///
    /// In debug mode a process-wide panic hook is installed so recovered
    /// panics report the stack of the panicking handler.
    #[must_use]
    pub fn new(router: impl Router + 'static, config: MuxConfig) -> Self {
        if config.debug {
            install_panic_stack_hook();
        }

        let headers = config
            .headers
            .iter()
            .filter_map(|(name, value)| {
                match (
                    HeaderName::try_from(name.as_str()),
                    HeaderValue::from_str(value),
                ) {
                    (Ok(name), Ok(value)) => Some((name, value)),
                    _ => {
                        warn!(name = %name, value = %value, "skipping invalid custom header");
                        None
                    }
                }
            })
            .collect();

        Self {
            router: Arc::new(router),
            cors: config.cors.map(|preset| Arc::new(preset.policy())),
            headers: Arc::new(headers),
            dispatcher: Arc::new(Dispatcher::new(config.compression_threshold)),
            config: Arc::new(config),
        }
    }

    /// Replace the CORS policy applied to cross-origin requests.
    #[must_use]
    pub fn with_cors(mut self, policy: AccessControlResponse) -> Self {
        self.cors = Some(Arc::new(policy));
        self
    }

    /// The configuration this mux was built with.
    #[must_use]
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Serve one request to completion.
    ///
    /// Never fails: every failure is rendered as a fault response.
    ///
    /// ```
    /// use bytes::Bytes;
    /// use http_body_util::Full;
    /// use rested_core::MuxConfig;
    /// use rested_http::{Mux, PatternRouter};
    ///
    /// let mux = Mux::new(PatternRouter::new(), MuxConfig::default());
    /// let request = http::Request::get("/anything")
    ///     .body(Full::new(Bytes::new()))
    ///     .unwrap();
    /// # tokio_test::block_on(async {
    /// let response = mux.handle(request).await;
    /// assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    /// # });
    /// ```
    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        let (parts, incoming) = req.into_parts();
        debug!(method = %parts.method, uri = %parts.uri, "processing request");

        let (mut out, ()) = Response::new(()).into_parts();
        self.apply_custom_headers(&mut out.headers);

        let body = match incoming.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                let fault = Fault::bad_request("Request body could not be read", &e.to_string());
                return self.fault(&fault, &parts, out);
            }
        };

        let Some(RouteMatch { endpoint, vars }) = self.router.resolve(&parts) else {
            debug!(path = parts.uri.path(), "no route matched");
            return self.fault(&Fault::not_found(), &parts, out);
        };

        let ctx = RequestContext::new(parts, body, vars);
        let served = catch_unwind(AssertUnwindSafe(|| {
            self.apply_cors(&endpoint, &ctx, &mut out.headers);
            self.dispatcher.dispatch(&endpoint, &ctx, &mut out)
        }));

        match served {
            Ok(Ok(body)) => Response::from_parts(out, body),
            Ok(Err(fault)) => self.fault(&fault, &ctx.parts, out),
            Err(payload) => {
                let fault = self.recover(payload.as_ref(), &ctx.parts);
                self.fault(&fault, &ctx.parts, out)
            }
        }
    }

    fn fault(
        &self,
        fault: &Fault,
        request: &request::Parts,
        mut out: response::Parts,
    ) -> Response<ResponseBody> {
        let body = write_fault(fault, request, self.config.debug, &mut out);
        Response::from_parts(out, body)
    }

    fn apply_custom_headers(&self, out: &mut HeaderMap) {
        for (name, value) in self.headers.iter() {
            out.append(name.clone(), value.clone());
        }
    }

    /// Write CORS headers for cross-origin requests. Preflights use the
    /// endpoint's own policy when it computes one.
    fn apply_cors(&self, endpoint: &Endpoint, ctx: &RequestContext, out: &mut HeaderMap) {
        let Some(configured) = self.cors.as_deref() else {
            return;
        };
        if !ctx.headers().contains_key(ORIGIN) {
            return;
        }

        let request = AccessControlRequest::from_headers(ctx.headers());
        let preflight = ctx.method().as_str().eq_ignore_ascii_case("OPTIONS");

        let computed;
        let policy = match endpoint.preflighter() {
            Some(preflighter) if preflight => {
                computed = preflighter.preflight(&request, ctx);
                &computed
            }
            _ => configured,
        };

        write_cors_headers(
            policy,
            &request,
            preflight,
            &endpoint.allowed_methods(),
            out,
        );
    }

    /// Turn a panic payload into a redacted 500. In debug mode the fault
    /// carries the stack recorded when the panic was raised.
    fn recover(&self, payload: &(dyn Any + Send), request: &request::Parts) -> Fault {
        let stack = take_panic_stack();

        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_owned());

        error!(
            panic = %message,
            method = %request.method,
            uri = %request.uri,
            "recovered from panic while serving request"
        );

        let fault = Fault::internal_server_error("Internal Server Error", message, false);
        if self.config.debug {
            fault
                .with_stack(stack.unwrap_or_else(capture_stack_frames))
                .redacted()
        } else {
            fault.redacted()
        }
    }
}

impl<B> Service<Request<B>> for Mux
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: fmt::Display + Send,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let mux = self.clone();
        Box::pin(async move { Ok(mux.handle(req).await) })
    }
}
