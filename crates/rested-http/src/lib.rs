//! hyper integration for `rested`: routing, per-verb dispatch and the
//! [`Mux`] service.
//!
//! - **Routing** ([`router`]): the [`Router`] trait and a [`PatternRouter`]
//!   matching `{name}` and `{name:regex}` path variables.
//! - **Endpoints** ([`endpoint`]): the per-route record of Get, Post, Put,
//!   Patch, Delete and Preflight operations.
//! - **Dispatch** ([`dispatch`]): the verb state machine writing resources
//!   with negotiation, ranges, conditional requests and compression.
//! - **Faults** ([`response`]): fault rendering as HTML, JSON, XML or text.
//! - **Service** ([`service`]): the [`Mux`] implementing hyper's `Service`.
//! - **Server** ([`server`]): a graceful TCP accept loop.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> Mux (hyper Service)
//!     -> body collection
//!     -> Router (404 on miss)
//!     -> custom headers, CORS
//!     -> Dispatcher (recovery boundary)
//!     -> write_fault on failure
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use rested_core::MuxConfig;
//! use rested_http::{Endpoint, Mux, PatternRouter};
//!
//! let router = PatternRouter::new()
//!     .with_route("/health", Endpoint::new().get_fn(|_| Ok(None)))
//!     .expect("valid pattern");
//! let mux = Mux::new(router, MuxConfig::from_env());
//! // Serve `mux` with `rested_http::server::serve`.
//! ```

// Fault carries a header map and is returned by value everywhere handlers fail.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod context;
pub mod dispatch;
pub mod endpoint;
pub mod response;
pub mod router;
pub mod server;
pub mod service;

#[cfg(test)]
mod fixtures;

pub use body::ResponseBody;
pub use context::{RequestContext, RouteVars};
pub use dispatch::Dispatcher;
pub use endpoint::{
    Created, Deleter, Endpoint, Getter, Patcher, Poster, Preflighter, Putter, ResourceResult,
};
pub use response::{fault_response, write_fault};
pub use router::{PatternRouter, RouteError, RouteMatch, Router};
pub use server::serve;
pub use service::Mux;
