//! Protocol engine for `rested`.
//!
//! Everything here works on `http` types only; the hyper integration lives in
//! `rested-http`.
//!
//! # Key components
//!
//! - [`Resource`] and its optional capabilities ([`Ranger`], [`RawHandler`])
//! - [`Fault`], the error value every handler returns
//! - [`Accept`] parsing and [`encoding::marshal`] for content negotiation
//! - [`Range`] / [`ContentRange`] arithmetic for partial content
//! - [`is_not_modified`] and [`validate_conditions`] for conditional requests
//! - [`CompressorPool`] and [`select_codec`] for response compression
//! - [`AccessControlResponse`] CORS policies
//! - [`MuxConfig`]

// Fault carries a header map and is returned by value everywhere handlers fail.
#![allow(clippy::result_large_err)]

pub mod compression;
pub mod conditional;
pub mod config;
pub mod cors;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod headers;
pub mod negotiate;
pub mod range;
pub mod resource;

pub use compression::{Codec, CompressionError, CompressorPool, select_codec};
pub use conditional::{if_range_matches, is_not_modified, validate_conditions};
pub use config::MuxConfig;
pub use cors::{AccessControlRequest, AccessControlResponse, AccessList, CorsPreset};
pub use envelope::Envelope;
pub use error::Fault;
pub use negotiate::Accept;
pub use range::{ContentRange, Range, RangeError};
pub use resource::{EncodeError, Encoded, Payload, RawBody, RawHandler, Ranger, Resource};
