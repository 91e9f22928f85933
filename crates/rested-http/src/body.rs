//! Response body types supporting buffered, empty and streamed modes.
//!
//! - **Buffered**: encoded resources, fault pages, raw bytes.
//! - **Empty**: 204/304 responses, HEAD responses, OPTIONS.
//! - **Stream**: chunked bodies produced by raw handlers.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use http_body::Frame;
use http_body_util::Full;
use rested_core::RawBody;

/// Response body of every response produced by the mux.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper.
#[derive(Default)]
pub enum ResponseBody {
    /// The whole body in memory.
    Buffered(Full<Bytes>),
    /// No body at all.
    #[default]
    Empty,
    /// A body delivered chunk by chunk.
    Stream(BoxStream<'static, Result<Bytes, io::Error>>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(full) => f.debug_tuple("Buffered").field(full).finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl ResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }
}

impl From<RawBody> for ResponseBody {
    fn from(raw: RawBody) -> Self {
        match raw {
            RawBody::Full(bytes) if bytes.is_empty() => Self::Empty,
            RawBody::Full(bytes) => Self::from_bytes(bytes),
            RawBody::Stream(stream) => Self::Stream(stream),
        }
    }
}

impl http_body::Body for ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
            Self::Stream(stream) => stream
                .poll_next_unpin(cx)
                .map(|chunk| chunk.map(|result| result.map(Frame::data))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
            Self::Stream(_) => false,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
            Self::Stream(_) => http_body::SizeHint::default(),
        }
    }
}
